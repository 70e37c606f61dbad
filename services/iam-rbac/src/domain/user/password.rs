//! 密码哈希端口

use atrium_errors::AppResult;

/// 密码哈希
#[cfg_attr(test, mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plain: &str) -> AppResult<String>;

    /// 校验明文与哈希是否匹配；哈希格式错误时返回 Err
    fn verify(&self, plain: &str, hash: &str) -> AppResult<bool>;
}
