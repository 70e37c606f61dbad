//! Cache trait 定义

use async_trait::async_trait;
use atrium_errors::AppResult;
use std::time::Duration;

/// 缓存 trait
///
/// 实现方在存储不可用时返回 `AppError::ExternalService`，调用方据此判断是否可以降级。
#[async_trait]
pub trait CachePort: Send + Sync {
    /// 获取缓存值
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// 设置缓存值
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<()>;

    /// 删除缓存
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// 检查是否存在
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// 设置过期时间
    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<()>;
}

/// 按命名空间拼接缓存键
pub fn namespaced_key(namespace: &str, key: &str) -> String {
    format!("{}:{}", namespace, key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaced_key() {
        assert_eq!(namespaced_key("user", "42"), "user:42");
        assert_eq!(namespaced_key("role", "sync:policy"), "role:sync:policy");
    }
}
