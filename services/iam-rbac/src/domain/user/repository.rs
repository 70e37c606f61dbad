//! 用户 Repository 接口

use async_trait::async_trait;
use atrium_common::{PagedResult, Pagination, UserId};
use atrium_errors::AppResult;

use super::user::{User, UserStatus};

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// 用户名或姓名模糊匹配
    pub keyword: Option<String>,
    pub status: Option<UserStatus>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        if let Some(keyword) = &self.keyword
            && !user.username.contains(keyword.as_str())
            && !user.full_name.contains(keyword.as_str())
        {
            return false;
        }
        if let Some(status) = self.status
            && user.status != status
        {
            return false;
        }
        true
    }
}

/// 用户 Repository
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> AppResult<Option<User>>;

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    async fn exists_by_username(&self, username: &str, exclude: Option<&UserId>) -> AppResult<bool>;

    async fn query(&self, filter: &UserFilter, page: &Pagination) -> AppResult<PagedResult<User>>;

    async fn insert(&self, user: &User) -> AppResult<()>;

    async fn update(&self, user: &User) -> AppResult<()>;

    async fn update_status(&self, id: &UserId, status: UserStatus) -> AppResult<()>;

    async fn delete(&self, id: &UserId) -> AppResult<()>;
}
