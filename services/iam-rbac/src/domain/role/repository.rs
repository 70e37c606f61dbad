//! 角色 Repository 接口

use async_trait::async_trait;
use atrium_common::{PagedResult, Pagination};
use atrium_errors::AppResult;

use super::role::{Role, RoleId, RoleStatus};

/// 角色查询条件
#[derive(Debug, Clone, Default)]
pub struct RoleFilter {
    pub ids: Option<Vec<RoleId>>,
    pub name_like: Option<String>,
    pub status: Option<RoleStatus>,
}

impl RoleFilter {
    pub fn matches(&self, role: &Role) -> bool {
        if let Some(ids) = &self.ids
            && !ids.contains(&role.id)
        {
            return false;
        }
        if let Some(name) = &self.name_like
            && !role.name.contains(name.as_str())
        {
            return false;
        }
        if let Some(status) = self.status
            && role.status != status
        {
            return false;
        }
        true
    }
}

/// 角色 Repository
#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn find_by_id(&self, id: &RoleId) -> AppResult<Option<Role>>;

    async fn find_by_ids(&self, ids: &[RoleId]) -> AppResult<Vec<Role>>;

    async fn exists_by_code(&self, code: &str, exclude: Option<&RoleId>) -> AppResult<bool>;

    /// 分页查询，按 sequence 降序、创建时间升序
    async fn query(&self, filter: &RoleFilter, page: &Pagination) -> AppResult<PagedResult<Role>>;

    async fn insert(&self, role: &Role) -> AppResult<()>;

    async fn update(&self, role: &Role) -> AppResult<()>;

    async fn delete(&self, id: &RoleId) -> AppResult<()>;
}
