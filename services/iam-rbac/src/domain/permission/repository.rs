//! 权限 Repository 接口

use async_trait::async_trait;
use atrium_common::{PagedResult, Pagination};
use atrium_errors::AppResult;

use super::permission::{Permission, PermissionId};

#[derive(Debug, Clone, Default)]
pub struct PermissionFilter {
    pub ids: Option<Vec<PermissionId>>,
    pub name_like: Option<String>,
    pub slug: Option<String>,
}

impl PermissionFilter {
    pub fn matches(&self, permission: &Permission) -> bool {
        if let Some(ids) = &self.ids
            && !ids.contains(&permission.id)
        {
            return false;
        }
        if let Some(name) = &self.name_like
            && !permission.name.contains(name.as_str())
        {
            return false;
        }
        if let Some(slug) = &self.slug
            && &permission.slug != slug
        {
            return false;
        }
        true
    }
}

/// 权限 Repository
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    async fn find_by_id(&self, id: &PermissionId) -> AppResult<Option<Permission>>;

    async fn find_by_ids(&self, ids: &[PermissionId]) -> AppResult<Vec<Permission>>;

    async fn exists_by_slug(&self, slug: &str, exclude: Option<&PermissionId>) -> AppResult<bool>;

    /// 分页查询，按创建时间升序
    async fn query(
        &self,
        filter: &PermissionFilter,
        page: &Pagination,
    ) -> AppResult<PagedResult<Permission>>;

    async fn insert(&self, permission: &Permission) -> AppResult<()>;

    async fn update(&self, permission: &Permission) -> AppResult<()>;

    async fn delete(&self, id: &PermissionId) -> AppResult<()>;
}
