//! 权限应用服务

use std::sync::Arc;

use atrium_common::{PagedResult, Pagination};
use atrium_errors::{AppError, AppResult};
use tracing::{info, instrument};

use super::commands::{CreatePermissionCommand, UpdatePermissionCommand};
use crate::application::finish;
use crate::domain::permission::{Permission, PermissionFilter, PermissionId};
use crate::domain::unit_of_work::{RbacStore, Repositories};
use crate::error::RbacError;
use crate::infrastructure::cache::{AuthorizationSync, PolicyDomain};

/// 权限应用服务
///
/// 写操作提交后触发权限域的策略同步信号。
pub struct PermissionService {
    store: Arc<dyn RbacStore>,
    sync: AuthorizationSync,
}

impl PermissionService {
    pub fn new(store: Arc<dyn RbacStore>, sync: AuthorizationSync) -> Self {
        Self { store, sync }
    }

    /// 创建权限
    #[instrument(skip(self, cmd), fields(slug = %cmd.slug))]
    pub async fn create(&self, cmd: CreatePermissionCommand) -> AppResult<Permission> {
        cmd.validate().map_err(AppError::validation)?;

        let uow = self.store.begin().await?;
        let result = Self::create_in(uow.as_ref(), cmd).await;
        let permission = finish(uow, result).await?;

        self.sync.touch(PolicyDomain::Permission).await;
        info!(permission_id = %permission.id, "Permission created");
        Ok(permission)
    }

    /// 修改权限
    #[instrument(skip(self, cmd))]
    pub async fn update(
        &self,
        id: &PermissionId,
        cmd: UpdatePermissionCommand,
    ) -> AppResult<Permission> {
        cmd.validate().map_err(AppError::validation)?;

        let uow = self.store.begin().await?;
        let result = Self::update_in(uow.as_ref(), id, cmd).await;
        let permission = finish(uow, result).await?;

        self.sync.touch(PolicyDomain::Permission).await;
        Ok(permission)
    }

    /// 删除权限及其角色绑定
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &PermissionId) -> AppResult<()> {
        let uow = self.store.begin().await?;
        let result = Self::delete_in(uow.as_ref(), id).await;
        let bindings = finish(uow, result).await?;

        self.sync.touch(PolicyDomain::Permission).await;
        info!(permission_id = %id, bindings, "Permission deleted");
        Ok(())
    }

    pub async fn get(&self, id: &PermissionId) -> AppResult<Permission> {
        self.store
            .permissions()
            .find_by_id(id)
            .await?
            .ok_or_else(|| RbacError::PermissionNotFound.into())
    }

    /// 分页查询
    pub async fn query(
        &self,
        filter: &PermissionFilter,
        page: &Pagination,
    ) -> AppResult<PagedResult<Permission>> {
        self.store.permissions().query(filter, page).await
    }

    async fn create_in<R: Repositories + ?Sized>(
        repos: &R,
        cmd: CreatePermissionCommand,
    ) -> AppResult<Permission> {
        if repos.permissions().exists_by_slug(&cmd.slug, None).await? {
            return Err(RbacError::PermissionSlugExists.into());
        }

        let permission = cmd.into_permission();
        repos.permissions().insert(&permission).await?;
        Ok(permission)
    }

    async fn update_in<R: Repositories + ?Sized>(
        repos: &R,
        id: &PermissionId,
        cmd: UpdatePermissionCommand,
    ) -> AppResult<Permission> {
        let permissions = repos.permissions();
        let mut permission = permissions
            .find_by_id(id)
            .await?
            .ok_or(RbacError::PermissionNotFound)?;

        if cmd.slug != permission.slug && permissions.exists_by_slug(&cmd.slug, Some(id)).await? {
            return Err(RbacError::PermissionSlugExists.into());
        }

        cmd.apply(&mut permission);
        permissions.update(&permission).await?;
        Ok(permission)
    }

    async fn delete_in<R: Repositories + ?Sized>(repos: &R, id: &PermissionId) -> AppResult<u64> {
        if repos.permissions().find_by_id(id).await?.is_none() {
            return Err(RbacError::PermissionNotFound.into());
        }

        let bindings = repos.role_permissions().delete_by_target(id).await?;
        repos.permissions().delete(id).await?;
        Ok(bindings)
    }
}
