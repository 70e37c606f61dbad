//! 角色应用服务

use std::collections::HashSet;
use std::sync::Arc;

use atrium_common::{PagedResult, Pagination, UserId};
use atrium_errors::{AppError, AppResult};
use tracing::{info, instrument};

use super::commands::{CreateRoleCommand, RoleDetail, UpdateRoleCommand};
use crate::application::{distinct, finish};
use crate::domain::menu::MenuId;
use crate::domain::permission::PermissionId;
use crate::domain::role::{Role, RoleFilter, RoleId};
use crate::domain::unit_of_work::{RbacStore, Repositories};
use crate::error::RbacError;
use crate::infrastructure::cache::{AuthorizationSync, PolicyDomain, SessionCache};

/// 角色写操作的结果，提交后据此发出同步信号
struct RoleWrite<T> {
    value: T,
    permissions_changed: bool,
}

/// 角色应用服务
pub struct RoleService {
    store: Arc<dyn RbacStore>,
    sync: AuthorizationSync,
    sessions: Arc<SessionCache>,
}

impl RoleService {
    pub fn new(store: Arc<dyn RbacStore>, sync: AuthorizationSync, sessions: Arc<SessionCache>) -> Self {
        Self {
            store,
            sync,
            sessions,
        }
    }

    /// 创建角色
    #[instrument(skip(self, cmd), fields(code = %cmd.code))]
    pub async fn create(&self, cmd: CreateRoleCommand) -> AppResult<RoleDetail> {
        cmd.validate().map_err(AppError::validation)?;

        let uow = self.store.begin().await?;
        let result = Self::create_in(uow.as_ref(), &cmd).await;
        let write = finish(uow, result).await?;

        self.signal(write.permissions_changed).await;
        info!(role_id = %write.value.role.id, "Role created");
        Ok(write.value)
    }

    /// 修改角色，菜单与权限绑定整体替换
    #[instrument(skip(self, cmd))]
    pub async fn update(&self, id: &RoleId, cmd: UpdateRoleCommand) -> AppResult<RoleDetail> {
        cmd.validate().map_err(AppError::validation)?;

        let uow = self.store.begin().await?;
        let result = Self::update_in(uow.as_ref(), id, &cmd).await;
        let write = finish(uow, result).await?;

        self.signal(write.permissions_changed).await;
        Ok(write.value)
    }

    /// 删除角色及其全部绑定，并失效受影响用户的会话
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &RoleId) -> AppResult<()> {
        let uow = self.store.begin().await?;
        let result = Self::delete_in(uow.as_ref(), id).await;
        let affected = finish(uow, result).await?;

        self.sync
            .touch_all(&[PolicyDomain::Role, PolicyDomain::Permission])
            .await;
        self.sessions.invalidate_many(&affected).await;

        info!(role_id = %id, users = affected.len(), "Role deleted");
        Ok(())
    }

    /// 获取角色详情
    pub async fn get(&self, id: &RoleId) -> AppResult<RoleDetail> {
        let role = self
            .store
            .roles()
            .find_by_id(id)
            .await?
            .ok_or(RbacError::RoleNotFound)?;
        Self::detail(&*self.store, role).await
    }

    /// 分页查询
    pub async fn query(&self, filter: &RoleFilter, page: &Pagination) -> AppResult<PagedResult<Role>> {
        self.store.roles().query(filter, page).await
    }

    async fn create_in<R: Repositories + ?Sized>(
        repos: &R,
        cmd: &CreateRoleCommand,
    ) -> AppResult<RoleWrite<RoleDetail>> {
        if repos.roles().exists_by_code(&cmd.code, None).await? {
            return Err(RbacError::RoleCodeExists.into());
        }

        let menu_ids = Self::checked_menu_ids(repos, &cmd.menu_ids).await?;
        let permission_ids = Self::checked_permission_ids(repos, &cmd.permission_ids).await?;

        let role = cmd.to_role();
        repos.roles().insert(&role).await?;
        repos.role_menus().replace_all(&role.id, &menu_ids).await?;
        repos
            .role_permissions()
            .replace_all(&role.id, &permission_ids)
            .await?;

        Ok(RoleWrite {
            permissions_changed: !permission_ids.is_empty(),
            value: RoleDetail {
                role,
                menu_ids,
                permission_ids,
            },
        })
    }

    async fn update_in<R: Repositories + ?Sized>(
        repos: &R,
        id: &RoleId,
        cmd: &UpdateRoleCommand,
    ) -> AppResult<RoleWrite<RoleDetail>> {
        let mut role = repos
            .roles()
            .find_by_id(id)
            .await?
            .ok_or(RbacError::RoleNotFound)?;

        if cmd.code != role.code && repos.roles().exists_by_code(&cmd.code, Some(id)).await? {
            return Err(RbacError::RoleCodeExists.into());
        }

        let menu_ids = Self::checked_menu_ids(repos, &cmd.menu_ids).await?;
        let permission_ids = Self::checked_permission_ids(repos, &cmd.permission_ids).await?;

        let previous: HashSet<PermissionId> = repos
            .role_permissions()
            .list_by_owner(id)
            .await?
            .into_iter()
            .map(|binding| binding.target_id)
            .collect();
        let status_changed = role.status != cmd.status;
        let permissions_changed =
            status_changed || previous != permission_ids.iter().copied().collect::<HashSet<_>>();

        cmd.apply(&mut role);
        repos.roles().update(&role).await?;
        repos.role_menus().replace_all(id, &menu_ids).await?;
        repos.role_permissions().replace_all(id, &permission_ids).await?;

        Ok(RoleWrite {
            permissions_changed,
            value: RoleDetail {
                role,
                menu_ids,
                permission_ids,
            },
        })
    }

    async fn delete_in<R: Repositories + ?Sized>(repos: &R, id: &RoleId) -> AppResult<Vec<UserId>> {
        if repos.roles().find_by_id(id).await?.is_none() {
            return Err(RbacError::RoleNotFound.into());
        }

        let affected: Vec<UserId> = repos
            .user_roles()
            .list_by_target(id)
            .await?
            .into_iter()
            .map(|binding| binding.owner_id)
            .collect();

        repos.role_menus().delete_by_owner(id).await?;
        repos.role_permissions().delete_by_owner(id).await?;
        repos.user_roles().delete_by_target(id).await?;
        repos.roles().delete(id).await?;

        Ok(distinct(&affected))
    }

    async fn detail<R: Repositories + ?Sized>(repos: &R, role: Role) -> AppResult<RoleDetail> {
        let menu_ids = repos
            .role_menus()
            .list_by_owner(&role.id)
            .await?
            .into_iter()
            .map(|binding| binding.target_id)
            .collect();
        let permission_ids = repos
            .role_permissions()
            .list_by_owner(&role.id)
            .await?
            .into_iter()
            .map(|binding| binding.target_id)
            .collect();

        Ok(RoleDetail {
            role,
            menu_ids,
            permission_ids,
        })
    }

    /// 去重并确认菜单全部存在
    async fn checked_menu_ids<R: Repositories + ?Sized>(
        repos: &R,
        ids: &[MenuId],
    ) -> AppResult<Vec<MenuId>> {
        let ids = distinct(ids);
        if !ids.is_empty() && repos.menus().find_by_ids(&ids).await?.len() != ids.len() {
            return Err(RbacError::MenuNotFound.into());
        }
        Ok(ids)
    }

    async fn checked_permission_ids<R: Repositories + ?Sized>(
        repos: &R,
        ids: &[PermissionId],
    ) -> AppResult<Vec<PermissionId>> {
        let ids = distinct(ids);
        if !ids.is_empty() && repos.permissions().find_by_ids(&ids).await?.len() != ids.len() {
            return Err(RbacError::PermissionNotFound.into());
        }
        Ok(ids)
    }

    async fn signal(&self, permissions_changed: bool) {
        if permissions_changed {
            self.sync
                .touch_all(&[PolicyDomain::Role, PolicyDomain::Permission])
                .await;
        } else {
            self.sync.touch(PolicyDomain::Role).await;
        }
    }
}
