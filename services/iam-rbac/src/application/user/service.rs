//! 用户应用服务

use std::sync::Arc;

use atrium_common::{PagedResult, Pagination, UserId};
use atrium_errors::{AppError, AppResult};
use tracing::{info, instrument};

use super::commands::{CreateUserCommand, UpdateUserCommand, UserDetail};
use crate::application::{distinct, finish};
use crate::domain::role::RoleId;
use crate::domain::unit_of_work::{RbacStore, Repositories};
use crate::domain::user::{PasswordHasher, User, UserFilter, UserStatus};
use crate::error::RbacError;
use crate::infrastructure::cache::SessionCache;

/// 用户应用服务
///
/// 角色绑定、状态变化与删除都会失效该用户的会话缓存。
pub struct UserService {
    store: Arc<dyn RbacStore>,
    sessions: Arc<SessionCache>,
    hasher: Arc<dyn PasswordHasher>,
    /// 超级管理员用户名，不可被普通用户占用
    reserved_username: String,
}

impl UserService {
    pub fn new(
        store: Arc<dyn RbacStore>,
        sessions: Arc<SessionCache>,
        hasher: Arc<dyn PasswordHasher>,
        reserved_username: impl Into<String>,
    ) -> Self {
        Self {
            store,
            sessions,
            hasher,
            reserved_username: reserved_username.into(),
        }
    }

    /// 创建用户
    #[instrument(skip(self, cmd), fields(username = %cmd.username))]
    pub async fn create(&self, cmd: CreateUserCommand) -> AppResult<UserDetail> {
        cmd.validate().map_err(AppError::validation)?;
        self.ensure_not_reserved(&cmd.username)?;

        let password_hash = self.hasher.hash(&cmd.password)?;
        let user = cmd.to_user(password_hash);

        let uow = self.store.begin().await?;
        let result = Self::create_in(uow.as_ref(), user, &cmd.role_ids).await;
        let detail = finish(uow, result).await?;

        info!(user_id = %detail.user.id, "User created");
        Ok(detail)
    }

    /// 修改用户，角色绑定整体替换，可选修改密码
    #[instrument(skip(self, cmd))]
    pub async fn update(&self, id: &UserId, cmd: UpdateUserCommand) -> AppResult<UserDetail> {
        cmd.validate().map_err(AppError::validation)?;
        self.ensure_not_reserved(&cmd.username)?;

        let password_hash = match &cmd.password {
            Some(password) => Some(self.hasher.hash(password)?),
            None => None,
        };

        let uow = self.store.begin().await?;
        let result = Self::update_in(uow.as_ref(), id, &cmd, password_hash).await;
        let detail = finish(uow, result).await?;

        self.sessions.invalidate(id).await;
        Ok(detail)
    }

    /// 修改用户状态
    #[instrument(skip(self))]
    pub async fn update_status(&self, id: &UserId, status: UserStatus) -> AppResult<()> {
        let uow = self.store.begin().await?;
        let result = Self::update_status_in(uow.as_ref(), id, status).await;
        finish(uow, result).await?;

        self.sessions.invalidate(id).await;
        info!(user_id = %id, status = status.as_str(), "User status updated");
        Ok(())
    }

    /// 删除用户及其角色绑定
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &UserId) -> AppResult<()> {
        let uow = self.store.begin().await?;
        let result = Self::delete_in(uow.as_ref(), id).await;
        finish(uow, result).await?;

        self.sessions.invalidate(id).await;
        info!(user_id = %id, "User deleted");
        Ok(())
    }

    /// 获取用户详情
    pub async fn get(&self, id: &UserId) -> AppResult<UserDetail> {
        let user = self
            .store
            .users()
            .find_by_id(id)
            .await?
            .ok_or(RbacError::UserNotFound)?;
        let role_ids = self
            .store
            .user_roles()
            .list_by_owner(id)
            .await?
            .into_iter()
            .map(|binding| binding.target_id)
            .collect();
        Ok(UserDetail { user, role_ids })
    }

    /// 分页查询
    pub async fn query(&self, filter: &UserFilter, page: &Pagination) -> AppResult<PagedResult<User>> {
        self.store.users().query(filter, page).await
    }

    fn ensure_not_reserved(&self, username: &str) -> AppResult<()> {
        if username.eq_ignore_ascii_case(&self.reserved_username) {
            return Err(RbacError::UsernameExists.into());
        }
        Ok(())
    }

    async fn create_in<R: Repositories + ?Sized>(
        repos: &R,
        user: User,
        role_ids: &[RoleId],
    ) -> AppResult<UserDetail> {
        if repos.users().exists_by_username(&user.username, None).await? {
            return Err(RbacError::UsernameExists.into());
        }
        let role_ids = Self::checked_role_ids(repos, role_ids).await?;

        repos.users().insert(&user).await?;
        repos.user_roles().replace_all(&user.id, &role_ids).await?;

        Ok(UserDetail { user, role_ids })
    }

    async fn update_in<R: Repositories + ?Sized>(
        repos: &R,
        id: &UserId,
        cmd: &UpdateUserCommand,
        password_hash: Option<String>,
    ) -> AppResult<UserDetail> {
        let mut user = repos
            .users()
            .find_by_id(id)
            .await?
            .ok_or(RbacError::UserNotFound)?;

        if cmd.username != user.username
            && repos.users().exists_by_username(&cmd.username, Some(id)).await?
        {
            return Err(RbacError::UsernameExists.into());
        }
        let role_ids = Self::checked_role_ids(repos, &cmd.role_ids).await?;

        cmd.apply(&mut user);
        if let Some(hash) = password_hash {
            user.password_hash = hash;
        }
        repos.users().update(&user).await?;
        repos.user_roles().replace_all(id, &role_ids).await?;

        Ok(UserDetail { user, role_ids })
    }

    async fn update_status_in<R: Repositories + ?Sized>(
        repos: &R,
        id: &UserId,
        status: UserStatus,
    ) -> AppResult<()> {
        if repos.users().find_by_id(id).await?.is_none() {
            return Err(RbacError::UserNotFound.into());
        }
        repos.users().update_status(id, status).await
    }

    async fn delete_in<R: Repositories + ?Sized>(repos: &R, id: &UserId) -> AppResult<()> {
        if repos.users().find_by_id(id).await?.is_none() {
            return Err(RbacError::UserNotFound.into());
        }
        repos.user_roles().delete_by_owner(id).await?;
        repos.users().delete(id).await
    }

    async fn checked_role_ids<R: Repositories + ?Sized>(
        repos: &R,
        ids: &[RoleId],
    ) -> AppResult<Vec<RoleId>> {
        let ids = distinct(ids);
        if !ids.is_empty() && repos.roles().find_by_ids(&ids).await?.len() != ids.len() {
            return Err(RbacError::RoleNotFound.into());
        }
        Ok(ids)
    }
}
