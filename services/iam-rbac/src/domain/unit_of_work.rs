//! Unit of Work 模式
//!
//! 提供跨多个 Repository 的事务协调能力，确保操作的原子性。

use async_trait::async_trait;
use atrium_common::UserId;
use atrium_errors::AppResult;

use super::association::AssociationRepository;
use super::menu::{MenuId, MenuRepository, MenuResourceRepository};
use super::permission::{PermissionId, PermissionRepository};
use super::role::{RoleId, RoleRepository};
use super::user::UserRepository;

/// Repository 集合
pub trait Repositories: Send + Sync {
    fn menus(&self) -> &dyn MenuRepository;

    fn menu_resources(&self) -> &dyn MenuResourceRepository;

    fn roles(&self) -> &dyn RoleRepository;

    fn permissions(&self) -> &dyn PermissionRepository;

    fn users(&self) -> &dyn UserRepository;

    fn role_menus(&self) -> &dyn AssociationRepository<RoleId, MenuId>;

    fn role_permissions(&self) -> &dyn AssociationRepository<RoleId, PermissionId>;

    fn user_roles(&self) -> &dyn AssociationRepository<UserId, RoleId>;
}

/// Unit of Work
///
/// 通过它取得的 Repository 共享同一个事务。
///
/// ```ignore
/// let uow = store.begin().await?;
/// uow.menus().insert(&menu).await?;
/// uow.role_menus().delete_by_targets(&ids).await?;
/// uow.commit().await?;
/// ```
#[async_trait]
pub trait UnitOfWork: Repositories {
    async fn commit(self: Box<Self>) -> AppResult<()>;

    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

/// Unit of Work 工厂
#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>>;
}

/// 存储入口：非事务读取 + 开启事务
pub trait RbacStore: Repositories + UnitOfWorkFactory {}

impl<T: Repositories + UnitOfWorkFactory> RbacStore for T {}
