//! PostgreSQL 持久化
//!
//! 同一套仓储类型通过 [`PgSession`] 既可以直接跑在连接池上，
//! 也可以挂在 Unit of Work 的共享事务上。

mod association_repository;
mod menu_repository;
mod permission_repository;
mod role_repository;
mod user_repository;

use async_trait::async_trait;
use atrium_adapter_postgres::{
    PgSession, SharedTx, begin_shared, commit_shared, rollback_shared,
};
use atrium_common::{Identifier, UserId};
use atrium_errors::AppResult;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use uuid::Uuid;

pub use association_repository::{
    AssociationTable, PostgresAssociationRepository, ROLE_MENUS, ROLE_PERMISSIONS, USER_ROLES,
};
pub use menu_repository::{PostgresMenuRepository, PostgresMenuResourceRepository};
pub use permission_repository::PostgresPermissionRepository;
pub use role_repository::PostgresRoleRepository;
pub use user_repository::PostgresUserRepository;

use crate::domain::association::AssociationRepository;
use crate::domain::menu::{MenuId, MenuRepository, MenuResourceRepository};
use crate::domain::permission::{PermissionId, PermissionRepository};
use crate::domain::role::{RoleId, RoleRepository};
use crate::domain::unit_of_work::{Repositories, UnitOfWork, UnitOfWorkFactory};
use crate::domain::user::UserRepository;

/// 服务自带的迁移脚本
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub(crate) fn ids_to_uuids<I: Identifier>(ids: &[I]) -> Vec<Uuid> {
    ids.iter().map(Identifier::as_uuid).collect()
}

/// 绑定到同一个会话的全部仓储
pub struct PgRepositories {
    menus: PostgresMenuRepository,
    menu_resources: PostgresMenuResourceRepository,
    roles: PostgresRoleRepository,
    permissions: PostgresPermissionRepository,
    users: PostgresUserRepository,
    role_menus: PostgresAssociationRepository<RoleId, MenuId>,
    role_permissions: PostgresAssociationRepository<RoleId, PermissionId>,
    user_roles: PostgresAssociationRepository<UserId, RoleId>,
}

impl PgRepositories {
    pub fn new(session: PgSession) -> Self {
        Self {
            menus: PostgresMenuRepository::new(session.clone()),
            menu_resources: PostgresMenuResourceRepository::new(session.clone()),
            roles: PostgresRoleRepository::new(session.clone()),
            permissions: PostgresPermissionRepository::new(session.clone()),
            users: PostgresUserRepository::new(session.clone()),
            role_menus: PostgresAssociationRepository::new(session.clone(), &ROLE_MENUS),
            role_permissions: PostgresAssociationRepository::new(session.clone(), &ROLE_PERMISSIONS),
            user_roles: PostgresAssociationRepository::new(session, &USER_ROLES),
        }
    }
}

impl Repositories for PgRepositories {
    fn menus(&self) -> &dyn MenuRepository {
        &self.menus
    }

    fn menu_resources(&self) -> &dyn MenuResourceRepository {
        &self.menu_resources
    }

    fn roles(&self) -> &dyn RoleRepository {
        &self.roles
    }

    fn permissions(&self) -> &dyn PermissionRepository {
        &self.permissions
    }

    fn users(&self) -> &dyn UserRepository {
        &self.users
    }

    fn role_menus(&self) -> &dyn AssociationRepository<RoleId, MenuId> {
        &self.role_menus
    }

    fn role_permissions(&self) -> &dyn AssociationRepository<RoleId, PermissionId> {
        &self.role_permissions
    }

    fn user_roles(&self) -> &dyn AssociationRepository<UserId, RoleId> {
        &self.user_roles
    }
}

/// 为持有 `repos: PgRepositories` 的类型转发 Repositories
macro_rules! forward_repositories {
    ($ty:ty) => {
        impl Repositories for $ty {
            fn menus(&self) -> &dyn MenuRepository {
                self.repos.menus()
            }

            fn menu_resources(&self) -> &dyn MenuResourceRepository {
                self.repos.menu_resources()
            }

            fn roles(&self) -> &dyn RoleRepository {
                self.repos.roles()
            }

            fn permissions(&self) -> &dyn PermissionRepository {
                self.repos.permissions()
            }

            fn users(&self) -> &dyn UserRepository {
                self.repos.users()
            }

            fn role_menus(&self) -> &dyn AssociationRepository<RoleId, MenuId> {
                self.repos.role_menus()
            }

            fn role_permissions(&self) -> &dyn AssociationRepository<RoleId, PermissionId> {
                self.repos.role_permissions()
            }

            fn user_roles(&self) -> &dyn AssociationRepository<UserId, RoleId> {
                self.repos.user_roles()
            }
        }
    };
}

/// PostgreSQL 存储：连接池上的仓储 + Unit of Work 工厂
pub struct PostgresStore {
    pool: PgPool,
    repos: PgRepositories,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repos: PgRepositories::new(PgSession::Pool(pool.clone())),
            pool,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

forward_repositories!(PostgresStore);

#[async_trait]
impl UnitOfWorkFactory for PostgresStore {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let tx = begin_shared(&self.pool).await?;
        Ok(Box::new(PostgresUnitOfWork {
            repos: PgRepositories::new(PgSession::Tx(tx.clone())),
            tx,
        }))
    }
}

/// PostgreSQL Unit of Work
///
/// 所有仓储共享同一个事务。
pub struct PostgresUnitOfWork {
    tx: SharedTx,
    repos: PgRepositories,
}

forward_repositories!(PostgresUnitOfWork);

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    async fn commit(self: Box<Self>) -> AppResult<()> {
        commit_shared(&self.tx).await
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        rollback_shared(&self.tx).await
    }
}
