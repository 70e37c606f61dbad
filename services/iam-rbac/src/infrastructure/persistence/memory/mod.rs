//! 进程内存储
//!
//! 已提交状态放在一把锁后面。Unit of Work 开始时复制一份快照，
//! 所有修改落在快照上，提交时整体写回，回滚（或直接丢弃）时什么也不留下。
//! 同一时间只允许一个 Unit of Work，后来者在 `begin` 上等待。

mod repositories;
mod state;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use atrium_common::UserId;
use atrium_errors::AppResult;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::domain::association::AssociationRepository;
use crate::domain::menu::{MenuId, MenuRepository, MenuResourceRepository};
use crate::domain::permission::{PermissionId, PermissionRepository};
use crate::domain::role::{RoleId, RoleRepository};
use crate::domain::unit_of_work::{Repositories, UnitOfWork, UnitOfWorkFactory};
use crate::domain::user::UserRepository;

use state::{MemoryRepos, StoreState};

/// 为持有 `repos: MemoryRepos` 的类型实现 Repositories
macro_rules! delegate_repositories {
    ($ty:ty) => {
        impl Repositories for $ty {
            fn menus(&self) -> &dyn MenuRepository {
                &self.repos
            }

            fn menu_resources(&self) -> &dyn MenuResourceRepository {
                &self.repos
            }

            fn roles(&self) -> &dyn RoleRepository {
                &self.repos
            }

            fn permissions(&self) -> &dyn PermissionRepository {
                &self.repos
            }

            fn users(&self) -> &dyn UserRepository {
                &self.repos
            }

            fn role_menus(&self) -> &dyn AssociationRepository<RoleId, MenuId> {
                &self.repos
            }

            fn role_permissions(&self) -> &dyn AssociationRepository<RoleId, PermissionId> {
                &self.repos
            }

            fn user_roles(&self) -> &dyn AssociationRepository<UserId, RoleId> {
                &self.repos
            }
        }
    };
}

/// 进程内存储
#[derive(Clone)]
pub struct InMemoryStore {
    committed: Arc<Mutex<StoreState>>,
    tx_lock: Arc<Mutex<()>>,
    calls: Arc<AtomicU64>,
    repos: MemoryRepos,
}

impl InMemoryStore {
    pub fn new() -> Self {
        let committed = Arc::new(Mutex::new(StoreState::default()));
        let calls = Arc::new(AtomicU64::new(0));
        Self {
            repos: MemoryRepos::new(committed.clone(), calls.clone()),
            committed,
            tx_lock: Arc::new(Mutex::new(())),
            calls,
        }
    }

    /// 累计的存储访问次数（包括事务内访问）
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

delegate_repositories!(InMemoryStore);

#[async_trait]
impl UnitOfWorkFactory for InMemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let guard = self.tx_lock.clone().lock_owned().await;
        let snapshot = self.committed.lock().await.clone();

        Ok(Box::new(InMemoryUnitOfWork {
            repos: MemoryRepos::new(Arc::new(Mutex::new(snapshot)), self.calls.clone()),
            committed: self.committed.clone(),
            _guard: guard,
        }))
    }
}

/// 进程内 Unit of Work
pub struct InMemoryUnitOfWork {
    repos: MemoryRepos,
    committed: Arc<Mutex<StoreState>>,
    _guard: OwnedMutexGuard<()>,
}

delegate_repositories!(InMemoryUnitOfWork);

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> AppResult<()> {
        let snapshot = std::mem::take(&mut *self.repos.state().lock().await);
        *self.committed.lock().await = snapshot;
        debug!("In-memory unit of work committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        debug!("In-memory unit of work rolled back");
        Ok(())
    }
}
