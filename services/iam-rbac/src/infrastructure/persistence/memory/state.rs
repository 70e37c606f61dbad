//! 进程内存储状态

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use atrium_common::{PagedResult, Pagination, UserId};
use tokio::sync::Mutex;

use crate::domain::association::{Binding, RoleMenu, RolePermission, UserRole};
use crate::domain::menu::{Menu, MenuId, MenuResource, MenuResourceId};
use crate::domain::permission::{Permission, PermissionId};
use crate::domain::role::{Role, RoleId};
use crate::domain::user::User;

/// 全部表
#[derive(Debug, Clone, Default)]
pub(crate) struct StoreState {
    pub menus: BTreeMap<MenuId, Menu>,
    pub menu_resources: BTreeMap<MenuResourceId, MenuResource>,
    pub roles: BTreeMap<RoleId, Role>,
    pub permissions: BTreeMap<PermissionId, Permission>,
    pub users: BTreeMap<UserId, User>,
    pub role_menus: Vec<RoleMenu>,
    pub role_permissions: Vec<RolePermission>,
    pub user_roles: Vec<UserRole>,
}

/// 按 (owner, target) 类型选择关联表
pub(crate) trait BindingTable<O, T> {
    fn table(&self) -> &Vec<Binding<O, T>>;

    fn table_mut(&mut self) -> &mut Vec<Binding<O, T>>;
}

impl BindingTable<RoleId, MenuId> for StoreState {
    fn table(&self) -> &Vec<RoleMenu> {
        &self.role_menus
    }

    fn table_mut(&mut self) -> &mut Vec<RoleMenu> {
        &mut self.role_menus
    }
}

impl BindingTable<RoleId, PermissionId> for StoreState {
    fn table(&self) -> &Vec<RolePermission> {
        &self.role_permissions
    }

    fn table_mut(&mut self) -> &mut Vec<RolePermission> {
        &mut self.role_permissions
    }
}

impl BindingTable<UserId, RoleId> for StoreState {
    fn table(&self) -> &Vec<UserRole> {
        &self.user_roles
    }

    fn table_mut(&mut self) -> &mut Vec<UserRole> {
        &mut self.user_roles
    }
}

/// 指向某份状态的 Repository 集合，实现全部仓储 trait
#[derive(Clone)]
pub(crate) struct MemoryRepos {
    state: Arc<Mutex<StoreState>>,
    calls: Arc<AtomicU64>,
}

impl MemoryRepos {
    pub fn new(state: Arc<Mutex<StoreState>>, calls: Arc<AtomicU64>) -> Self {
        Self { state, calls }
    }

    pub fn state(&self) -> &Arc<Mutex<StoreState>> {
        &self.state
    }

    /// 记一次存储访问并加锁
    pub async fn lock(&self) -> tokio::sync::MutexGuard<'_, StoreState> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.state.lock().await
    }
}

/// 内存分页
pub(crate) fn paginate<T>(items: Vec<T>, page: &Pagination) -> PagedResult<T> {
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect();
    PagedResult::new(items, total, page)
}
