//! 进程内仓储实现
//!
//! 唯一约束与 PostgreSQL 表结构保持一致，违反时返回 Conflict。

use async_trait::async_trait;
use atrium_common::{Identifier, PagedResult, Pagination, UserId, tree_path};
use atrium_errors::{AppError, AppResult};
use chrono::Utc;

use super::state::{BindingTable, MemoryRepos, StoreState, paginate};
use crate::domain::association::{AssociationRepository, Binding, plan_replacement};
use crate::domain::menu::{
    Menu, MenuFilter, MenuId, MenuRepository, MenuResource, MenuResourceRepository, MenuStatus,
    sort_menus,
};
use crate::domain::permission::{Permission, PermissionFilter, PermissionId, PermissionRepository};
use crate::domain::role::{Role, RoleFilter, RoleId, RoleRepository};
use crate::domain::user::{User, UserFilter, UserRepository, UserStatus};

fn duplicate(what: &str) -> AppError {
    AppError::conflict(format!("Duplicate {}", what))
}

fn same_sibling(menu: &Menu, parent_id: Option<&MenuId>, code: &str) -> bool {
    menu.parent_id.as_ref() == parent_id && menu.code == code
}

fn sorted(mut menus: Vec<Menu>) -> Vec<Menu> {
    sort_menus(&mut menus);
    menus
}

#[async_trait]
impl MenuRepository for MemoryRepos {
    async fn find_by_id(&self, id: &MenuId) -> AppResult<Option<Menu>> {
        Ok(self.lock().await.menus.get(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[MenuId]) -> AppResult<Vec<Menu>> {
        let state = self.lock().await;
        Ok(sorted(
            ids.iter()
                .filter_map(|id| state.menus.get(id).cloned())
                .collect(),
        ))
    }

    async fn find_by_code(&self, parent_id: Option<&MenuId>, code: &str) -> AppResult<Option<Menu>> {
        let state = self.lock().await;
        Ok(state
            .menus
            .values()
            .find(|m| same_sibling(m, parent_id, code))
            .cloned())
    }

    async fn find_by_name(&self, parent_id: Option<&MenuId>, name: &str) -> AppResult<Option<Menu>> {
        let state = self.lock().await;
        Ok(state
            .menus
            .values()
            .find(|m| m.parent_id.as_ref() == parent_id && m.name == name)
            .cloned())
    }

    async fn exists_code(
        &self,
        parent_id: Option<&MenuId>,
        code: &str,
        exclude: Option<&MenuId>,
    ) -> AppResult<bool> {
        let state = self.lock().await;
        Ok(state
            .menus
            .values()
            .any(|m| same_sibling(m, parent_id, code) && Some(&m.id) != exclude))
    }

    async fn min_sibling_sequence(&self, parent_id: Option<&MenuId>) -> AppResult<Option<i32>> {
        let state = self.lock().await;
        Ok(state
            .menus
            .values()
            .filter(|m| m.parent_id.as_ref() == parent_id)
            .map(|m| m.sequence)
            .min())
    }

    async fn find_by_path_prefix(&self, prefix: &str) -> AppResult<Vec<Menu>> {
        let state = self.lock().await;
        Ok(sorted(
            state
                .menus
                .values()
                .filter(|m| tree_path::in_subtree(&m.parent_path, prefix))
                .cloned()
                .collect(),
        ))
    }

    async fn query(&self, filter: &MenuFilter) -> AppResult<Vec<Menu>> {
        let state = self.lock().await;
        Ok(sorted(
            state
                .menus
                .values()
                .filter(|m| filter.matches(m))
                .cloned()
                .collect(),
        ))
    }

    async fn insert(&self, menu: &Menu) -> AppResult<()> {
        let mut state = self.lock().await;
        if state.menus.contains_key(&menu.id) {
            return Err(duplicate("menu id"));
        }
        if state
            .menus
            .values()
            .any(|m| same_sibling(m, menu.parent_id.as_ref(), &menu.code))
        {
            return Err(duplicate("menu code"));
        }

        let mut row = menu.clone();
        row.resources.clear();
        state.menus.insert(row.id, row);
        Ok(())
    }

    async fn update(&self, menu: &Menu) -> AppResult<()> {
        let mut state = self.lock().await;
        if !state.menus.contains_key(&menu.id) {
            return Err(AppError::not_found("Menu not found"));
        }
        if state
            .menus
            .values()
            .any(|m| m.id != menu.id && same_sibling(m, menu.parent_id.as_ref(), &menu.code))
        {
            return Err(duplicate("menu code"));
        }

        let mut row = menu.clone();
        row.resources.clear();
        state.menus.insert(row.id, row);
        Ok(())
    }

    async fn update_status_by_path_prefix(&self, prefix: &str, status: MenuStatus) -> AppResult<u64> {
        let mut state = self.lock().await;
        let now = Utc::now();
        let mut rows = 0;
        for menu in state.menus.values_mut() {
            if tree_path::in_subtree(&menu.parent_path, prefix) && menu.status != status {
                menu.status = status;
                menu.updated_at = now;
                rows += 1;
            }
        }
        Ok(rows)
    }

    async fn rewrite_path_prefix(&self, old_prefix: &str, new_prefix: &str) -> AppResult<u64> {
        let mut state = self.lock().await;
        let mut rows = 0;
        for menu in state.menus.values_mut() {
            if !tree_path::in_subtree(&menu.parent_path, old_prefix) {
                continue;
            }
            if let Some(path) = tree_path::rebase(&menu.parent_path, old_prefix, new_prefix) {
                menu.parent_path = path;
                rows += 1;
            }
        }
        Ok(rows)
    }

    async fn delete_by_ids(&self, ids: &[MenuId]) -> AppResult<u64> {
        let mut state = self.lock().await;
        Ok(ids
            .iter()
            .filter(|id| state.menus.remove(*id).is_some())
            .count() as u64)
    }
}

#[async_trait]
impl MenuResourceRepository for MemoryRepos {
    async fn list_by_menu(&self, menu_id: &MenuId) -> AppResult<Vec<MenuResource>> {
        self.list_by_menus(std::slice::from_ref(menu_id)).await
    }

    async fn list_by_menus(&self, menu_ids: &[MenuId]) -> AppResult<Vec<MenuResource>> {
        let state = self.lock().await;
        let mut resources: Vec<MenuResource> = state
            .menu_resources
            .values()
            .filter(|r| menu_ids.contains(&r.menu_id))
            .cloned()
            .collect();
        resources.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(resources)
    }

    async fn insert(&self, resource: &MenuResource) -> AppResult<()> {
        let mut state = self.lock().await;
        if state.menu_resources.contains_key(&resource.id)
            || state
                .menu_resources
                .values()
                .any(|r| r.menu_id == resource.menu_id && r.key() == resource.key())
        {
            return Err(duplicate("menu resource"));
        }
        state.menu_resources.insert(resource.id, resource.clone());
        Ok(())
    }

    async fn delete_by_menu(&self, menu_id: &MenuId) -> AppResult<u64> {
        self.delete_by_menus(std::slice::from_ref(menu_id)).await
    }

    async fn delete_by_menus(&self, menu_ids: &[MenuId]) -> AppResult<u64> {
        let mut state = self.lock().await;
        let before = state.menu_resources.len();
        state
            .menu_resources
            .retain(|_, r| !menu_ids.contains(&r.menu_id));
        Ok((before - state.menu_resources.len()) as u64)
    }
}

#[async_trait]
impl RoleRepository for MemoryRepos {
    async fn find_by_id(&self, id: &RoleId) -> AppResult<Option<Role>> {
        Ok(self.lock().await.roles.get(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[RoleId]) -> AppResult<Vec<Role>> {
        let state = self.lock().await;
        Ok(ids.iter().filter_map(|id| state.roles.get(id).cloned()).collect())
    }

    async fn exists_by_code(&self, code: &str, exclude: Option<&RoleId>) -> AppResult<bool> {
        let state = self.lock().await;
        Ok(state
            .roles
            .values()
            .any(|r| r.code == code && Some(&r.id) != exclude))
    }

    async fn query(&self, filter: &RoleFilter, page: &Pagination) -> AppResult<PagedResult<Role>> {
        let state = self.lock().await;
        let mut roles: Vec<Role> = state
            .roles
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        roles.sort_by(|a, b| {
            b.sequence
                .cmp(&a.sequence)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(paginate(roles, page))
    }

    async fn insert(&self, role: &Role) -> AppResult<()> {
        let mut state = self.lock().await;
        if state.roles.contains_key(&role.id) || state.roles.values().any(|r| r.code == role.code) {
            return Err(duplicate("role code"));
        }
        state.roles.insert(role.id, role.clone());
        Ok(())
    }

    async fn update(&self, role: &Role) -> AppResult<()> {
        let mut state = self.lock().await;
        if !state.roles.contains_key(&role.id) {
            return Err(AppError::not_found("Role not found"));
        }
        if state
            .roles
            .values()
            .any(|r| r.id != role.id && r.code == role.code)
        {
            return Err(duplicate("role code"));
        }
        state.roles.insert(role.id, role.clone());
        Ok(())
    }

    async fn delete(&self, id: &RoleId) -> AppResult<()> {
        self.lock().await.roles.remove(id);
        Ok(())
    }
}

#[async_trait]
impl PermissionRepository for MemoryRepos {
    async fn find_by_id(&self, id: &PermissionId) -> AppResult<Option<Permission>> {
        Ok(self.lock().await.permissions.get(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[PermissionId]) -> AppResult<Vec<Permission>> {
        let state = self.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.permissions.get(id).cloned())
            .collect())
    }

    async fn exists_by_slug(&self, slug: &str, exclude: Option<&PermissionId>) -> AppResult<bool> {
        let state = self.lock().await;
        Ok(state
            .permissions
            .values()
            .any(|p| p.slug == slug && Some(&p.id) != exclude))
    }

    async fn query(
        &self,
        filter: &PermissionFilter,
        page: &Pagination,
    ) -> AppResult<PagedResult<Permission>> {
        let state = self.lock().await;
        let mut permissions: Vec<Permission> = state
            .permissions
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        permissions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(paginate(permissions, page))
    }

    async fn insert(&self, permission: &Permission) -> AppResult<()> {
        let mut state = self.lock().await;
        if state.permissions.contains_key(&permission.id)
            || state.permissions.values().any(|p| p.slug == permission.slug)
        {
            return Err(duplicate("permission slug"));
        }
        state.permissions.insert(permission.id, permission.clone());
        Ok(())
    }

    async fn update(&self, permission: &Permission) -> AppResult<()> {
        let mut state = self.lock().await;
        if !state.permissions.contains_key(&permission.id) {
            return Err(AppError::not_found("Permission not found"));
        }
        if state
            .permissions
            .values()
            .any(|p| p.id != permission.id && p.slug == permission.slug)
        {
            return Err(duplicate("permission slug"));
        }
        state.permissions.insert(permission.id, permission.clone());
        Ok(())
    }

    async fn delete(&self, id: &PermissionId) -> AppResult<()> {
        self.lock().await.permissions.remove(id);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryRepos {
    async fn find_by_id(&self, id: &UserId) -> AppResult<Option<User>> {
        Ok(self.lock().await.users.get(id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let state = self.lock().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn exists_by_username(&self, username: &str, exclude: Option<&UserId>) -> AppResult<bool> {
        let state = self.lock().await;
        Ok(state
            .users
            .values()
            .any(|u| u.username == username && Some(&u.id) != exclude))
    }

    async fn query(&self, filter: &UserFilter, page: &Pagination) -> AppResult<PagedResult<User>> {
        let state = self.lock().await;
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(paginate(users, page))
    }

    async fn insert(&self, user: &User) -> AppResult<()> {
        let mut state = self.lock().await;
        if state.users.contains_key(&user.id)
            || state.users.values().any(|u| u.username == user.username)
        {
            return Err(duplicate("username"));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> AppResult<()> {
        let mut state = self.lock().await;
        if !state.users.contains_key(&user.id) {
            return Err(AppError::not_found("User not found"));
        }
        if state
            .users
            .values()
            .any(|u| u.id != user.id && u.username == user.username)
        {
            return Err(duplicate("username"));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_status(&self, id: &UserId, status: UserStatus) -> AppResult<()> {
        let mut state = self.lock().await;
        let user = state
            .users
            .get_mut(id)
            .ok_or_else(|| AppError::not_found("User not found"))?;
        user.status = status;
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, id: &UserId) -> AppResult<()> {
        self.lock().await.users.remove(id);
        Ok(())
    }
}

#[async_trait]
impl<O, T> AssociationRepository<O, T> for MemoryRepos
where
    O: Identifier,
    T: Identifier,
    StoreState: BindingTable<O, T>,
{
    async fn list_by_owner(&self, owner_id: &O) -> AppResult<Vec<Binding<O, T>>> {
        <Self as AssociationRepository<O, T>>::list_by_owners(self, std::slice::from_ref(owner_id))
            .await
    }

    async fn list_by_owners(&self, owner_ids: &[O]) -> AppResult<Vec<Binding<O, T>>> {
        let state = self.lock().await;
        Ok(<StoreState as BindingTable<O, T>>::table(&state)
            .iter()
            .filter(|b| owner_ids.contains(&b.owner_id))
            .cloned()
            .collect())
    }

    async fn list_by_target(&self, target_id: &T) -> AppResult<Vec<Binding<O, T>>> {
        let state = self.lock().await;
        Ok(<StoreState as BindingTable<O, T>>::table(&state)
            .iter()
            .filter(|b| &b.target_id == target_id)
            .cloned()
            .collect())
    }

    async fn replace_all(&self, owner_id: &O, target_ids: &[T]) -> AppResult<Vec<Binding<O, T>>> {
        let mut state = self.lock().await;
        let table = <StoreState as BindingTable<O, T>>::table_mut(&mut state);

        let existing: Vec<Binding<O, T>> = table
            .iter()
            .filter(|b| &b.owner_id == owner_id)
            .cloned()
            .collect();
        let plan = plan_replacement(&existing, *owner_id, target_ids);

        table.retain(|b| &b.owner_id != owner_id);
        table.extend(plan.iter().cloned());
        Ok(plan)
    }

    async fn delete_by_owner(&self, owner_id: &O) -> AppResult<u64> {
        let mut state = self.lock().await;
        let table = <StoreState as BindingTable<O, T>>::table_mut(&mut state);
        let before = table.len();
        table.retain(|b| &b.owner_id != owner_id);
        Ok((before - table.len()) as u64)
    }

    async fn delete_by_target(&self, target_id: &T) -> AppResult<u64> {
        <Self as AssociationRepository<O, T>>::delete_by_targets(self, std::slice::from_ref(target_id))
            .await
    }

    async fn delete_by_targets(&self, target_ids: &[T]) -> AppResult<u64> {
        let mut state = self.lock().await;
        let table = <StoreState as BindingTable<O, T>>::table_mut(&mut state);
        let before = table.len();
        table.retain(|b| !target_ids.contains(&b.target_id));
        Ok((before - table.len()) as u64)
    }
}
