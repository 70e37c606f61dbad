//! 菜单树
//!
//! 维护物化路径不变式：`parent_path(M) == parent_path(parent) + parent.id + "."`。
//! 子树一律通过 `parent_path + id + "."` 前缀定位，级联更新与删除都是单条前缀查询，
//! 不做递归遍历。所有方法都应在同一个 Unit of Work 内调用。

use std::collections::{HashMap, HashSet};

use atrium_common::tree_path;
use atrium_errors::AppResult;
use chrono::Utc;
use tracing::{debug, info};

use super::forest::{MenuNode, assemble_forest, retain_reachable};
use super::menu::{Menu, MenuId, MenuResource, MenuStatus, MenuType, ResourceSpec};
use super::repository::MenuFilter;
use crate::domain::role::RoleId;
use crate::domain::unit_of_work::Repositories;
use crate::error::RbacError;

/// 新建菜单
#[derive(Debug, Clone, Default)]
pub struct NewMenu {
    /// 外部指定 ID（导入时使用），为空时自动生成
    pub id: Option<MenuId>,
    pub parent_id: Option<MenuId>,
    pub code: String,
    pub name: String,
    pub description: String,
    /// 为空时取当前同级数量
    pub sequence: Option<i32>,
    pub menu_type: MenuType,
    pub route: String,
    pub properties: String,
    pub status: Option<MenuStatus>,
    pub resources: Vec<ResourceSpec>,
}

/// 菜单全量修改
#[derive(Debug, Clone)]
pub struct MenuChanges {
    pub parent_id: Option<MenuId>,
    pub code: String,
    pub name: String,
    pub description: String,
    pub sequence: i32,
    pub menu_type: MenuType,
    pub route: String,
    pub properties: String,
    pub status: MenuStatus,
    /// None 表示不修改资源
    pub resources: Option<Vec<ResourceSpec>>,
}

impl MenuChanges {
    /// 以现有菜单为基础构造，调用方只改需要的字段
    pub fn from_menu(menu: &Menu) -> Self {
        Self {
            parent_id: menu.parent_id,
            code: menu.code.clone(),
            name: menu.name.clone(),
            description: menu.description.clone(),
            sequence: menu.sequence,
            menu_type: menu.menu_type,
            route: menu.route.clone(),
            properties: menu.properties.clone(),
            status: menu.status,
            resources: None,
        }
    }
}

/// 可见范围
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuScope {
    /// 全部启用菜单（超级管理员）
    All,
    /// 指定角色可见的菜单
    Roles(Vec<RoleId>),
}

/// 菜单树
#[derive(Debug, Clone, Default)]
pub struct MenuTree {
    deny_delete: bool,
}

impl MenuTree {
    pub fn new(deny_delete: bool) -> Self {
        Self { deny_delete }
    }

    pub fn deny_delete(&self) -> bool {
        self.deny_delete
    }

    /// 创建菜单及其资源
    pub async fn create<R: Repositories + ?Sized>(&self, repos: &R, new: NewMenu) -> AppResult<Menu> {
        let menus = repos.menus();

        if let Some(id) = &new.id
            && menus.find_by_id(id).await?.is_some()
        {
            return Err(RbacError::MenuAlreadyExists.into());
        }

        let parent_path = match &new.parent_id {
            Some(parent_id) => menus
                .find_by_id(parent_id)
                .await?
                .ok_or(RbacError::ParentMenuNotFound)?
                .subtree_prefix(),
            None => String::new(),
        };

        if menus.exists_code(new.parent_id.as_ref(), &new.code, None).await? {
            return Err(RbacError::MenuCodeExists.into());
        }

        let sequence = match new.sequence {
            Some(sequence) => sequence,
            // 排在现有同级之后，sequence 降序时保持插入顺序
            None => menus
                .min_sibling_sequence(new.parent_id.as_ref())
                .await?
                .map_or(0, |min| min.saturating_sub(1)),
        };

        let now = Utc::now();
        let mut menu = Menu {
            id: new.id.unwrap_or_default(),
            parent_id: new.parent_id,
            parent_path,
            code: new.code,
            name: new.name,
            description: new.description,
            sequence,
            menu_type: new.menu_type,
            route: new.route,
            properties: new.properties,
            status: new.status.unwrap_or_default(),
            resources: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        menus.insert(&menu).await?;
        menu.resources = self.replace_resources(repos, &menu.id, &new.resources).await?;

        debug!(menu_id = %menu.id, parent_path = %menu.parent_path, "Menu created");
        Ok(menu)
    }

    /// 修改菜单，包括移动、状态级联与资源替换
    ///
    /// 仅在本节点从启用变为禁用时向子树级联；重新启用不会恢复子节点状态。
    pub async fn relocate<R: Repositories + ?Sized>(
        &self,
        repos: &R,
        id: &MenuId,
        changes: MenuChanges,
    ) -> AppResult<Menu> {
        let menus = repos.menus();
        let mut menu = menus.find_by_id(id).await?.ok_or(RbacError::MenuNotFound)?;
        let old_prefix = menu.subtree_prefix();
        let parent_changed = changes.parent_id != menu.parent_id;

        let new_parent_path = if parent_changed {
            match &changes.parent_id {
                Some(parent_id) if parent_id == id => return Err(RbacError::MenuCycle.into()),
                Some(parent_id) => {
                    let parent = menus
                        .find_by_id(parent_id)
                        .await?
                        .ok_or(RbacError::ParentMenuNotFound)?;
                    if parent.in_subtree(&old_prefix) {
                        return Err(RbacError::MenuCycle.into());
                    }
                    parent.subtree_prefix()
                }
                None => String::new(),
            }
        } else {
            menu.parent_path.clone()
        };

        if (parent_changed || changes.code != menu.code)
            && menus
                .exists_code(changes.parent_id.as_ref(), &changes.code, Some(id))
                .await?
        {
            return Err(RbacError::MenuCodeExists.into());
        }

        if menu.status == MenuStatus::Enabled && changes.status == MenuStatus::Disabled {
            let rows = menus
                .update_status_by_path_prefix(&old_prefix, MenuStatus::Disabled)
                .await?;
            metrics::counter!("rbac_menu_cascade_rows_total", "kind" => "status").increment(rows);
            info!(menu_id = %id, rows, "Menu disabled with descendants");
        }

        if parent_changed {
            let new_prefix = tree_path::child_prefix(&new_parent_path, &id.to_string());
            let rows = menus.rewrite_path_prefix(&old_prefix, &new_prefix).await?;
            metrics::counter!("rbac_menu_cascade_rows_total", "kind" => "path").increment(rows);
            info!(menu_id = %id, rows, from = %menu.parent_path, to = %new_parent_path, "Menu moved");
        }

        menu.parent_id = changes.parent_id;
        menu.parent_path = new_parent_path;
        menu.code = changes.code;
        menu.name = changes.name;
        menu.description = changes.description;
        menu.sequence = changes.sequence;
        menu.menu_type = changes.menu_type;
        menu.route = changes.route;
        menu.properties = changes.properties;
        menu.status = changes.status;
        menu.updated_at = Utc::now();
        menus.update(&menu).await?;

        menu.resources = match changes.resources {
            Some(specs) => self.replace_resources(repos, id, &specs).await?,
            None => repos.menu_resources().list_by_menu(id).await?,
        };

        Ok(menu)
    }

    /// 删除菜单及整个子树，连同资源与角色绑定，返回被删除的菜单 ID
    pub async fn remove_subtree<R: Repositories + ?Sized>(
        &self,
        repos: &R,
        id: &MenuId,
    ) -> AppResult<Vec<MenuId>> {
        if self.deny_delete {
            return Err(RbacError::MenuDeletionDenied.into());
        }

        let menus = repos.menus();
        let menu = menus.find_by_id(id).await?.ok_or(RbacError::MenuNotFound)?;

        let mut ids = vec![menu.id];
        ids.extend(
            menus
                .find_by_path_prefix(&menu.subtree_prefix())
                .await?
                .into_iter()
                .map(|m| m.id),
        );

        let resources = repos.menu_resources().delete_by_menus(&ids).await?;
        let bindings = repos.role_menus().delete_by_targets(&ids).await?;
        let deleted = menus.delete_by_ids(&ids).await?;
        metrics::counter!("rbac_menu_cascade_rows_total", "kind" => "delete").increment(deleted);

        info!(menu_id = %id, menus = deleted, resources, bindings, "Menu subtree deleted");
        Ok(ids)
    }

    /// 可见菜单森林
    ///
    /// 只包含启用菜单；授权节点的祖先即使未被授权也会补齐，
    /// 祖先链中有禁用节点时整条分支不可见。
    pub async fn visible_forest<R: Repositories + ?Sized>(
        &self,
        repos: &R,
        scope: &MenuScope,
    ) -> AppResult<Vec<MenuNode>> {
        let menus = repos.menus();

        let mut visible = match scope {
            MenuScope::All => menus.query(&MenuFilter::enabled()).await?,
            MenuScope::Roles(role_ids) => {
                let menu_ids = self.granted_menu_ids(repos, role_ids).await?;
                if menu_ids.is_empty() {
                    return Ok(Vec::new());
                }
                menus.query(&MenuFilter::enabled().with_ids(menu_ids)).await?
            }
        };

        let present: HashSet<MenuId> = visible.iter().map(|m| m.id).collect();
        let mut missing: Vec<MenuId> = visible
            .iter()
            .flat_map(Menu::ancestor_ids)
            .filter(|id| !present.contains(id))
            .collect();
        missing.sort();
        missing.dedup();

        if !missing.is_empty() {
            visible.extend(menus.query(&MenuFilter::enabled().with_ids(missing)).await?);
        }

        let mut reachable = retain_reachable(visible);
        self.attach_resources(repos, &mut reachable).await?;
        Ok(assemble_forest(reachable))
    }

    /// 批量加载资源并挂到菜单上
    pub async fn attach_resources<R: Repositories + ?Sized>(
        &self,
        repos: &R,
        menus: &mut [Menu],
    ) -> AppResult<()> {
        if menus.is_empty() {
            return Ok(());
        }

        let ids: Vec<MenuId> = menus.iter().map(|m| m.id).collect();
        let mut grouped: HashMap<MenuId, Vec<MenuResource>> = HashMap::new();
        for resource in repos.menu_resources().list_by_menus(&ids).await? {
            grouped.entry(resource.menu_id).or_default().push(resource);
        }

        for menu in menus.iter_mut() {
            menu.resources = grouped.remove(&menu.id).unwrap_or_default();
        }
        Ok(())
    }

    /// 启用角色所绑定的菜单 ID
    async fn granted_menu_ids<R: Repositories + ?Sized>(
        &self,
        repos: &R,
        role_ids: &[RoleId],
    ) -> AppResult<Vec<MenuId>> {
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }

        let enabled: Vec<RoleId> = repos
            .roles()
            .find_by_ids(role_ids)
            .await?
            .into_iter()
            .filter(|role| role.is_enabled())
            .map(|role| role.id)
            .collect();
        if enabled.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<MenuId> = repos
            .role_menus()
            .list_by_owners(&enabled)
            .await?
            .into_iter()
            .map(|binding| binding.target_id)
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    /// 整体替换菜单资源；同一 方法+路径 沿用原记录
    async fn replace_resources<R: Repositories + ?Sized>(
        &self,
        repos: &R,
        menu_id: &MenuId,
        specs: &[ResourceSpec],
    ) -> AppResult<Vec<MenuResource>> {
        let store = repos.menu_resources();
        let mut existing: HashMap<(String, String), MenuResource> = store
            .list_by_menu(menu_id)
            .await?
            .into_iter()
            .map(|r| (r.key(), r))
            .collect();

        store.delete_by_menu(menu_id).await?;

        let mut seen = HashSet::new();
        let mut resources = Vec::with_capacity(specs.len());
        for spec in specs {
            let key = spec.key();
            if !seen.insert(key.clone()) {
                continue;
            }
            let resource = match existing.remove(&key) {
                Some(mut kept) => {
                    kept.method = spec.normalized_method();
                    kept
                }
                None => MenuResource::new(*menu_id, spec),
            };
            store.insert(&resource).await?;
            resources.push(resource);
        }
        Ok(resources)
    }
}
