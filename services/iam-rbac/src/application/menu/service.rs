//! 菜单应用服务

use std::path::Path;
use std::sync::Arc;

use atrium_errors::{AppError, AppResult};
use tracing::{info, instrument};

use super::commands::{CreateMenuCommand, MenuListing, MenuQuery, UpdateMenuCommand};
use super::import::{ImportSummary, MenuSeed, import_menus};
use crate::application::finish;
use crate::domain::menu::{Menu, MenuId, MenuNode, MenuScope, MenuTree, assemble_forest};
use crate::domain::session::AuthContext;
use crate::domain::unit_of_work::RbacStore;
use crate::error::RbacError;
use crate::infrastructure::cache::{AuthorizationSync, PolicyDomain};

/// 菜单应用服务
///
/// 写操作提交后触发角色域的策略同步信号。
pub struct MenuService {
    store: Arc<dyn RbacStore>,
    tree: MenuTree,
    sync: AuthorizationSync,
}

impl MenuService {
    pub fn new(store: Arc<dyn RbacStore>, tree: MenuTree, sync: AuthorizationSync) -> Self {
        Self { store, tree, sync }
    }

    /// 创建菜单
    #[instrument(skip(self, cmd), fields(code = %cmd.code))]
    pub async fn create(&self, cmd: CreateMenuCommand) -> AppResult<Menu> {
        cmd.validate().map_err(AppError::validation)?;

        let uow = self.store.begin().await?;
        let result = self.tree.create(uow.as_ref(), cmd.into_new_menu()).await;
        let menu = finish(uow, result).await?;

        self.sync.touch(PolicyDomain::Role).await;
        info!(menu_id = %menu.id, "Menu created");
        Ok(menu)
    }

    /// 修改菜单（全量）
    #[instrument(skip(self, cmd))]
    pub async fn update(&self, id: &MenuId, cmd: UpdateMenuCommand) -> AppResult<Menu> {
        cmd.validate().map_err(AppError::validation)?;

        let uow = self.store.begin().await?;
        let result = self.tree.relocate(uow.as_ref(), id, cmd.into_changes()).await;
        let menu = finish(uow, result).await?;

        self.sync.touch(PolicyDomain::Role).await;
        Ok(menu)
    }

    /// 删除菜单及其子树
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &MenuId) -> AppResult<Vec<MenuId>> {
        let uow = self.store.begin().await?;
        let result = self.tree.remove_subtree(uow.as_ref(), id).await;
        let removed = finish(uow, result).await?;

        self.sync.touch(PolicyDomain::Role).await;
        Ok(removed)
    }

    /// 获取菜单（含资源）
    pub async fn get(&self, id: &MenuId) -> AppResult<Menu> {
        let mut menu = self
            .store
            .menus()
            .find_by_id(id)
            .await?
            .ok_or(RbacError::MenuNotFound)?;
        menu.resources = self.store.menu_resources().list_by_menu(id).await?;
        Ok(menu)
    }

    /// 条件查询，可选附带资源或组装为树
    pub async fn query(&self, query: &MenuQuery) -> AppResult<MenuListing> {
        let mut menus = self.store.menus().query(&query.filter()).await?;
        if query.include_resources {
            self.tree.attach_resources(&*self.store, &mut menus).await?;
        }

        Ok(if query.as_tree {
            MenuListing::Tree(assemble_forest(menus))
        } else {
            MenuListing::Flat(menus)
        })
    }

    /// 当前主体可见的菜单树
    pub async fn query_visible_for_user(&self, ctx: &AuthContext) -> AppResult<Vec<MenuNode>> {
        let scope = if ctx.is_root() {
            MenuScope::All
        } else {
            MenuScope::Roles(ctx.role_ids.clone())
        };
        self.tree.visible_forest(&*self.store, &scope).await
    }

    /// 从 JSON 文件导入菜单种子
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn init_from_file(&self, path: impl AsRef<Path>) -> AppResult<ImportSummary> {
        let content = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(|e| RbacError::InvalidMenuFile(e.to_string()))?;
        let seeds: Vec<MenuSeed> = serde_json::from_str(&content)
            .map_err(|e| RbacError::InvalidMenuFile(e.to_string()))?;

        self.import_seeds(seeds).await
    }

    /// 导入菜单种子，整体在一个事务内完成
    pub async fn import_seeds(&self, seeds: Vec<MenuSeed>) -> AppResult<ImportSummary> {
        let uow = self.store.begin().await?;
        let result = import_menus(&self.tree, uow.as_ref(), seeds).await;
        let summary = finish(uow, result).await?;

        if summary.created > 0 {
            self.sync.touch(PolicyDomain::Role).await;
        }
        info!(
            created = summary.created,
            skipped = summary.skipped,
            resources = summary.resources_added,
            "Menu seeds imported"
        );
        Ok(summary)
    }
}
