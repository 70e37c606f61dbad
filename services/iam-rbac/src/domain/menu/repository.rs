//! 菜单 Repository 接口

use async_trait::async_trait;
use atrium_errors::AppResult;

use super::menu::{Menu, MenuId, MenuResource, MenuStatus};

/// 菜单查询条件
#[derive(Debug, Clone, Default)]
pub struct MenuFilter {
    pub ids: Option<Vec<MenuId>>,
    /// 名称模糊匹配
    pub name_like: Option<String>,
    pub status: Option<MenuStatus>,
    pub parent_id: Option<MenuId>,
    /// parent_path 前缀匹配，用于子树查询
    pub path_prefix: Option<String>,
}

impl MenuFilter {
    pub fn enabled() -> Self {
        Self {
            status: Some(MenuStatus::Enabled),
            ..Default::default()
        }
    }

    pub fn with_ids(mut self, ids: Vec<MenuId>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// 内存实现与测试共用的匹配逻辑
    pub fn matches(&self, menu: &Menu) -> bool {
        if let Some(ids) = &self.ids
            && !ids.contains(&menu.id)
        {
            return false;
        }
        if let Some(name) = &self.name_like
            && !menu.name.contains(name.as_str())
        {
            return false;
        }
        if let Some(status) = self.status
            && menu.status != status
        {
            return false;
        }
        if let Some(parent_id) = &self.parent_id
            && menu.parent_id.as_ref() != Some(parent_id)
        {
            return false;
        }
        if let Some(prefix) = &self.path_prefix
            && !menu.parent_path.starts_with(prefix.as_str())
        {
            return false;
        }
        true
    }
}

/// 菜单 Repository
///
/// 返回的菜单不含 resources，需要时通过 [`MenuResourceRepository`] 加载。
/// 列表结果按 sequence 降序、创建时间升序排列。
#[async_trait]
pub trait MenuRepository: Send + Sync {
    async fn find_by_id(&self, id: &MenuId) -> AppResult<Option<Menu>>;

    async fn find_by_ids(&self, ids: &[MenuId]) -> AppResult<Vec<Menu>>;

    /// 按同级编码查找
    async fn find_by_code(&self, parent_id: Option<&MenuId>, code: &str) -> AppResult<Option<Menu>>;

    /// 按同级名称查找
    async fn find_by_name(&self, parent_id: Option<&MenuId>, name: &str) -> AppResult<Option<Menu>>;

    /// 同级下是否已有该编码，`exclude` 用于更新时排除自身
    async fn exists_code(
        &self,
        parent_id: Option<&MenuId>,
        code: &str,
        exclude: Option<&MenuId>,
    ) -> AppResult<bool>;

    /// 同级菜单中最小的 sequence，没有同级时返回 None
    async fn min_sibling_sequence(&self, parent_id: Option<&MenuId>) -> AppResult<Option<i32>>;

    /// parent_path 以 `prefix` 开头的全部节点
    async fn find_by_path_prefix(&self, prefix: &str) -> AppResult<Vec<Menu>>;

    async fn query(&self, filter: &MenuFilter) -> AppResult<Vec<Menu>>;

    async fn insert(&self, menu: &Menu) -> AppResult<()>;

    async fn update(&self, menu: &Menu) -> AppResult<()>;

    /// 批量更新子树状态，返回受影响行数
    async fn update_status_by_path_prefix(&self, prefix: &str, status: MenuStatus) -> AppResult<u64>;

    /// 把子树路径中的旧前缀替换为新前缀，返回受影响行数
    async fn rewrite_path_prefix(&self, old_prefix: &str, new_prefix: &str) -> AppResult<u64>;

    async fn delete_by_ids(&self, ids: &[MenuId]) -> AppResult<u64>;
}

/// 菜单资源 Repository
#[async_trait]
pub trait MenuResourceRepository: Send + Sync {
    async fn list_by_menu(&self, menu_id: &MenuId) -> AppResult<Vec<MenuResource>>;

    async fn list_by_menus(&self, menu_ids: &[MenuId]) -> AppResult<Vec<MenuResource>>;

    async fn insert(&self, resource: &MenuResource) -> AppResult<()>;

    async fn delete_by_menu(&self, menu_id: &MenuId) -> AppResult<u64>;

    async fn delete_by_menus(&self, menu_ids: &[MenuId]) -> AppResult<u64>;
}
