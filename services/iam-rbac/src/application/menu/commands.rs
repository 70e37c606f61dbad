//! 菜单相关命令定义

use serde::{Deserialize, Serialize};

use crate::application::check_text;
use crate::domain::menu::{
    Menu, MenuChanges, MenuFilter, MenuId, MenuNode, MenuStatus, MenuType, NewMenu, ResourceSpec,
};

const MAX_CODE_LEN: usize = 128;
const MAX_NAME_LEN: usize = 128;
const MAX_DESCRIPTION_LEN: usize = 1024;

fn validate_common(
    code: &str,
    name: &str,
    description: &str,
    properties: &str,
    resources: &[ResourceSpec],
) -> Result<(), String> {
    check_text("Menu code", code, MAX_CODE_LEN)?;
    check_text("Menu name", name, MAX_NAME_LEN)?;
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(format!(
            "Menu description cannot exceed {} characters",
            MAX_DESCRIPTION_LEN
        ));
    }
    if !properties.is_empty() && serde_json::from_str::<serde_json::Value>(properties).is_err() {
        return Err("Menu properties must be valid JSON".to_string());
    }
    for resource in resources {
        if resource.normalized_method().is_empty() {
            return Err("Resource method cannot be empty".to_string());
        }
        if !resource.path.starts_with('/') {
            return Err(format!("Resource path must start with '/': {}", resource.path));
        }
    }
    Ok(())
}

/// 创建菜单命令
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateMenuCommand {
    pub parent_id: Option<MenuId>,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub sequence: Option<i32>,
    #[serde(default)]
    pub menu_type: MenuType,
    #[serde(default)]
    pub route: String,
    #[serde(default)]
    pub properties: String,
    pub status: Option<MenuStatus>,
    #[serde(default)]
    pub resources: Vec<ResourceSpec>,
}

impl CreateMenuCommand {
    pub fn validate(&self) -> Result<(), String> {
        validate_common(
            &self.code,
            &self.name,
            &self.description,
            &self.properties,
            &self.resources,
        )
    }

    pub fn into_new_menu(self) -> NewMenu {
        NewMenu {
            id: None,
            parent_id: self.parent_id,
            code: self.code,
            name: self.name,
            description: self.description,
            sequence: self.sequence,
            menu_type: self.menu_type,
            route: self.route,
            properties: self.properties,
            status: self.status,
            resources: self.resources,
        }
    }
}

/// 修改菜单命令（全量）
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMenuCommand {
    pub parent_id: Option<MenuId>,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sequence: i32,
    #[serde(default)]
    pub menu_type: MenuType,
    #[serde(default)]
    pub route: String,
    #[serde(default)]
    pub properties: String,
    pub status: MenuStatus,
    /// 为空表示保持原有资源
    pub resources: Option<Vec<ResourceSpec>>,
}

impl UpdateMenuCommand {
    /// 以现有菜单为基础，便于只改部分字段
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

    pub fn validate(&self) -> Result<(), String> {
        validate_common(
            &self.code,
            &self.name,
            &self.description,
            &self.properties,
            self.resources.as_deref().unwrap_or_default(),
        )
    }

    pub fn into_changes(self) -> MenuChanges {
        MenuChanges {
            parent_id: self.parent_id,
            code: self.code,
            name: self.name,
            description: self.description,
            sequence: self.sequence,
            menu_type: self.menu_type,
            route: self.route,
            properties: self.properties,
            status: self.status,
            resources: self.resources,
        }
    }
}

/// 菜单查询
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuQuery {
    pub ids: Option<Vec<MenuId>>,
    pub name_like: Option<String>,
    pub status: Option<MenuStatus>,
    pub parent_id: Option<MenuId>,
    pub path_prefix: Option<String>,
    #[serde(default)]
    pub include_resources: bool,
    #[serde(default)]
    pub as_tree: bool,
}

impl MenuQuery {
    pub fn filter(&self) -> MenuFilter {
        MenuFilter {
            ids: self.ids.clone(),
            name_like: self.name_like.clone(),
            status: self.status,
            parent_id: self.parent_id,
            path_prefix: self.path_prefix.clone(),
        }
    }
}

/// 查询结果：扁平列表或树
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MenuListing {
    Flat(Vec<Menu>),
    Tree(Vec<MenuNode>),
}
