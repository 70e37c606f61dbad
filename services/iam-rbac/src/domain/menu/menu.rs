//! 菜单实体

use atrium_common::{define_id, tree_path};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

define_id!(
    /// 菜单 ID
    MenuId
);

define_id!(
    /// 菜单资源 ID
    MenuResourceId
);

/// 菜单状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MenuStatus {
    #[default]
    Enabled,
    Disabled,
}

impl MenuStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
        }
    }
}

impl std::str::FromStr for MenuStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enabled" => Ok(Self::Enabled),
            "disabled" => Ok(Self::Disabled),
            other => Err(format!("Unknown menu status: {}", other)),
        }
    }
}

/// 菜单类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MenuType {
    #[default]
    Page,
    Button,
}

impl MenuType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Button => "button",
        }
    }
}

impl std::str::FromStr for MenuType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "page" => Ok(Self::Page),
            "button" => Ok(Self::Button),
            other => Err(format!("Unknown menu type: {}", other)),
        }
    }
}

/// 菜单实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Menu {
    pub id: MenuId,
    pub parent_id: Option<MenuId>,
    /// 祖先 ID 链，不含自身
    pub parent_path: String,
    pub code: String,
    pub name: String,
    pub description: String,
    /// 排序值，降序
    pub sequence: i32,
    pub menu_type: MenuType,
    /// 前端路由
    pub route: String,
    /// 扩展属性（JSON 字符串）
    pub properties: String,
    pub status: MenuStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<MenuResource>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Menu {
    /// 以本节点为根的子树前缀，也是子节点的 parent_path
    pub fn subtree_prefix(&self) -> String {
        tree_path::child_prefix(&self.parent_path, &self.id.to_string())
    }

    /// 祖先 ID（根在前）
    pub fn ancestor_ids(&self) -> Vec<MenuId> {
        tree_path::decode(&self.parent_path)
            .into_iter()
            .filter_map(|segment| segment.parse().ok())
            .collect()
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_enabled(&self) -> bool {
        self.status == MenuStatus::Enabled
    }

    /// 是否位于 `prefix` 指定的子树内
    pub fn in_subtree(&self, prefix: &str) -> bool {
        tree_path::in_subtree(&self.parent_path, prefix)
    }
}

/// 菜单绑定的 API 资源
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuResource {
    pub id: MenuResourceId,
    pub menu_id: MenuId,
    pub method: String,
    pub path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MenuResource {
    pub fn new(menu_id: MenuId, spec: &ResourceSpec) -> Self {
        let now = Utc::now();
        Self {
            id: MenuResourceId::new(),
            menu_id,
            method: spec.normalized_method(),
            path: spec.path.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 去重键：方法 + 路径
    pub fn key(&self) -> (String, String) {
        (self.method.to_ascii_uppercase(), self.path.clone())
    }
}

/// 资源描述（创建/更新时提交）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub method: String,
    pub path: String,
}

impl ResourceSpec {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
        }
    }

    pub fn normalized_method(&self) -> String {
        self.method.trim().to_ascii_uppercase()
    }

    pub fn key(&self) -> (String, String) {
        (self.normalized_method(), self.path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menu(parent: Option<&Menu>) -> Menu {
        let now = Utc::now();
        Menu {
            id: MenuId::new(),
            parent_id: parent.map(|p| p.id),
            parent_path: parent.map(|p| p.subtree_prefix()).unwrap_or_default(),
            code: "m".to_string(),
            name: "m".to_string(),
            description: String::new(),
            sequence: 0,
            menu_type: MenuType::Page,
            route: String::new(),
            properties: String::new(),
            status: MenuStatus::Enabled,
            resources: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_subtree_prefix_and_ancestors() {
        let a = menu(None);
        let b = menu(Some(&a));
        let c = menu(Some(&b));

        assert_eq!(b.parent_path, format!("{}.", a.id));
        assert_eq!(c.parent_path, format!("{}.{}.", a.id, b.id));
        assert_eq!(c.ancestor_ids(), vec![a.id, b.id]);
        assert!(c.in_subtree(&a.subtree_prefix()));
        assert!(!a.in_subtree(&a.subtree_prefix()));
    }

    #[test]
    fn test_status_round_trip() {
        assert_eq!("disabled".parse::<MenuStatus>().unwrap(), MenuStatus::Disabled);
        assert_eq!(MenuStatus::Enabled.as_str(), "enabled");
        assert!("archived".parse::<MenuStatus>().is_err());
    }

    #[test]
    fn test_resource_key_ignores_method_case() {
        assert_eq!(ResourceSpec::new("get", "/api/menus").key(), ResourceSpec::new("GET", "/api/menus").key());
    }
}
