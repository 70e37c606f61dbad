//! 权限实体

use atrium_common::define_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

define_id!(
    /// 权限 ID
    PermissionId
);

/// 权限：一条 HTTP 方法 + 路径规则
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub name: String,
    /// 全局唯一标识，如 `menu:read`
    pub slug: String,
    pub description: String,
    pub http_method: String,
    pub http_path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    pub fn new(
        name: String,
        slug: String,
        description: String,
        http_method: String,
        http_path: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: PermissionId::new(),
            name,
            slug,
            description,
            http_method: http_method.trim().to_ascii_uppercase(),
            http_path,
            created_at: now,
            updated_at: now,
        }
    }

    /// 是否匹配请求；`*` 匹配任意方法，路径以 `*` 结尾时按前缀匹配
    pub fn matches(&self, method: &str, path: &str) -> bool {
        let method_ok = self.http_method == "*" || self.http_method.eq_ignore_ascii_case(method);
        let path_ok = match self.http_path.strip_suffix('*') {
            Some(prefix) => path.starts_with(prefix),
            None => self.http_path == path,
        };
        method_ok && path_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permission(method: &str, path: &str) -> Permission {
        Permission::new(
            "p".to_string(),
            "p".to_string(),
            String::new(),
            method.to_string(),
            path.to_string(),
        )
    }

    #[test]
    fn test_matches() {
        let exact = permission("get", "/api/menus");
        assert_eq!(exact.http_method, "GET");
        assert!(exact.matches("GET", "/api/menus"));
        assert!(!exact.matches("POST", "/api/menus"));
        assert!(!exact.matches("GET", "/api/menus/1"));

        let wildcard = permission("*", "/api/menus/*");
        assert!(wildcard.matches("DELETE", "/api/menus/1"));
        assert!(!wildcard.matches("DELETE", "/api/roles/1"));
    }
}
