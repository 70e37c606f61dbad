//! 权限相关命令定义

use serde::Deserialize;

use crate::application::check_text;
use crate::domain::permission::Permission;

const MAX_NAME_LEN: usize = 128;
const MAX_SLUG_LEN: usize = 128;
const MAX_PATH_LEN: usize = 512;

const HTTP_METHODS: &[&str] = &["*", "GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

fn validate_common(name: &str, slug: &str, http_method: &str, http_path: &str) -> Result<(), String> {
    check_text("Permission name", name, MAX_NAME_LEN)?;
    check_text("Permission slug", slug, MAX_SLUG_LEN)?;
    if slug.chars().any(char::is_whitespace) {
        return Err("Permission slug cannot contain whitespace".to_string());
    }
    let method = http_method.trim().to_ascii_uppercase();
    if !HTTP_METHODS.contains(&method.as_str()) {
        return Err(format!("Unsupported HTTP method: {}", http_method));
    }
    check_text("HTTP path", http_path, MAX_PATH_LEN)?;
    if !http_path.starts_with('/') {
        return Err(format!("HTTP path must start with '/': {}", http_path));
    }
    Ok(())
}

/// 创建权限命令
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePermissionCommand {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub http_method: String,
    pub http_path: String,
}

impl CreatePermissionCommand {
    pub fn validate(&self) -> Result<(), String> {
        validate_common(&self.name, &self.slug, &self.http_method, &self.http_path)
    }

    pub fn into_permission(self) -> Permission {
        Permission::new(
            self.name,
            self.slug,
            self.description,
            self.http_method,
            self.http_path,
        )
    }
}

/// 修改权限命令（全量）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePermissionCommand {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub http_method: String,
    pub http_path: String,
}

impl UpdatePermissionCommand {
    pub fn validate(&self) -> Result<(), String> {
        validate_common(&self.name, &self.slug, &self.http_method, &self.http_path)
    }

    pub fn apply(self, permission: &mut Permission) {
        permission.name = self.name;
        permission.slug = self.slug;
        permission.description = self.description;
        permission.http_method = self.http_method.trim().to_ascii_uppercase();
        permission.http_path = self.http_path;
        permission.updated_at = chrono::Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> CreatePermissionCommand {
        CreatePermissionCommand {
            name: "Read menus".to_string(),
            slug: "menu:read".to_string(),
            http_method: "get".to_string(),
            http_path: "/api/menus/*".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate() {
        assert!(command().validate().is_ok());

        let bad_method = CreatePermissionCommand {
            http_method: "FETCH".to_string(),
            ..command()
        };
        assert!(bad_method.validate().is_err());

        let bad_slug = CreatePermissionCommand {
            slug: "menu read".to_string(),
            ..command()
        };
        assert!(bad_slug.validate().is_err());
    }

    #[test]
    fn test_into_permission_normalizes_method() {
        let permission = command().into_permission();
        assert_eq!(permission.http_method, "GET");
        assert!(permission.matches("GET", "/api/menus/1"));
    }
}
