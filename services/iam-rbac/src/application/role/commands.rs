//! 角色相关命令定义

use serde::{Deserialize, Serialize};

use crate::application::check_text;
use crate::domain::menu::MenuId;
use crate::domain::permission::PermissionId;
use crate::domain::role::{Role, RoleStatus};

const MAX_CODE_LEN: usize = 100;
const MAX_NAME_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 1000;

fn validate_common(code: &str, name: &str, description: &str) -> Result<(), String> {
    check_text("Role code", code, MAX_CODE_LEN)?;
    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == ':')
    {
        return Err(
            "Role code can only contain alphanumeric, underscore, hyphen and colon".to_string(),
        );
    }
    check_text("Role name", name, MAX_NAME_LEN)?;
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(format!(
            "Role description cannot exceed {} characters",
            MAX_DESCRIPTION_LEN
        ));
    }
    Ok(())
}

/// 创建角色命令
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateRoleCommand {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sequence: i32,
    pub status: Option<RoleStatus>,
    #[serde(default)]
    pub menu_ids: Vec<MenuId>,
    #[serde(default)]
    pub permission_ids: Vec<PermissionId>,
}

impl CreateRoleCommand {
    pub fn validate(&self) -> Result<(), String> {
        validate_common(&self.code, &self.name, &self.description)
    }

    /// 转换为角色实体，关联由服务单独写入
    pub fn to_role(&self) -> Role {
        let mut role = Role::new(
            self.code.clone(),
            self.name.clone(),
            self.description.clone(),
            self.sequence,
        );
        if let Some(status) = self.status {
            role.status = status;
        }
        role
    }
}

/// 修改角色命令（全量，关联整体替换）
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRoleCommand {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sequence: i32,
    pub status: RoleStatus,
    #[serde(default)]
    pub menu_ids: Vec<MenuId>,
    #[serde(default)]
    pub permission_ids: Vec<PermissionId>,
}

impl UpdateRoleCommand {
    pub fn validate(&self) -> Result<(), String> {
        validate_common(&self.code, &self.name, &self.description)
    }

    pub fn apply(&self, role: &mut Role) {
        role.code = self.code.clone();
        role.name = self.name.clone();
        role.description = self.description.clone();
        role.sequence = self.sequence;
        role.status = self.status;
        role.touch();
    }
}

/// 角色详情（含菜单与权限绑定）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleDetail {
    #[serde(flatten)]
    pub role: Role,
    pub menu_ids: Vec<MenuId>,
    pub permission_ids: Vec<PermissionId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> CreateRoleCommand {
        CreateRoleCommand {
            code: "admin".to_string(),
            name: "Administrator".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate() {
        assert!(command().validate().is_ok());

        let bad_code = CreateRoleCommand {
            code: "admin role".to_string(),
            ..command()
        };
        assert!(bad_code.validate().is_err());

        let long_name = CreateRoleCommand {
            name: "x".repeat(201),
            ..command()
        };
        assert_eq!(
            long_name.validate().unwrap_err(),
            "Role name cannot exceed 200 characters"
        );
    }

    #[test]
    fn test_to_role_honours_status() {
        let role = CreateRoleCommand {
            status: Some(RoleStatus::Disabled),
            ..command()
        }
        .to_role();
        assert!(!role.is_enabled());
        assert_eq!(role.code, "admin");
    }
}
