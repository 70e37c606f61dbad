//! 用户相关命令定义

use serde::{Deserialize, Serialize};

use crate::application::check_text;
use crate::domain::role::RoleId;
use crate::domain::user::{User, UserStatus};

const MAX_USERNAME_LEN: usize = 64;
const MAX_EMAIL_LEN: usize = 128;
const MAX_FULL_NAME_LEN: usize = 128;
const MAX_PHONE_LEN: usize = 32;
const MAX_REMARK_LEN: usize = 1024;
const MIN_PASSWORD_LEN: usize = 6;
const MAX_PASSWORD_LEN: usize = 64;

fn check_optional(field: &str, value: &str, max: usize) -> Result<(), String> {
    if value.chars().count() > max {
        return Err(format!("{} cannot exceed {} characters", field, max));
    }
    Ok(())
}

pub(crate) fn validate_password(password: &str) -> Result<(), String> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(format!(
            "Password cannot exceed {} characters",
            MAX_PASSWORD_LEN
        ));
    }
    Ok(())
}

fn validate_profile(
    username: &str,
    email: &str,
    full_name: &str,
    phone: &str,
    remark: &str,
) -> Result<(), String> {
    check_text("Username", username, MAX_USERNAME_LEN)?;
    if username.chars().any(char::is_whitespace) {
        return Err("Username cannot contain whitespace".to_string());
    }
    check_optional("Email", email, MAX_EMAIL_LEN)?;
    if !email.is_empty() && !email.contains('@') {
        return Err("Invalid email".to_string());
    }
    check_optional("Full name", full_name, MAX_FULL_NAME_LEN)?;
    check_optional("Phone", phone, MAX_PHONE_LEN)?;
    check_optional("Remark", remark, MAX_REMARK_LEN)
}

/// 创建用户命令
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUserCommand {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub remark: String,
    pub password: String,
    pub status: Option<UserStatus>,
    #[serde(default)]
    pub role_ids: Vec<RoleId>,
}

impl CreateUserCommand {
    pub fn validate(&self) -> Result<(), String> {
        validate_profile(
            &self.username,
            &self.email,
            &self.full_name,
            &self.phone,
            &self.remark,
        )?;
        validate_password(&self.password)
    }

    pub fn to_user(&self, password_hash: String) -> User {
        let mut user = User::new(
            self.username.clone(),
            self.email.clone(),
            self.full_name.clone(),
            password_hash,
        );
        user.phone = self.phone.clone();
        user.remark = self.remark.clone();
        user.status = self.status.unwrap_or_default();
        user
    }
}

/// 修改用户命令（全量，角色绑定整体替换）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserCommand {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub remark: String,
    /// 为空表示不修改密码
    pub password: Option<String>,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default)]
    pub role_ids: Vec<RoleId>,
}

impl UpdateUserCommand {
    pub fn validate(&self) -> Result<(), String> {
        validate_profile(
            &self.username,
            &self.email,
            &self.full_name,
            &self.phone,
            &self.remark,
        )?;
        match &self.password {
            Some(password) => validate_password(password),
            None => Ok(()),
        }
    }

    /// 写入资料字段；密码由服务单独处理
    pub fn apply(&self, user: &mut User) {
        user.username = self.username.clone();
        user.email = self.email.clone();
        user.full_name = self.full_name.clone();
        user.phone = self.phone.clone();
        user.remark = self.remark.clone();
        user.status = self.status;
        user.updated_at = chrono::Utc::now();
    }
}

/// 用户详情（含角色）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    pub role_ids: Vec<RoleId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> CreateUserCommand {
        CreateUserCommand {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "secret-1".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate() {
        assert!(command().validate().is_ok());

        let short_password = CreateUserCommand {
            password: "123".to_string(),
            ..command()
        };
        assert_eq!(
            short_password.validate().unwrap_err(),
            "Password must be at least 6 characters"
        );

        let bad_email = CreateUserCommand {
            email: "alice".to_string(),
            ..command()
        };
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn test_update_without_password() {
        let cmd = UpdateUserCommand {
            username: "alice".to_string(),
            ..Default::default()
        };
        assert!(cmd.validate().is_ok());
    }
}
