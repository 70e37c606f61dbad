//! 认证上下文

use atrium_auth_core::Subject;
use serde::{Deserialize, Serialize};

use super::role::RoleId;

/// 已认证请求的上下文
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub subject: Subject,
    /// 用户持有的角色；root 为空
    pub role_ids: Vec<RoleId>,
}

impl AuthContext {
    pub fn root() -> Self {
        Self {
            subject: Subject::Root,
            role_ids: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.subject.is_root()
    }
}
