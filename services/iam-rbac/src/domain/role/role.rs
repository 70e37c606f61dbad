//! 角色实体

use atrium_common::define_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

define_id!(
    /// 角色 ID
    RoleId
);

/// 角色状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoleStatus {
    #[default]
    Enabled,
    Disabled,
}

impl RoleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
        }
    }
}

impl std::str::FromStr for RoleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enabled" => Ok(Self::Enabled),
            "disabled" => Ok(Self::Disabled),
            other => Err(format!("Unknown role status: {}", other)),
        }
    }
}

/// 角色实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub code: String,
    pub name: String,
    pub description: String,
    pub sequence: i32,
    pub status: RoleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn new(code: String, name: String, description: String, sequence: i32) -> Self {
        let now = Utc::now();
        Self {
            id: RoleId::new(),
            code,
            name,
            description,
            sequence,
            status: RoleStatus::Enabled,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.status == RoleStatus::Enabled
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
