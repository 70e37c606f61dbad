//! 认证主体

use atrium_common::UserId;
use serde::{Deserialize, Serialize};

/// 已认证的主体
///
/// 超级管理员来自配置而非用户表，单独作为一个变体，
/// 不依赖任何保留 ID 的字符串比较。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Subject {
    Root,
    User(UserId),
}

impl Subject {
    pub fn is_root(&self) -> bool {
        matches!(self, Self::Root)
    }

    /// 普通用户的 ID，超级管理员返回 None
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Root => None,
            Self::User(id) => Some(*id),
        }
    }

    pub fn kind(&self) -> SubjectKind {
        match self {
            Self::Root => SubjectKind::Root,
            Self::User(_) => SubjectKind::User,
        }
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Root => write!(f, "root"),
            Self::User(id) => write!(f, "user:{}", id),
        }
    }
}

/// 主体类型标记，写入令牌
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Root,
    User,
}
