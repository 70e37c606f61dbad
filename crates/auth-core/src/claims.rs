//! JWT Claims

use atrium_errors::{AppError, AppResult};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Subject, SubjectKind};

/// 超级管理员令牌中 `sub` 字段的取值
pub const ROOT_SUBJECT: &str = "root";

/// JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID, or "root")
    pub sub: String,
    /// Subject kind
    pub kind: SubjectKind,
    /// Expiration time
    pub exp: i64,
    /// Issued at
    pub iat: i64,
    /// JWT ID
    pub jti: String,
    /// Issuer
    #[serde(default)]
    pub iss: String,
    /// Audience
    #[serde(default)]
    pub aud: String,
}

impl Claims {
    pub fn new(subject: &Subject, expires_in_secs: i64, issuer: &str, audience: &str) -> Self {
        let now = Utc::now();
        let sub = match subject {
            Subject::Root => ROOT_SUBJECT.to_string(),
            Subject::User(id) => id.to_string(),
        };
        Self {
            sub,
            kind: subject.kind(),
            exp: (now + Duration::seconds(expires_in_secs)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::now_v7().to_string(),
            iss: issuer.to_string(),
            aud: audience.to_string(),
        }
    }

    /// 还原认证主体
    pub fn subject(&self) -> AppResult<Subject> {
        match self.kind {
            SubjectKind::Root => Ok(Subject::Root),
            SubjectKind::User => self
                .sub
                .parse()
                .map(Subject::User)
                .map_err(|_| AppError::unauthorized("Invalid user ID in token")),
        }
    }

    /// 剩余有效期（秒），已过期返回 0
    pub fn remaining_secs(&self) -> u64 {
        (self.exp - Utc::now().timestamp()).max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atrium_common::UserId;

    #[test]
    fn test_user_subject_round_trip() {
        let id = UserId::new();
        let claims = Claims::new(&Subject::User(id), 60, "iss", "aud");
        assert_eq!(claims.subject().unwrap(), Subject::User(id));
        assert!(claims.remaining_secs() > 0);
    }

    #[test]
    fn test_root_subject_uses_kind_not_sub() {
        let mut claims = Claims::new(&Subject::Root, 60, "iss", "aud");
        assert_eq!(claims.sub, ROOT_SUBJECT);
        claims.sub = UserId::new().to_string();
        assert_eq!(claims.subject().unwrap(), Subject::Root);
    }

    #[test]
    fn test_user_kind_with_reserved_sub_is_rejected() {
        let mut claims = Claims::new(&Subject::User(UserId::new()), 60, "iss", "aud");
        claims.sub = ROOT_SUBJECT.to_string();
        assert!(matches!(claims.subject(), Err(AppError::Unauthorized(_))));
    }
}
