//! 令牌提供者

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use atrium_errors::{AppError, AppResult};
use atrium_ports::{CachePort, namespaced_key};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Claims, Subject};

/// 已吊销令牌的缓存命名空间
pub const REVOKED_TOKEN_NAMESPACE: &str = "token:revoked";

/// 登录令牌
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginToken {
    pub access_token: String,
    pub token_type: String,
    /// 过期时间（Unix 秒）
    pub expires_at: i64,
}

/// 令牌提供者
///
/// 错误原样返回给调用方，重试策略由实现方决定。
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// 为主体签发令牌
    async fn issue(&self, subject: &Subject) -> AppResult<LoginToken>;

    /// 校验令牌并返回主体
    async fn verify_subject(&self, token: &str) -> AppResult<Subject>;

    /// 吊销令牌
    async fn revoke(&self, token: &str) -> AppResult<()>;
}

/// 基于 JWT (HS256) 的令牌提供者，吊销列表保存在缓存中
pub struct JwtTokenProvider {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expires_in: i64,
    issuer: String,
    audience: String,
    revocations: Arc<dyn CachePort>,
}

impl JwtTokenProvider {
    pub fn new(
        secret: &str,
        expires_in: i64,
        issuer: String,
        audience: String,
        revocations: Arc<dyn CachePort>,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expires_in,
            issuer,
            audience,
            revocations,
        }
    }

    /// 解码并校验签名、签发者、受众和有效期
    pub fn decode_claims(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| AppError::unauthorized(format!("Invalid token: {}", e)))?
            .claims;

        if claims.jti.is_empty() {
            return Err(AppError::unauthorized("Token ID (jti) missing"));
        }

        Ok(claims)
    }

    fn revoked_key(jti: &str) -> String {
        namespaced_key(REVOKED_TOKEN_NAMESPACE, jti)
    }
}

#[async_trait]
impl TokenProvider for JwtTokenProvider {
    async fn issue(&self, subject: &Subject) -> AppResult<LoginToken> {
        let claims = Claims::new(subject, self.expires_in, &self.issuer, &self.audience);

        let access_token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to generate token: {}", e)))?;

        Ok(LoginToken {
            access_token,
            token_type: "Bearer".to_string(),
            expires_at: claims.exp,
        })
    }

    async fn verify_subject(&self, token: &str) -> AppResult<Subject> {
        let claims = self.decode_claims(token)?;

        if self.revocations.exists(&Self::revoked_key(&claims.jti)).await? {
            return Err(AppError::unauthorized("Token has been revoked"));
        }

        claims.subject()
    }

    async fn revoke(&self, token: &str) -> AppResult<()> {
        let claims = self.decode_claims(token)?;
        let ttl = Duration::from_secs(claims.remaining_secs().max(1));

        self.revocations
            .set(&Self::revoked_key(&claims.jti), "1", Some(ttl))
            .await?;

        debug!(jti = %claims.jti, ttl_secs = ttl.as_secs(), "Token revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atrium_common::UserId;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockCache {
        data: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl CachePort for MockCache {
        async fn get(&self, key: &str) -> AppResult<Option<String>> {
            Ok(self.data.lock().unwrap().get(key).cloned())
        }

        async fn set(&self, key: &str, value: &str, _ttl: Option<Duration>) -> AppResult<()> {
            self.data
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn delete(&self, key: &str) -> AppResult<()> {
            self.data.lock().unwrap().remove(key);
            Ok(())
        }

        async fn exists(&self, key: &str) -> AppResult<bool> {
            Ok(self.data.lock().unwrap().contains_key(key))
        }

        async fn expire(&self, _key: &str, _ttl: Duration) -> AppResult<()> {
            Ok(())
        }
    }

    fn provider(expires_in: i64) -> JwtTokenProvider {
        JwtTokenProvider::new(
            "test-secret",
            expires_in,
            "atrium".to_string(),
            "atrium-api".to_string(),
            Arc::new(MockCache::default()),
        )
    }

    #[tokio::test]
    async fn test_issue_and_verify_user() {
        let provider = provider(3600);
        let subject = Subject::User(UserId::new());

        let token = provider.issue(&subject).await.unwrap();
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(provider.verify_subject(&token.access_token).await.unwrap(), subject);
    }

    #[tokio::test]
    async fn test_issue_and_verify_root() {
        let provider = provider(3600);
        let token = provider.issue(&Subject::Root).await.unwrap();
        assert_eq!(
            provider.verify_subject(&token.access_token).await.unwrap(),
            Subject::Root
        );
    }

    #[tokio::test]
    async fn test_revoked_token_is_rejected() {
        let provider = provider(3600);
        let token = provider.issue(&Subject::User(UserId::new())).await.unwrap();

        provider.revoke(&token.access_token).await.unwrap();

        let result = provider.verify_subject(&token.access_token).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let provider = provider(-10);
        let token = provider.issue(&Subject::Root).await.unwrap();

        let result = provider.verify_subject(&token.access_token).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_foreign_signature_is_rejected() {
        let token = provider(3600).issue(&Subject::Root).await.unwrap();
        let other = JwtTokenProvider::new(
            "another-secret",
            3600,
            "atrium".to_string(),
            "atrium-api".to_string(),
            Arc::new(MockCache::default()),
        );

        let result = other.verify_subject(&token.access_token).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_garbage_token_is_rejected() {
        let result = provider(3600).verify_subject("not-a-jwt").await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }
}
