//! 认证应用服务
//!
//! 登录、令牌校验、登出与当前用户信息。所有认证失败都返回统一的 Unauthorized，
//! 不区分用户不存在、密码错误或账号停用。

use std::sync::Arc;

use atrium_auth_core::{LoginToken, Subject, TokenProvider};
use atrium_config::RootConfig;
use atrium_errors::{AppError, AppResult};
use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::application::menu::MenuService;
use crate::domain::menu::MenuNode;
use crate::domain::role::RoleId;
use crate::domain::session::AuthContext;
use crate::domain::unit_of_work::RbacStore;
use crate::domain::user::{PasswordHasher, UserStatus};
use crate::infrastructure::cache::SessionCache;

/// 当前登录用户信息
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentUser {
    pub subject: Subject,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub status: UserStatus,
    pub role_ids: Vec<RoleId>,
}

/// 令牌错误中的 Unauthorized 统一为同一条消息，其它错误原样返回
fn uniform(error: AppError) -> AppError {
    match error {
        AppError::Unauthorized(reason) => {
            debug!(reason = %reason, "Token rejected");
            AppError::unauthorized_uniform()
        }
        other => other,
    }
}

/// 逐字节比较且不提前返回，耗时只取决于长度
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |diff, (x, y)| diff | (x ^ y)) == 0
}

pub struct AuthService {
    store: Arc<dyn RbacStore>,
    tokens: Arc<dyn TokenProvider>,
    sessions: Arc<SessionCache>,
    hasher: Arc<dyn PasswordHasher>,
    menus: Arc<MenuService>,
    root: RootConfig,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn RbacStore>,
        tokens: Arc<dyn TokenProvider>,
        sessions: Arc<SessionCache>,
        hasher: Arc<dyn PasswordHasher>,
        menus: Arc<MenuService>,
        root: RootConfig,
    ) -> Self {
        Self {
            store,
            tokens,
            sessions,
            hasher,
            menus,
            root,
        }
    }

    /// 用户名密码登录
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> AppResult<LoginToken> {
        let subject = self.check_credentials(username, password).await?;

        if let Subject::User(user_id) = subject {
            // 重新登录时以存储为准
            self.sessions.invalidate(&user_id).await;
            self.sessions.resolve(&subject).await?;
        }

        let token = self.tokens.issue(&subject).await?;
        info!(subject = %subject, "Login succeeded");
        Ok(token)
    }

    /// 校验令牌并解析授权上下文
    pub async fn authenticate(&self, token: &str) -> AppResult<AuthContext> {
        let subject = self.tokens.verify_subject(token).await.map_err(uniform)?;
        self.sessions.resolve(&subject).await
    }

    /// 登出：吊销令牌并清除会话缓存
    #[instrument(skip(self, token))]
    pub async fn logout(&self, token: &str) -> AppResult<()> {
        let subject = self.tokens.verify_subject(token).await.map_err(uniform)?;

        if let Err(e) = self.tokens.revoke(token).await {
            warn!(subject = %subject, error = %e, "Failed to revoke token on logout");
        }
        if let Some(user_id) = subject.user_id() {
            self.sessions.invalidate(&user_id).await;
        }

        info!(subject = %subject, "Logged out");
        Ok(())
    }

    /// 为已认证主体签发新令牌；普通用户需仍处于激活状态
    pub async fn refresh_token(&self, subject: &Subject) -> AppResult<LoginToken> {
        if let Subject::User(user_id) = subject {
            let active = self
                .store
                .users()
                .find_by_id(user_id)
                .await?
                .is_some_and(|user| user.is_active());
            if !active {
                return Err(AppError::unauthorized_uniform());
            }
        }
        self.tokens.issue(subject).await
    }

    /// 当前用户信息，超级管理员由配置合成
    pub async fn current_user(&self, subject: &Subject) -> AppResult<CurrentUser> {
        let user_id = match subject {
            Subject::Root => {
                return Ok(CurrentUser {
                    subject: Subject::Root,
                    username: self.root.username.clone(),
                    full_name: self.root.name.clone(),
                    email: String::new(),
                    status: UserStatus::Active,
                    role_ids: Vec::new(),
                });
            }
            Subject::User(id) => id,
        };

        let user = self
            .store
            .users()
            .find_by_id(user_id)
            .await?
            .ok_or_else(AppError::unauthorized_uniform)?;
        let ctx = self.sessions.resolve(subject).await?;

        Ok(CurrentUser {
            subject: *subject,
            username: user.username,
            full_name: user.full_name,
            email: user.email,
            status: user.status,
            role_ids: ctx.role_ids,
        })
    }

    /// 当前主体可见的菜单树
    pub async fn current_menus(&self, subject: &Subject) -> AppResult<Vec<MenuNode>> {
        let ctx = self.sessions.resolve(subject).await?;
        self.menus.query_visible_for_user(&ctx).await
    }

    async fn check_credentials(&self, username: &str, password: &str) -> AppResult<Subject> {
        if username == self.root.username {
            if constant_time_eq(password.as_bytes(), self.root.password.expose_secret().as_bytes()) {
                return Ok(Subject::Root);
            }
            debug!("Root login rejected");
            return Err(AppError::unauthorized_uniform());
        }

        let user = match self.store.users().find_by_username(username).await? {
            Some(user) if user.is_active() => user,
            _ => {
                debug!(username, "Login rejected: user missing or inactive");
                return Err(AppError::unauthorized_uniform());
            }
        };

        match self.hasher.verify(password, &user.password_hash) {
            Ok(true) => Ok(Subject::User(user.id)),
            Ok(false) => {
                debug!(user_id = %user.id, "Login rejected: wrong password");
                Err(AppError::unauthorized_uniform())
            }
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "Stored password hash is unusable");
                Err(AppError::unauthorized_uniform())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use atrium_errors::UNAUTHORIZED_MESSAGE;
    use mockall::mock;
    use secrecy::Secret;

    use crate::domain::menu::MenuTree;
    use crate::domain::unit_of_work::Repositories;
    use crate::domain::user::{MockPasswordHasher, User};
    use crate::infrastructure::cache::{AuthorizationSync, MemoryCache};
    use crate::infrastructure::persistence::InMemoryStore;

    mock! {
        Tokens {}

        #[async_trait]
        impl TokenProvider for Tokens {
            async fn issue(&self, subject: &Subject) -> AppResult<LoginToken>;
            async fn verify_subject(&self, token: &str) -> AppResult<Subject>;
            async fn revoke(&self, token: &str) -> AppResult<()>;
        }
    }

    fn login_token() -> LoginToken {
        LoginToken {
            access_token: "token".to_string(),
            token_type: "Bearer".to_string(),
            expires_at: 0,
        }
    }

    fn root_config() -> RootConfig {
        RootConfig {
            username: "admin".to_string(),
            password: Secret::new("root-pass".to_string()),
            name: "Admin".to_string(),
        }
    }

    struct Fixture {
        store: Arc<InMemoryStore>,
        service: AuthService,
    }

    fn fixture(tokens: MockTokens, hasher: MockPasswordHasher) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let cache = Arc::new(MemoryCache::default());
        let sync = AuthorizationSync::new(cache.clone());
        let sessions = Arc::new(SessionCache::new(
            cache,
            store.clone(),
            std::time::Duration::from_secs(60),
        ));
        let menus = Arc::new(MenuService::new(store.clone(), MenuTree::new(false), sync));

        let service = AuthService::new(
            store.clone(),
            Arc::new(tokens),
            sessions,
            Arc::new(hasher),
            menus,
            root_config(),
        );
        Fixture { store, service }
    }

    async fn insert_user(store: &InMemoryStore, status: UserStatus) -> User {
        let mut user = User::new(
            "alice".to_string(),
            "alice@example.com".to_string(),
            "Alice".to_string(),
            "hash".to_string(),
        );
        user.status = status;
        store.users().insert(&user).await.unwrap();
        user
    }

    #[tokio::test]
    async fn test_root_login_uses_configured_credentials() {
        let mut tokens = MockTokens::new();
        tokens
            .expect_issue()
            .withf(|subject| *subject == Subject::Root)
            .times(1)
            .returning(|_| Ok(login_token()));
        let hasher = MockPasswordHasher::new();

        let fx = fixture(tokens, hasher);
        let token = fx.service.login("admin", "root-pass").await.unwrap();
        assert_eq!(token.token_type, "Bearer");

        // root 不走存储
        assert_eq!(fx.store.call_count(), 0);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"root-pass", b"root-pass"));
        assert!(!constant_time_eq(b"root-pass", b"root-pasS"));
        assert!(!constant_time_eq(b"root-pass", b"root-pass2"));
        assert!(constant_time_eq(b"", b""));
    }

    #[tokio::test]
    async fn test_root_wrong_password_is_uniform() {
        let tokens = MockTokens::new();
        let fx = fixture(tokens, MockPasswordHasher::new());

        let err = fx.service.login("admin", "root-pasS").await.unwrap_err();
        assert_eq!(err.to_string(), AppError::unauthorized_uniform().to_string());
        assert_eq!(fx.store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_wrong_password_is_uniform() {
        let mut tokens = MockTokens::new();
        tokens.expect_issue().never();
        let mut hasher = MockPasswordHasher::new();
        hasher.expect_verify().returning(|_, _| Ok(false));

        let fx = fixture(tokens, hasher);
        insert_user(&fx.store, UserStatus::Active).await;

        let wrong_user = fx.service.login("alice", "nope").await.unwrap_err();
        let wrong_root = fx.service.login("admin", "nope").await.unwrap_err();
        let missing = fx.service.login("bob", "nope").await.unwrap_err();

        for err in [wrong_user, wrong_root, missing] {
            assert_eq!(err.to_string(), format!("Unauthorized: {}", UNAUTHORIZED_MESSAGE));
        }
    }

    #[tokio::test]
    async fn test_inactive_user_cannot_login() {
        let mut tokens = MockTokens::new();
        tokens.expect_issue().never();
        let mut hasher = MockPasswordHasher::new();
        hasher.expect_verify().never();

        let fx = fixture(tokens, hasher);
        insert_user(&fx.store, UserStatus::Inactive).await;

        let result = fx.service.login("alice", "secret").await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_login_and_authenticate_user() {
        let mut tokens = MockTokens::new();
        tokens.expect_issue().times(1).returning(|_| Ok(login_token()));
        let mut hasher = MockPasswordHasher::new();
        hasher
            .expect_verify()
            .withf(|plain, hash| plain == "secret" && hash == "hash")
            .returning(|_, _| Ok(true));

        let fx = fixture(tokens, hasher);
        let user = insert_user(&fx.store, UserStatus::Active).await;
        let subject = Subject::User(user.id);

        let mut tokens = MockTokens::new();
        tokens
            .expect_verify_subject()
            .returning(move |_| Ok(subject));

        fx.service.login("alice", "secret").await.unwrap();

        let service = AuthService { tokens: Arc::new(tokens), ..fx.service };
        let ctx = service.authenticate("token").await.unwrap();
        assert_eq!(ctx.subject, subject);
        assert!(ctx.role_ids.is_empty());
    }

    #[tokio::test]
    async fn test_token_rejection_is_uniform() {
        let mut tokens = MockTokens::new();
        tokens
            .expect_verify_subject()
            .returning(|_| Err(AppError::unauthorized("Token has been revoked")));

        let fx = fixture(tokens, MockPasswordHasher::new());
        let err = fx.service.authenticate("token").await.unwrap_err();
        assert_eq!(err.to_string(), format!("Unauthorized: {}", UNAUTHORIZED_MESSAGE));
    }

    #[tokio::test]
    async fn test_provider_failure_is_propagated() {
        let mut tokens = MockTokens::new();
        tokens
            .expect_verify_subject()
            .returning(|_| Err(AppError::external_service("cache down")));

        let fx = fixture(tokens, MockPasswordHasher::new());
        let result = fx.service.authenticate("token").await;
        assert!(matches!(result, Err(AppError::ExternalService(_))));
    }

    #[tokio::test]
    async fn test_logout_survives_revoke_failure() {
        let mut tokens = MockTokens::new();
        tokens
            .expect_verify_subject()
            .returning(|_| Ok(Subject::Root));
        tokens
            .expect_revoke()
            .times(1)
            .returning(|_| Err(AppError::external_service("redis unavailable")));

        let fx = fixture(tokens, MockPasswordHasher::new());
        assert!(fx.service.logout("token").await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_rejects_inactive_user() {
        let mut tokens = MockTokens::new();
        tokens.expect_issue().never();

        let fx = fixture(tokens, MockPasswordHasher::new());
        let user = insert_user(&fx.store, UserStatus::Inactive).await;

        let result = fx.service.refresh_token(&Subject::User(user.id)).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_current_user_for_root() {
        let fx = fixture(MockTokens::new(), MockPasswordHasher::new());
        let current = fx.service.current_user(&Subject::Root).await.unwrap();
        assert_eq!(current.username, "admin");
        assert_eq!(current.full_name, "Admin");
        assert!(current.role_ids.is_empty());
    }
}
