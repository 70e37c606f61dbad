//! 服务装配
//!
//! 把存储、缓存、令牌提供者和密码哈希组装成各个应用服务。

use std::sync::Arc;

use atrium_auth_core::TokenProvider;
use atrium_config::RbacConfig;
use atrium_ports::CachePort;

use crate::application::auth::AuthService;
use crate::application::menu::MenuService;
use crate::application::permission::PermissionService;
use crate::application::role::RoleService;
use crate::application::user::UserService;
use crate::domain::menu::MenuTree;
use crate::domain::unit_of_work::RbacStore;
use crate::domain::user::PasswordHasher;
use crate::infrastructure::cache::{AuthorizationSync, SessionCache};

/// 已装配的 RBAC 服务集合
#[derive(Clone)]
pub struct RbacContext {
    pub menus: Arc<MenuService>,
    pub roles: Arc<RoleService>,
    pub permissions: Arc<PermissionService>,
    pub users: Arc<UserService>,
    pub auth: Arc<AuthService>,
    pub sessions: Arc<SessionCache>,
    pub sync: AuthorizationSync,
}

impl RbacContext {
    pub fn new(
        store: Arc<dyn RbacStore>,
        cache: Arc<dyn CachePort>,
        tokens: Arc<dyn TokenProvider>,
        hasher: Arc<dyn PasswordHasher>,
        config: &RbacConfig,
    ) -> Self {
        let sync = AuthorizationSync::new(cache.clone());
        let sessions = Arc::new(SessionCache::new(
            cache,
            store.clone(),
            config.user_cache_ttl(),
        ));

        let menus = Arc::new(MenuService::new(
            store.clone(),
            MenuTree::new(config.deny_delete_menu),
            sync.clone(),
        ));
        let roles = Arc::new(RoleService::new(store.clone(), sync.clone(), sessions.clone()));
        let permissions = Arc::new(PermissionService::new(store.clone(), sync.clone()));
        let users = Arc::new(UserService::new(
            store.clone(),
            sessions.clone(),
            hasher.clone(),
            config.root.username.clone(),
        ));
        let auth = Arc::new(AuthService::new(
            store,
            tokens,
            sessions.clone(),
            hasher,
            menus.clone(),
            config.root.clone(),
        ));

        Self {
            menus,
            roles,
            permissions,
            users,
            auth,
            sessions,
            sync,
        }
    }
}
