//! 集成测试公共装配：InMemoryStore + MemoryCache
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use atrium_auth_core::JwtTokenProvider;
use atrium_config::{RbacConfig, RootConfig};
use atrium_errors::{AppError, AppResult};
use atrium_ports::CachePort;
use secrecy::Secret;

use iam_rbac::RbacContext;
use iam_rbac::application::menu::{CreateMenuCommand, UpdateMenuCommand};
use iam_rbac::domain::menu::{Menu, MenuId, ResourceSpec};
use iam_rbac::domain::user::PasswordHasher;
use iam_rbac::infrastructure::cache::MemoryCache;
use iam_rbac::infrastructure::persistence::InMemoryStore;

pub const ROOT_USERNAME: &str = "admin";
pub const ROOT_PASSWORD: &str = "root-pass";

/// 可切换为全部失败的缓存
#[derive(Default)]
pub struct SwitchableCache {
    inner: MemoryCache,
    failing: AtomicBool,
}

impl SwitchableCache {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> AppResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::external_service("cache unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl CachePort for SwitchableCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<()> {
        self.check()?;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.check()?;
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.check()?;
        self.inner.exists(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<()> {
        self.check()?;
        self.inner.expire(key, ttl).await
    }
}

/// 明文"哈希"，避免测试里跑 Argon2
pub struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, plain: &str) -> AppResult<String> {
        Ok(format!("plain${}", plain))
    }

    fn verify(&self, plain: &str, hash: &str) -> AppResult<bool> {
        Ok(hash == format!("plain${}", plain))
    }
}

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub cache: Arc<SwitchableCache>,
    pub ctx: RbacContext,
}

pub fn rbac_config(deny_delete_menu: bool) -> RbacConfig {
    RbacConfig {
        deny_delete_menu,
        user_cache_exp_hours: 4,
        menu_file: None,
        root: RootConfig {
            username: ROOT_USERNAME.to_string(),
            password: Secret::new(ROOT_PASSWORD.to_string()),
            name: "Admin".to_string(),
        },
    }
}

pub fn harness() -> Harness {
    harness_with(false)
}

pub fn harness_with(deny_delete_menu: bool) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let cache = Arc::new(SwitchableCache::default());
    let tokens = Arc::new(JwtTokenProvider::new(
        "integration-secret",
        3600,
        "atrium".to_string(),
        "atrium-api".to_string(),
        cache.clone(),
    ));

    let ctx = RbacContext::new(
        store.clone(),
        cache.clone(),
        tokens,
        Arc::new(PlainHasher),
        &rbac_config(deny_delete_menu),
    );

    Harness { store, cache, ctx }
}

pub fn menu_cmd(code: &str, parent_id: Option<MenuId>) -> CreateMenuCommand {
    CreateMenuCommand {
        parent_id,
        code: code.to_string(),
        name: code.to_uppercase(),
        resources: vec![ResourceSpec::new("GET", format!("/api/{}", code))],
        ..Default::default()
    }
}

impl Harness {
    pub async fn create_menu(&self, code: &str, parent: Option<&Menu>) -> Menu {
        self.ctx
            .menus
            .create(menu_cmd(code, parent.map(|p| p.id)))
            .await
            .unwrap()
    }

    pub async fn reload(&self, menu: &Menu) -> AppResult<Menu> {
        self.ctx.menus.get(&menu.id).await
    }

    /// 只修改上级
    pub async fn move_menu(&self, menu: &Menu, parent: Option<&Menu>) -> AppResult<Menu> {
        let current = self.reload(menu).await?;
        let cmd = UpdateMenuCommand {
            parent_id: parent.map(|p| p.id),
            ..UpdateMenuCommand::from_menu(&current)
        };
        self.ctx.menus.update(&menu.id, cmd).await
    }

    pub async fn set_status(
        &self,
        menu: &Menu,
        status: iam_rbac::domain::menu::MenuStatus,
    ) -> AppResult<Menu> {
        let current = self.reload(menu).await?;
        let cmd = UpdateMenuCommand {
            status,
            ..UpdateMenuCommand::from_menu(&current)
        };
        self.ctx.menus.update(&menu.id, cmd).await
    }
}
