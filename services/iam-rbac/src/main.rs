//! IAM RBAC Service - 服务入口

use std::sync::Arc;

use atrium_adapter_postgres::run_migrations;
use atrium_auth_core::JwtTokenProvider;
use atrium_bootstrap::{Infrastructure, init_runtime, shutdown_signal};
use atrium_config::AppConfig;
use atrium_ports::CachePort;
use atrium_telemetry::init_metrics;
use secrecy::ExposeSecret;
use tracing::{info, warn};

use iam_rbac::RbacContext;
use iam_rbac::infrastructure::cache::MemoryCache;
use iam_rbac::infrastructure::persistence::PostgresStore;
use iam_rbac::infrastructure::persistence::postgres::MIGRATOR;
use iam_rbac::infrastructure::security::Argon2PasswordHasher;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config_dir = std::env::var("APP_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    let config = AppConfig::load(&config_dir)?;
    init_runtime(&config);
    let _metrics = init_metrics()?;

    info!("Initializing IAM RBAC Service...");
    let infra = Infrastructure::from_config(config).await?;
    let config = infra.config().clone();
    let pool = infra.postgres_pool();

    run_migrations(&pool, &MIGRATOR).await?;

    let cache: Arc<dyn CachePort> = match infra.redis_cache() {
        Some(redis) => Arc::new(redis),
        None => Arc::new(MemoryCache::new(config.cache.memory_max_capacity)),
    };

    let tokens = Arc::new(JwtTokenProvider::new(
        config.jwt.secret.expose_secret(),
        i64::try_from(config.jwt.expires_in).unwrap_or(i64::MAX),
        config.jwt.issuer.clone(),
        config.jwt.audience.clone(),
        cache.clone(),
    ));

    let context = RbacContext::new(
        Arc::new(PostgresStore::new(pool)),
        cache,
        tokens,
        Arc::new(Argon2PasswordHasher::new()),
        &config.rbac,
    );

    if let Some(menu_file) = &config.rbac.menu_file {
        match context.menus.init_from_file(menu_file).await {
            Ok(summary) => info!(
                file = %menu_file,
                created = summary.created,
                skipped = summary.skipped,
                "Menu seed file applied"
            ),
            Err(e) => {
                warn!(file = %menu_file, error = %e, "Failed to apply menu seed file");
                return Err(e.into());
            }
        }
    }

    info!("IAM RBAC Service ready");
    shutdown_signal().await;
    info!("IAM RBAC Service stopped");
    Ok(())
}
