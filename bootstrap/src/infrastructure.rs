//! 基础设施资源

use atrium_adapter_postgres::PoolSettings;
use atrium_adapter_redis::RedisCache;
use atrium_config::{AppConfig, CacheBackend};
use atrium_errors::AppResult;
use redis::aio::ConnectionManager;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use tracing::info;

use crate::retry::{Backoff, connect_with_backoff};

/// 服务启动时建立的外部连接
pub struct Infrastructure {
    config: AppConfig,
    postgres_pool: PgPool,
    /// 缓存后端为内存时不连接 Redis
    redis_conn: Option<ConnectionManager>,
}

impl Infrastructure {
    pub async fn from_config(config: AppConfig) -> AppResult<Self> {
        Self::connect(config, Backoff::default()).await
    }

    /// 按退避计划连接 PostgreSQL，以及按需连接 Redis
    pub async fn connect(config: AppConfig, backoff: Backoff) -> AppResult<Self> {
        let settings = PoolSettings::new(config.database.url.expose_secret(), &config.name)
            .with_max_connections(config.database.max_connections);
        let postgres_pool = connect_with_backoff(&backoff, "postgres", || {
            atrium_adapter_postgres::connect(&settings)
        })
        .await?;
        info!(
            max_connections = settings.max_connections,
            "PostgreSQL connection pool ready"
        );

        let redis_conn = match config.cache.backend {
            CacheBackend::Redis => {
                let url = config.redis.url.expose_secret();
                let conn = connect_with_backoff(&backoff, "redis", || {
                    atrium_adapter_redis::connect(url)
                })
                .await?;
                info!("Redis connection ready");
                Some(conn)
            }
            CacheBackend::Memory => {
                info!("Using in-process cache, Redis not required");
                None
            }
        };

        Ok(Self {
            config,
            postgres_pool,
            redis_conn,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn postgres_pool(&self) -> PgPool {
        self.postgres_pool.clone()
    }

    /// Redis 缓存，键统一加上服务名前缀
    pub fn redis_cache(&self) -> Option<RedisCache> {
        self.redis_conn
            .clone()
            .map(|conn| RedisCache::new(conn).with_prefix(self.config.name.clone()))
    }
}
