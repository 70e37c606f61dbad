//! PostgreSQL 连接池

use std::str::FromStr;
use std::time::Duration;

use atrium_errors::{AppError, AppResult};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use crate::map_sqlx_error;

/// 连接池参数
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub url: String,
    /// 出现在 `pg_stat_activity.application_name` 中
    pub application_name: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl PoolSettings {
    pub fn new(url: impl Into<String>, application_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            application_name: application_name.into(),
            max_connections: 10,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    fn connect_options(&self) -> AppResult<PgConnectOptions> {
        PgConnectOptions::from_str(&self.url)
            .map(|opts| opts.application_name(&self.application_name))
            .map_err(|e| AppError::database(format!("Invalid database url: {}", e)))
    }
}

/// 建立连接池并执行一次探活查询
pub async fn connect(settings: &PoolSettings) -> AppResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout)
        .connect_with(settings.connect_options()?)
        .await
        .map_err(|e| AppError::database(format!("Failed to create pool: {}", e)))?;

    ping(&pool).await?;
    Ok(pool)
}

pub async fn ping(pool: &PgPool) -> AppResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(map_sqlx_error)?;
    Ok(())
}
