//! 数据库迁移

use atrium_errors::{AppError, AppResult};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use tracing::info;

/// 执行服务自带的迁移脚本
pub async fn run_migrations(pool: &PgPool, migrator: &Migrator) -> AppResult<()> {
    migrator
        .run(pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to run migrations: {}", e)))?;

    info!(count = migrator.iter().count(), "Database migrations applied");
    Ok(())
}
