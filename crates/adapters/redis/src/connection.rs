//! Redis 连接

use atrium_errors::{AppError, AppResult};
use redis::Client;
use redis::aio::ConnectionManager;

/// 建立自动重连的连接管理器，并用 PING 确认服务端可用
pub async fn connect(url: &str) -> AppResult<ConnectionManager> {
    let client = Client::open(url)
        .map_err(|e| AppError::external_service(format!("Invalid Redis url: {}", e)))?;

    let mut conn = ConnectionManager::new(client)
        .await
        .map_err(|e| AppError::external_service(format!("Failed to connect to Redis: {}", e)))?;

    redis::cmd("PING")
        .query_async::<String>(&mut conn)
        .await
        .map_err(|e| AppError::external_service(format!("Redis PING failed: {}", e)))?;

    Ok(conn)
}
