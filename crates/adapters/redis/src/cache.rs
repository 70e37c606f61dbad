//! Redis Cache 实现

use async_trait::async_trait;
use atrium_errors::{AppError, AppResult};
use atrium_ports::CachePort;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;

/// Redis Cache
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    prefix: Option<String>,
}

impl RedisCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn, prefix: None }
    }

    /// 为所有键加统一前缀，便于多个服务共享同一个 Redis
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    fn key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }
}

fn redis_error(op: &str, e: redis::RedisError) -> AppError {
    AppError::external_service(format!("Redis {} failed: {}", op, e))
}

#[async_trait]
impl CachePort for RedisCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(self.key(key))
            .await
            .map_err(|e| redis_error("get", e))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<()> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(duration) => conn
                .set_ex(self.key(key), value, duration.as_secs().max(1))
                .await
                .map_err(|e| redis_error("set", e)),
            None => conn
                .set(self.key(key), value)
                .await
                .map_err(|e| redis_error("set", e)),
        }
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        conn.del(self.key(key))
            .await
            .map_err(|e| redis_error("delete", e))
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let mut conn = self.conn.clone();
        conn.exists(self.key(key))
            .await
            .map_err(|e| redis_error("exists", e))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<()> {
        let mut conn = self.conn.clone();
        conn.expire(self.key(key), ttl.as_secs() as i64)
            .await
            .map_err(|e| redis_error("expire", e))
    }
}
