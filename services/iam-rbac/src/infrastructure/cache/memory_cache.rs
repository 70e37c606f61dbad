//! 进程内缓存
//!
//! 基于 moka，按条目设置过期时间。

use std::time::{Duration, Instant};

use async_trait::async_trait;
use atrium_errors::AppResult;
use atrium_ports::CachePort;
use moka::Expiry;
use moka::future::Cache as MokaCache;

#[derive(Clone)]
struct Entry {
    value: String,
    ttl: Option<Duration>,
}

/// 条目级过期策略：写入与覆盖时都以条目自带的 TTL 为准
struct EntryExpiry;

impl Expiry<String, Entry> for EntryExpiry {
    fn expire_after_create(&self, _key: &String, entry: &Entry, _created_at: Instant) -> Option<Duration> {
        entry.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        entry.ttl
    }
}

/// 进程内 CachePort 实现
#[derive(Clone)]
pub struct MemoryCache {
    inner: MokaCache<String, Entry>,
}

impl MemoryCache {
    pub fn new(max_capacity: u64) -> Self {
        let inner = MokaCache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryExpiry)
            .build();

        Self { inner }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl CachePort for MemoryCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.inner.get(key).await.map(|entry| entry.value))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<()> {
        let entry = Entry {
            value: value.to_string(),
            ttl,
        };
        self.inner.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.inner.invalidate(key).await;
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.inner.get(key).await.is_some())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<()> {
        if let Some(mut entry) = self.inner.get(key).await {
            entry.ttl = Some(ttl);
            self.inner.insert(key.to_string(), entry).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = MemoryCache::default();

        cache.set("user:1", "v", None).await.unwrap();
        assert_eq!(cache.get("user:1").await.unwrap().as_deref(), Some("v"));
        assert!(cache.exists("user:1").await.unwrap());

        cache.delete("user:1").await.unwrap();
        assert!(cache.get("user:1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_entry_ttl() {
        let cache = MemoryCache::default();

        cache
            .set("short", "v", Some(Duration::from_millis(50)))
            .await
            .unwrap();
        cache.set("long", "v", None).await.unwrap();

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert!(cache.get("short").await.unwrap().is_none());
        assert!(cache.get("long").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_expire_shortens_ttl() {
        let cache = MemoryCache::default();
        cache.set("k", "v", None).await.unwrap();

        cache.expire("k", Duration::from_millis(50)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert!(!cache.exists("k").await.unwrap());
    }
}
