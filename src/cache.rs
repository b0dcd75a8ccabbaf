use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Key/value store with per-entry expiry, used for the partner app token.
///
/// An expired entry must be indistinguishable from a missing one. Reads do
/// not extend an entry's lifetime.
#[async_trait]
pub trait TokenCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> anyhow::Result<()>;

    async fn delete(&self, key: &str);
}

/// Entry stored in the local DashMap with an expiry timestamp.
#[derive(Clone)]
pub(crate) struct CacheEntry {
    value: String,
    pub(crate) expires_at: Instant,
}

impl CacheEntry {
    fn new(value: &str, ttl: Duration) -> Self {
        Self {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Look up a live entry, lazily evicting it if it has expired.
fn read_local(local: &DashMap<String, CacheEntry>, key: &str) -> Option<String> {
    if let Some(entry) = local.get(key) {
        if entry.is_live() {
            return Some(entry.value.clone());
        }
        // expired: drop the ref before removing
        drop(entry);
        local.remove(key);
    }
    None
}

/// In-process expiring map. The default when no Redis URL is configured.
#[derive(Clone, Default)]
pub struct MemoryTokenCache {
    pub(crate) local: Arc<DashMap<String, CacheEntry>>,
}

impl MemoryTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove all expired entries.
    pub fn evict_expired(&self) -> usize {
        let before = self.local.len();
        self.local.retain(|_, entry| entry.is_live());
        before - self.local.len()
    }

    /// Number of stored entries, expired ones included until evicted.
    pub fn len(&self) -> usize {
        self.local.len()
    }

    pub fn is_empty(&self) -> bool {
        self.local.is_empty()
    }
}

#[async_trait]
impl TokenCache for MemoryTokenCache {
    async fn get(&self, key: &str) -> Option<String> {
        read_local(&self.local, key)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> anyhow::Result<()> {
        self.local.insert(
            key.to_string(),
            CacheEntry::new(value, Duration::from_secs(ttl_secs)),
        );
        Ok(())
    }

    async fn delete(&self, key: &str) {
        self.local.remove(key);
    }
}

/// Two-tier cache: in-memory DashMap (tier 1) backed by Redis (tier 2), so
/// that several processes can share one app token.
#[derive(Clone)]
pub struct TieredTokenCache {
    pub(crate) local: Arc<DashMap<String, CacheEntry>>,
    redis: ConnectionManager,
}

impl TieredTokenCache {
    pub fn new(redis: ConnectionManager) -> Self {
        Self {
            local: Arc::new(DashMap::new()),
            redis,
        }
    }

    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self::new(manager))
    }

    pub fn invalidate_local(&self, key: &str) {
        self.local.remove(key);
    }
}

#[async_trait]
impl TokenCache for TieredTokenCache {
    async fn get(&self, key: &str) -> Option<String> {
        // tier 1: in-memory (with TTL check)
        if let Some(value) = read_local(&self.local, key) {
            return Some(value);
        }

        // tier 2: redis
        let mut conn = self.redis.clone();
        match conn.get::<_, Option<String>>(key).await {
            Ok(Some(value)) => {
                // Re-use the Redis TTL for the local entry; a key without a
                // positive TTL is not copied locally.
                let ttl_secs: i64 = conn.ttl(key).await.unwrap_or(-1);
                if ttl_secs > 0 {
                    self.local.insert(
                        key.to_string(),
                        CacheEntry::new(&value, Duration::from_secs(ttl_secs as u64)),
                    );
                }
                Some(value)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key, error = %e, "token cache read failed, treating as miss");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> anyhow::Result<()> {
        self.local.insert(
            key.to_string(),
            CacheEntry::new(value, Duration::from_secs(ttl_secs)),
        );

        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) {
        self.local.remove(key);
        let mut conn = self.redis.clone();
        if let Err(e) = conn.del::<_, ()>(key).await {
            tracing::warn!(key, error = %e, "token cache delete failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_cache_set_get_delete() {
        let cache = MemoryTokenCache::new();
        assert!(cache.get("FINICITY_TOKEN").await.is_none());

        cache.set("FINICITY_TOKEN", "abc", 60).await.unwrap();
        assert_eq!(cache.get("FINICITY_TOKEN").await.as_deref(), Some("abc"));

        cache.delete("FINICITY_TOKEN").await;
        assert!(cache.get("FINICITY_TOKEN").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_reads_as_absent_and_is_evicted() {
        let cache = MemoryTokenCache::new();
        cache.set("k", "stale", 0).await.unwrap();
        assert_eq!(cache.len(), 1);
        assert!(cache.get("k").await.is_none());
        assert!(cache.is_empty(), "expired entry should be removed on read");
    }

    #[tokio::test]
    async fn test_evict_expired_keeps_live_entries() {
        let cache = MemoryTokenCache::new();
        cache.set("live", "1", 3600).await.unwrap();
        cache.set("dead", "2", 0).await.unwrap();
        assert_eq!(cache.evict_expired(), 1);
        assert_eq!(cache.get("live").await.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value() {
        let cache = MemoryTokenCache::new();
        cache.set("k", "old", 60).await.unwrap();
        cache.set("k", "new", 60).await.unwrap();
        assert_eq!(cache.get("k").await.as_deref(), Some("new"));
    }

    /// Requires Redis at REDIS_URL.
    #[tokio::test]
    #[ignore]
    async fn test_tiered_cache_round_trip() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let cache = TieredTokenCache::connect(&url).await.unwrap();
        cache.set("finicity-test-token", "xyz", 30).await.unwrap();
        cache.invalidate_local("finicity-test-token");
        assert_eq!(cache.get("finicity-test-token").await.as_deref(), Some("xyz"));
        cache.delete("finicity-test-token").await;
        assert!(cache.get("finicity-test-token").await.is_none());
    }
}
