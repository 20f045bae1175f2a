//! Two-tier byte cache: bounded in-process tier chained in front of a
//! shared remote tier.
//!
//! Reads go local → remote and backfill the local tier on a remote hit.
//! Writes go to both tiers. The local tier ignores TTLs and evicts by
//! frequency under a cost budget, so it only ever buys latency.
//! Remote failures never surface: reads degrade to a miss, writes are
//! logged and dropped.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, warn};

use super::config::LocalTierConfig;
use super::remote::RemoteTier;
use super::typed::TypedCache;
use crate::error::CacheError;

/// Chained local + remote cache over byte payloads.
#[derive(Clone)]
pub struct TieredCacheStore {
    local: TypedCache<String, Bytes>,
    remote: Arc<dyn RemoteTier>,
    remote_timeout: Duration,
}

impl TieredCacheStore {
    pub fn new(local: LocalTierConfig, remote: Arc<dyn RemoteTier>, remote_timeout: Duration) -> Self {
        let floor = local.weight_floor();
        let local = TypedCache::weighted("local_tier", local.max_cost, move |_key, value: &Bytes| {
            u32::try_from(value.len()).unwrap_or(u32::MAX).max(floor)
        });

        Self {
            local,
            remote,
            remote_timeout,
        }
    }

    /// Look up `key`, local tier first.
    pub async fn get(&self, key: &str) -> Option<Bytes> {
        if let Some(value) = self.local.get(&key.to_string()) {
            debug!(key, "local tier hit");
            return Some(value);
        }

        match self.remote_call(self.remote.get(key)).await {
            Ok(Some(value)) => {
                debug!(key, backend = self.remote.name(), "remote tier hit");
                self.local.insert(key.to_string(), value.clone());
                Some(value)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(key, backend = self.remote.name(), error = %e, "remote tier get failed, treating as miss");
                None
            }
        }
    }

    /// Write `value` to both tiers. The remote copy expires after `ttl`.
    pub async fn set(&self, key: &str, value: Bytes, ttl: Duration) {
        self.local.insert(key.to_string(), value.clone());

        if let Err(e) = self.remote_call(self.remote.set(key, value, ttl)).await {
            warn!(key, backend = self.remote.name(), error = %e, "remote tier set failed");
        }
    }

    /// Drop `key` from the local tier only.
    pub fn evict_local(&self, key: &str) {
        self.local.invalidate(&key.to_string());
    }

    /// Whether the local tier currently holds `key`.
    pub fn is_local(&self, key: &str) -> bool {
        self.local.get(&key.to_string()).is_some()
    }

    /// Settled number of entries held by the local tier.
    pub fn local_len(&self) -> u64 {
        self.local.run_pending_tasks();
        self.local.entry_count()
    }

    async fn remote_call<T>(
        &self,
        call: impl Future<Output = Result<T, CacheError>>,
    ) -> Result<T, CacheError> {
        tokio::time::timeout(self.remote_timeout, call)
            .await
            .map_err(|_| CacheError::Timeout(self.remote_timeout))?
    }
}

impl std::fmt::Debug for TieredCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredCacheStore")
            .field("local", &self.local)
            .field("remote", &self.remote.name())
            .field("remote_timeout", &self.remote_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::cache::remote::MemoryTier;

    fn store_with(remote: Arc<MemoryTier>) -> TieredCacheStore {
        TieredCacheStore::new(LocalTierConfig::default(), remote, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_local_hit_skips_remote() {
        let remote = Arc::new(MemoryTier::new());
        let store = store_with(remote.clone());

        store.set("rules:1", Bytes::from_static(b"abc"), Duration::from_secs(60)).await;
        assert_eq!(store.get("rules:1").await, Some(Bytes::from_static(b"abc")));
        assert_eq!(remote.get_count(), 0);
    }

    #[tokio::test]
    async fn test_remote_hit_backfills_local() {
        let remote = Arc::new(MemoryTier::new());
        let store = store_with(remote.clone());

        store.set("rules:1", Bytes::from_static(b"abc"), Duration::from_secs(60)).await;
        store.evict_local("rules:1");
        assert!(!store.is_local("rules:1"));

        assert_eq!(store.get("rules:1").await, Some(Bytes::from_static(b"abc")));
        assert_eq!(remote.get_count(), 1);
        assert!(store.is_local("rules:1"));

        assert_eq!(store.get("rules:1").await, Some(Bytes::from_static(b"abc")));
        assert_eq!(remote.get_count(), 1);
    }

    #[tokio::test]
    async fn test_remote_failure_degrades_to_miss() {
        let remote = Arc::new(MemoryTier::new());
        let store = store_with(remote.clone());

        remote.set_offline(true);
        store.set("team:7", Bytes::from_static(b"x"), Duration::from_secs(60)).await;
        store.evict_local("team:7");

        assert_eq!(store.get("team:7").await, None);
    }

    #[tokio::test]
    async fn test_remote_entry_expires() {
        let clock = Arc::new(ManualClock::default());
        let remote = Arc::new(MemoryTier::with_clock(clock.clone()));
        let store = store_with(remote);

        store.set("rules:2", Bytes::from_static(b"x"), Duration::from_secs(600)).await;
        store.evict_local("rules:2");
        clock.advance(Duration::from_secs(601));

        assert_eq!(store.get("rules:2").await, None);
    }

    #[tokio::test]
    async fn test_local_tier_is_bounded() {
        let remote = Arc::new(MemoryTier::new());
        let config = LocalTierConfig { max_items: 8, max_cost: 8 * 64 };
        let store = TieredCacheStore::new(config, remote, Duration::from_secs(1));

        for i in 0..100 {
            store.set(&format!("k:{i}"), Bytes::from_static(b"tiny"), Duration::from_secs(60)).await;
        }

        assert!(store.local_len() <= 8);
        for i in 0..100 {
            assert_eq!(store.get(&format!("k:{i}")).await, Some(Bytes::from_static(b"tiny")));
        }
    }
}
