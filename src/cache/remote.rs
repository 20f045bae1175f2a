//! Remote (shared) cache tier.
//!
//! Redis in production. `MemoryTier` keeps the same TTL semantics in-process
//! and is used when no Redis is configured and in tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::info;

use super::clock::{Clock, SystemClock};
use super::config::RedisConfig;
use crate::error::CacheError;

/// A shared cache backend that honours per-entry TTLs.
#[async_trait]
pub trait RemoteTier: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError>;
}

/// Redis-backed tier.
#[derive(Clone)]
pub struct RedisTier {
    conn: ConnectionManager,
}

impl RedisTier {
    /// Connect and verify the server answers.
    pub async fn connect(config: &RedisConfig) -> anyhow::Result<Self> {
        let client = redis::Client::open(config.url()?.as_str())?;
        let mut conn = client.get_connection_manager().await?;

        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Connected to Redis at {} (db {})", config.address, config.db);

        Ok(Self { conn })
    }
}

#[async_trait]
impl RemoteTier for RedisTier {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let seconds = ttl.as_secs().max(1);
        let _: () = conn.set_ex(key, value.to_vec(), seconds).await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: Bytes,
    expires_at: DateTime<Utc>,
}

/// In-process tier with wall-clock TTLs.
#[derive(Debug)]
pub struct MemoryTier {
    entries: DashMap<String, MemoryEntry>,
    clock: Arc<dyn Clock>,
    offline: AtomicBool,
    gets: AtomicU64,
}

impl MemoryTier {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            offline: AtomicBool::new(false),
            gets: AtomicU64::new(0),
        }
    }

    /// Simulate a connectivity loss. Every call fails while offline.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of `get` calls served so far.
    pub fn get_count(&self) -> u64 {
        self.gets.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<(), CacheError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("memory tier offline".to_string()));
        }
        Ok(())
    }
}

impl Default for MemoryTier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteTier for MemoryTier {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        self.check_online()?;
        self.gets.fetch_add(1, Ordering::SeqCst);

        let now = self.clock.now();
        let expired = match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError> {
        self.check_online()?;

        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.entries.insert(key.to_string(), MemoryEntry { value, expires_at });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_memory_tier_expires_entries() {
        let clock = Arc::new(ManualClock::default());
        let tier = MemoryTier::with_clock(clock.clone());

        tier.set("k", Bytes::from_static(b"v"), Duration::from_secs(600)).await.unwrap();
        clock.advance(Duration::from_secs(599));
        assert_eq!(tier.get("k").await.unwrap(), Some(Bytes::from_static(b"v")));

        clock.advance(Duration::from_secs(1));
        assert_eq!(tier.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_tier_offline() {
        let tier = MemoryTier::new();
        tier.set_offline(true);

        assert_matches!(tier.get("k").await, Err(CacheError::Unavailable(_)));
        assert_matches!(
            tier.set("k", Bytes::new(), Duration::from_secs(1)).await,
            Err(CacheError::Unavailable(_))
        );
    }
}
