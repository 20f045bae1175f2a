//! Cache configuration.

use std::time::Duration;

/// Lifetime of every record written through the object cache.
pub const RECORD_TTL: Duration = Duration::from_secs(600);

/// Default deadline for a single remote tier or store round-trip.
pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(2);

/// Configuration for a plain in-process cache instance.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries in the cache.
    pub max_capacity: u64,

    /// Time-to-idle for cache entries.
    /// Entries are evicted if not accessed within this duration.
    pub tti: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            tti: None,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with the given max capacity.
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self {
            max_capacity,
            ..Default::default()
        }
    }

    /// Set time-to-idle for cache entries.
    #[must_use]
    pub fn tti(mut self, duration: Duration) -> Self {
        self.tti = Some(duration);
        self
    }

    /// Config for admin roster slots.
    /// Slots go away when a chat has been quiet for an hour.
    pub fn admin_rosters() -> Self {
        Self::with_capacity(5_000).tti(Duration::from_secs(3600))
    }
}

/// Bounds for the in-process tier of the tiered store.
///
/// Both bounds apply: the tier never holds more than `max_items` entries and
/// never more than `max_cost` bytes of payload.
#[derive(Debug, Clone, Copy)]
pub struct LocalTierConfig {
    pub max_items: u64,
    pub max_cost: u64,
}

impl Default for LocalTierConfig {
    fn default() -> Self {
        Self {
            max_items: 1_000,
            max_cost: 1024 * 1024,
        }
    }
}

impl LocalTierConfig {
    /// Weight charged for the smallest entry.
    ///
    /// Every entry costs at least `max_cost / max_items`, so the cost budget
    /// also caps the entry count.
    pub fn weight_floor(&self) -> u32 {
        let floor = self.max_cost / self.max_items.max(1);
        floor.clamp(1, u32::MAX as u64) as u32
    }
}

/// Connection settings for the Redis tier.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// `host:port`
    pub address: String,
    pub password: Option<String>,
    pub db: i64,
}

impl RedisConfig {
    /// Build the `redis://` connection URL.
    pub fn url(&self) -> Result<url::Url, url::ParseError> {
        let mut url = url::Url::parse(&format!("redis://{}", self.address))?;
        if let Some(password) = &self.password {
            // Only fails for cannot-be-a-base URLs, which redis:// never is.
            let _ = url.set_password(Some(password));
        }
        url.set_path(&format!("/{}", self.db));
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_floor() {
        let config = LocalTierConfig { max_items: 100, max_cost: 10_000 };
        assert_eq!(config.weight_floor(), 100);

        let tiny = LocalTierConfig { max_items: 1_000, max_cost: 10 };
        assert_eq!(tiny.weight_floor(), 1);

        let zero_items = LocalTierConfig { max_items: 0, max_cost: 64 };
        assert_eq!(zero_items.weight_floor(), 64);
    }

    #[test]
    fn test_redis_url() {
        let config = RedisConfig {
            address: "localhost:6379".to_string(),
            password: Some("hunter2".to_string()),
            db: 3,
        };
        assert_eq!(config.url().unwrap().as_str(), "redis://:hunter2@localhost:6379/3");

        let open = RedisConfig {
            address: "cache:6380".to_string(),
            password: None,
            db: 0,
        };
        assert_eq!(open.url().unwrap().as_str(), "redis://cache:6380/0");
    }
}
