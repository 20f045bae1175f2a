//! Cache module - tiered caching with Moka and Redis.
//!
//! ## Architecture
//!
//! - `TypedCache` - thin typed wrapper over a Moka cache
//! - `TieredCacheStore` - bounded local tier chained in front of a remote tier
//! - `ObjectCache` - typed records on top of the tiered store
//!
//! ## Usage
//!
//! ```rust,ignore
//! let objects = ObjectCache::new(TieredCacheStore::new(local, remote, timeout));
//!
//! objects.set(chat_id, &settings, RECORD_TTL).await?;
//! let settings: Option<RulesSettings> = objects.get(chat_id).await?;
//! ```

pub mod clock;
mod config;
mod object;
pub mod remote;
mod tiered;
mod typed;

pub use config::{CacheConfig, DEFAULT_BACKEND_TIMEOUT, LocalTierConfig, RECORD_TTL, RedisConfig};
pub use object::{Cacheable, ObjectCache};
pub use remote::{MemoryTier, RedisTier, RemoteTier};
pub use tiered::TieredCacheStore;
pub use typed::TypedCache;
