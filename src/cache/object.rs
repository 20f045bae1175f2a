//! Typed object cache on top of the tiered byte store.
//!
//! Records are stored as JSON inside a `{kind, value}` envelope under the key
//! `"<kind>:<id>"`. Reading a payload tagged with another kind, or one that
//! does not decode as the requested type, is an error for the caller.

use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::tiered::TieredCacheStore;
use crate::error::CacheError;

/// A value that can live in the object cache.
pub trait Cacheable: Serialize + DeserializeOwned + Send + Sync {
    /// Namespace tag. Distinct per record kind.
    const KIND: &'static str;
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    kind: &'a str,
    value: &'a T,
}

#[derive(Deserialize)]
struct Envelope {
    kind: String,
    value: serde_json::Value,
}

/// Typed get/set over the [`TieredCacheStore`].
#[derive(Debug, Clone)]
pub struct ObjectCache {
    store: TieredCacheStore,
}

impl ObjectCache {
    pub fn new(store: TieredCacheStore) -> Self {
        Self { store }
    }

    /// The underlying byte store.
    pub fn store(&self) -> &TieredCacheStore {
        &self.store
    }

    /// Cache key for record `id` of kind `T`.
    pub fn key<T: Cacheable>(id: i64) -> String {
        format!("{}:{}", T::KIND, id)
    }

    /// Fetch and decode the record stored for `id`.
    pub async fn get<T: Cacheable>(&self, id: i64) -> Result<Option<T>, CacheError> {
        let Some(bytes) = self.store.get(&Self::key::<T>(id)).await else {
            return Ok(None);
        };
        decode::<T>(&bytes).map(Some)
    }

    /// Encode `value` and write it to both tiers.
    pub async fn set<T: Cacheable>(&self, id: i64, value: &T, ttl: Duration) -> Result<(), CacheError> {
        let bytes = encode(value)?;
        self.store.set(&Self::key::<T>(id), bytes, ttl).await;
        Ok(())
    }
}

fn encode<T: Cacheable>(value: &T) -> Result<Bytes, CacheError> {
    let envelope = EnvelopeRef { kind: T::KIND, value };
    serde_json::to_vec(&envelope)
        .map(Bytes::from)
        .map_err(|source| CacheError::Encode { kind: T::KIND, source })
}

fn decode<T: Cacheable>(bytes: &[u8]) -> Result<T, CacheError> {
    let envelope: Envelope = serde_json::from_slice(bytes)
        .map_err(|source| CacheError::Decode { kind: T::KIND, source })?;

    if envelope.kind != T::KIND {
        return Err(CacheError::KindMismatch {
            expected: T::KIND,
            found: envelope.kind,
        });
    }

    serde_json::from_value(envelope.value).map_err(|source| CacheError::Decode { kind: T::KIND, source })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;

    use super::*;
    use crate::cache::config::LocalTierConfig;
    use crate::cache::remote::MemoryTier;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Greeting {
        chat_id: i64,
        text: String,
    }

    impl Cacheable for Greeting {
        const KIND: &'static str = "greeting";
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        hits: u32,
    }

    impl Cacheable for Counter {
        const KIND: &'static str = "counter";
    }

    fn object_cache() -> ObjectCache {
        let remote = Arc::new(MemoryTier::new());
        ObjectCache::new(TieredCacheStore::new(
            LocalTierConfig::default(),
            remote,
            Duration::from_secs(1),
        ))
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = object_cache();
        let greeting = Greeting { chat_id: -100, text: "hi".to_string() };

        cache.set(-100, &greeting, Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get::<Greeting>(-100).await.unwrap(), Some(greeting));
    }

    #[tokio::test]
    async fn test_kinds_do_not_collide() {
        let cache = object_cache();
        cache.set(5, &Counter { hits: 3 }, Duration::from_secs(60)).await.unwrap();

        assert_eq!(cache.get::<Greeting>(5).await.unwrap(), None);
        assert_eq!(cache.get::<Counter>(5).await.unwrap(), Some(Counter { hits: 3 }));
    }

    #[tokio::test]
    async fn test_foreign_kind_is_an_error() {
        let cache = object_cache();
        let bytes = encode(&Counter { hits: 1 }).unwrap();
        cache
            .store()
            .set(&ObjectCache::key::<Greeting>(9), bytes, Duration::from_secs(60))
            .await;

        assert_matches!(
            cache.get::<Greeting>(9).await,
            Err(CacheError::KindMismatch { expected: "greeting", .. })
        );
    }

    #[tokio::test]
    async fn test_garbage_is_an_error() {
        let cache = object_cache();
        cache
            .store()
            .set(&ObjectCache::key::<Greeting>(1), Bytes::from_static(b"not json"), Duration::from_secs(60))
            .await;

        assert_matches!(cache.get::<Greeting>(1).await, Err(CacheError::Decode { .. }));
    }
}
