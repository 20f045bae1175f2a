//! Error types for the cache, store and roster layers.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by the cache tiers and the object marshaler.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Redis returned an error or the connection dropped.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The remote tier is not reachable.
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    /// The remote tier did not answer within the deadline.
    #[error("cache backend timed out after {0:?}")]
    Timeout(Duration),

    /// A record could not be serialized.
    #[error("failed to encode cached {kind}: {source}")]
    Encode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Stored bytes do not decode as the requested record.
    #[error("failed to decode cached {kind}: {source}")]
    Decode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Stored payload belongs to another record kind.
    #[error("cached entry holds {found}, expected {expected}")]
    KindMismatch {
        expected: &'static str,
        found: String,
    },
}

/// Errors raised by the durable document store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("mongodb error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    #[error("malformed document: {0}")]
    Decode(#[from] mongodb::bson::de::Error),

    #[error("failed to encode document: {0}")]
    Encode(#[from] mongodb::bson::ser::Error),

    /// Failure injected or reported by a non-Mongo store.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised while refreshing an admin roster.
#[derive(Error, Debug)]
pub enum RosterError {
    #[error("telegram request failed: {0}")]
    Transport(#[from] teloxide::RequestError),

    #[error("admin source unavailable: {0}")]
    Unavailable(String),
}
