//! Configuration module.
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::cache::{DEFAULT_BACKEND_TIMEOUT, LocalTierConfig, RedisConfig};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub bot_token: String,

    /// Bot username (without @) for deep link construction.
    /// Optional - will be fetched via getMe if not set.
    pub bot_username: Option<String>,

    /// Owner user IDs (comma-separated)
    /// These users have full access to all bot features.
    pub owner_ids: Vec<u64>,

    // MongoDB
    pub mongodb_uri: String,
    pub mongodb_database: String,

    /// Remote cache tier. `None` keeps the remote tier in-process.
    pub redis: Option<RedisConfig>,

    /// Local cache tier bounds.
    pub local_cache: LocalTierConfig,

    /// Deadline for each remote cache and database call.
    pub backend_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Fails if a required variable is missing or a number does not parse.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        // Parse owner IDs
        let owner_ids = env::var("OWNER_IDS")
            .unwrap_or_default()
            .split(',')
            .filter_map(|s| s.trim().parse::<u64>().ok())
            .collect();

        // Parse bot username (strip @ if present)
        let bot_username = env::var("BOT_USERNAME")
            .ok()
            .map(|s| s.trim_start_matches('@').to_string())
            .filter(|s| !s.is_empty());

        let redis = match non_empty("REDIS_ADDRESS") {
            Some(address) => Some(RedisConfig {
                address,
                password: non_empty("REDIS_PASSWORD"),
                db: parse_or("REDIS_DB", 0)?,
            }),
            None => None,
        };

        let defaults = LocalTierConfig::default();
        let local_cache = LocalTierConfig {
            max_items: parse_or("CACHE_MAX_ITEMS", defaults.max_items)?,
            max_cost: parse_or("CACHE_MAX_COST", defaults.max_cost)?,
        };

        let backend_timeout = parse_or::<u64>("BACKEND_TIMEOUT_MS", DEFAULT_BACKEND_TIMEOUT.as_millis() as u64)
            .map(Duration::from_millis)?;

        Ok(Self {
            bot_token: env::var("BOT_TOKEN").context("BOT_TOKEN must be set")?,
            bot_username,
            owner_ids,
            mongodb_uri: env::var("MONGODB_URI").context("MONGODB_URI must be set")?,
            mongodb_database: env::var("MONGODB_DATABASE").unwrap_or_else(|_| "warden".to_string()),
            redis,
            local_cache,
            backend_timeout,
        })
    }
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match non_empty(name) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{name} must be a number, got {raw:?}")),
        None => Ok(default),
    }
}
