//! Warden - Telegram group management bot.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `cache` - Tiered caching (Moka in front of Redis)
//! - `database` - MongoDB records, read-through / write-through
//! - `permissions` - Admin rosters with caching
//! - `bot` - Core bot functionality (with Throttle for API rate limiting)
//! - `plugins` - Command handlers
//! - `utils` - Utility functions

pub mod bot;
pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod permissions;
pub mod plugins;
pub mod utils;
