//! Permission system for checking user roles.
//!
//! This module provides utilities for checking if a user is an admin,
//! owner, or has specific permissions in a chat.
//!
//! ## Features
//!
//! - Per-chat admin rosters, refreshed on demand (reduces API hits)
//! - Support for checking specific permissions
//! - Owner detection
//!
//! ## Usage
//!
//! ```rust,ignore
//! let rosters = AdminRosterCache::new(Arc::new(TelegramAdmins::new(bot)), CacheConfig::admin_rosters());
//! let perms = Permissions::new(rosters, owner_ids);
//!
//! if perms.can_change_info(chat_id, user_id).await? {
//!     // ...
//! }
//! ```

mod checker;
pub mod roster;
mod telegram;

pub use checker::Permissions;
pub use roster::{AdminMember, AdminRoster, AdminRosterCache, AdminSource};
pub use telegram::TelegramAdmins;
