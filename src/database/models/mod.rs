//! Database models.

pub mod rules_settings;
pub mod team_member;

pub use rules_settings::RulesSettings;
pub use team_member::{TeamMember, TeamRole};

use crate::cache::Cacheable;

/// A per-entity document stored under `_id` and cached by the same key.
pub trait Record: Cacheable + Clone + std::fmt::Debug + 'static {
    /// Backing collection name.
    const COLLECTION: &'static str;

    /// Primary key.
    fn key(&self) -> i64;

    /// The record an entity has before anything was configured.
    fn with_key(key: i64) -> Self;
}
