//! Repository module - per-kind data access over the shared store context.

mod rules_repository;
mod team_repository;

pub use rules_repository::{RulesRepository, RulesStats};
pub use team_repository::{TeamChange, TeamRepository};
