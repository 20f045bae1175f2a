//! Database module exports.

mod context;
pub mod memory;
mod models;
mod mongo;
mod repository;
mod store;

pub use context::StoreContext;
pub use memory::MemoryStore;
pub use models::*;
pub use mongo::Database;
pub use repository::{RulesRepository, RulesStats, TeamChange, TeamRepository};
pub use store::DocumentStore;
