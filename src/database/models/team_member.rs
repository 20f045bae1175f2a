//! Bot team membership (sudo / dev users).

use serde::{Deserialize, Serialize};

use super::Record;
use crate::cache::Cacheable;

/// Elevated bot permissions held by a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    /// Telegram user ID
    #[serde(rename = "_id")]
    pub user_id: i64,

    #[serde(default)]
    pub sudo: bool,

    #[serde(default)]
    pub dev: bool,
}

/// Highest role a team member holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TeamRole {
    Dev,
    Sudo,
}

impl TeamMember {
    pub fn role(&self) -> Option<TeamRole> {
        if self.dev {
            Some(TeamRole::Dev)
        } else if self.sudo {
            Some(TeamRole::Sudo)
        } else {
            None
        }
    }
}

impl Cacheable for TeamMember {
    const KIND: &'static str = "team";
}

impl Record for TeamMember {
    const COLLECTION: &'static str = "team";

    fn key(&self) -> i64 {
        self.user_id
    }

    fn with_key(user_id: i64) -> Self {
        Self {
            user_id,
            ..Default::default()
        }
    }
}
