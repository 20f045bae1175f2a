//! Rules configuration model.

use serde::{Deserialize, Serialize};

use super::Record;
use crate::cache::Cacheable;

/// Rules configuration for a chat, stored in its own collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesSettings {
    /// Telegram chat ID
    #[serde(rename = "_id")]
    pub chat_id: i64,

    /// The rules text (HTML formatted)
    #[serde(default)]
    pub rules: String,

    /// Whether to show rules in PM (true) or in group (false)
    #[serde(default, rename = "privrules")]
    pub private: bool,

    /// Custom label for the "View Rules" button. Empty means the default label.
    #[serde(default, rename = "rules_button", skip_serializing_if = "String::is_empty")]
    pub rules_button: String,
}

/// Label used when a chat has not set its own.
pub const DEFAULT_RULES_BUTTON: &str = "📜 Rules";

impl RulesSettings {
    /// Check if rules are set.
    pub fn has_rules(&self) -> bool {
        !self.rules.trim().is_empty()
    }

    /// Button label, falling back to the default.
    pub fn button_label(&self) -> &str {
        if self.rules_button.is_empty() {
            DEFAULT_RULES_BUTTON
        } else {
            &self.rules_button
        }
    }
}

impl Cacheable for RulesSettings {
    const KIND: &'static str = "rules";
}

impl Record for RulesSettings {
    const COLLECTION: &'static str = "rules";

    fn key(&self) -> i64 {
        self.chat_id
    }

    fn with_key(chat_id: i64) -> Self {
        Self {
            chat_id,
            ..Default::default()
        }
    }
}
