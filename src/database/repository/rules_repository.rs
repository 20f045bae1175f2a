//! Rules repository.
//!
//! Read-through / write-through over [`StoreContext`]; records live for
//! 10 minutes in the cache.

use mongodb::bson::doc;
use tracing::info;

use crate::database::context::StoreContext;
use crate::database::models::RulesSettings;

/// Counts shown by `/stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RulesStats {
    /// Chats with non-empty rules.
    pub with_rules: u64,
    /// Chats that show rules in PM.
    pub private: u64,
}

/// Repository for rules settings.
#[derive(Debug, Clone)]
pub struct RulesRepository {
    ctx: StoreContext,
}

impl RulesRepository {
    pub fn new(ctx: StoreContext) -> Self {
        Self { ctx }
    }

    /// Rules settings for a chat. Never fails; unknown chats get defaults.
    pub async fn get(&self, chat_id: i64) -> RulesSettings {
        self.ctx.load(chat_id).await
    }

    /// Set rules text.
    pub async fn set_rules(&self, chat_id: i64, rules: impl Into<String>) -> RulesSettings {
        let rules = rules.into();
        self.ctx
            .mutate(chat_id, "set_rules", |s: &mut RulesSettings| s.rules = rules)
            .await
    }

    /// Clear rules.
    pub async fn clear_rules(&self, chat_id: i64) -> RulesSettings {
        self.set_rules(chat_id, String::new()).await
    }

    /// Set the label of the "View Rules" button. Empty resets to default.
    pub async fn set_rules_button(&self, chat_id: i64, label: impl Into<String>) -> RulesSettings {
        let label = label.into();
        self.ctx
            .mutate(chat_id, "set_rules_button", |s: &mut RulesSettings| s.rules_button = label)
            .await
    }

    /// Choose whether `/rules` answers in PM.
    pub async fn set_private(&self, chat_id: i64, private: bool) -> RulesSettings {
        let settings = self
            .ctx
            .mutate(chat_id, "set_private", |s: &mut RulesSettings| s.private = private)
            .await;
        info!("Private rules for chat {} set to {}", chat_id, private);
        settings
    }

    /// Aggregate counts across all chats.
    pub async fn stats(&self) -> RulesStats {
        RulesStats {
            with_rules: self
                .ctx
                .count::<RulesSettings>(doc! { "rules": { "$ne": "" } })
                .await,
            private: self.ctx.count::<RulesSettings>(doc! { "privrules": true }).await,
        }
    }
}
