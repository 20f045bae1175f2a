//! Message dispatcher setup.
//!
//! Builds the dispatcher with all command handlers and event handlers.

use std::sync::Arc;

use teloxide::adaptors::Throttle;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::ChatMemberUpdated;

use crate::database::{RulesRepository, StoreContext, TeamRepository};
use crate::permissions::{AdminRosterCache, Permissions};
use crate::plugins;

/// Bot type with Throttle adaptor for automatic rate limiting.
pub type ThrottledBot = Throttle<Bot>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Rules settings (read-through / write-through).
    pub rules: Arc<RulesRepository>,

    /// Bot team membership.
    pub team: Arc<TeamRepository>,

    /// Permission checker over the admin roster cache.
    pub permissions: Permissions,

    /// Owner user IDs (bypass all restrictions).
    pub owner_ids: Vec<u64>,

    /// Bot username (without @) for deep link construction.
    pub bot_username: String,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        ctx: StoreContext,
        rosters: AdminRosterCache,
        owner_ids: Vec<u64>,
        bot_username: String,
    ) -> Self {
        Self {
            rules: Arc::new(RulesRepository::new(ctx.clone())),
            team: Arc::new(TeamRepository::new(ctx)),
            permissions: Permissions::new(rosters, owner_ids.clone()),
            owner_ids,
            bot_username,
        }
    }

    /// Check if a user is a bot owner.
    pub fn is_owner(&self, user_id: u64) -> bool {
        self.owner_ids.contains(&user_id)
    }

    /// Owners and devs.
    pub async fn is_dev(&self, user_id: u64) -> bool {
        self.is_owner(user_id) || self.team.get(user_id as i64).await.dev
    }
}

/// Build the dispatcher with all handlers.
pub fn build_dispatcher(
    bot: ThrottledBot,
    state: AppState,
) -> Dispatcher<ThrottledBot, anyhow::Error, teloxide::dispatching::DefaultKey> {
    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
}

/// Build the handler schema.
fn schema() -> UpdateHandler<anyhow::Error> {
    let message_handler = Update::filter_message().branch(plugins::command_handler());

    // Admin promotions/demotions make the cached roster stale.
    let member_handler = Update::filter_chat_member().endpoint(watch_admin_changes);

    dptree::entry()
        .branch(message_handler)
        .branch(member_handler)
}

async fn watch_admin_changes(update: ChatMemberUpdated, state: AppState) -> anyhow::Result<()> {
    if update.old_chat_member.kind.is_privileged() || update.new_chat_member.kind.is_privileged() {
        state.permissions.invalidate(update.chat.id).await;
    }
    Ok(())
}
