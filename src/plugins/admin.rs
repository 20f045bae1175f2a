//! Admin roster commands.

use teloxide::prelude::*;
use tracing::warn;

use super::{reply, require_group};
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::utils::mention_html;

/// Handle /adminlist command - list the chat's admins.
pub async fn adminlist_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    if !require_group(&bot, &msg).await? {
        return Ok(());
    }

    let roster = match state.permissions.roster(msg.chat.id).await {
        Ok(roster) => roster,
        Err(e) => {
            warn!("Failed to load admins for chat {}: {}", msg.chat.id, e);
            return reply(&bot, &msg, "Couldn't fetch the admin list right now.").await;
        }
    };

    let mut text = format!("<b>Admins ({}):</b>\n", roster.len());
    for admin in roster.members().iter().filter(|a| !a.is_anonymous) {
        let marker = if admin.is_owner { " (owner)" } else { "" };
        text.push_str(&format!("• {}{}\n", mention_html(admin.user_id, &admin.first_name), marker));
    }

    reply(&bot, &msg, text).await
}

/// Handle /admincache command - rebuild the admin roster now.
pub async fn admincache_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    if !require_group(&bot, &msg).await? {
        return Ok(());
    }
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    if !state.permissions.is_admin(msg.chat.id, user.id).await.unwrap_or(false) {
        return reply(&bot, &msg, "Only admins can refresh the admin list.").await;
    }

    match state.permissions.refresh(msg.chat.id).await {
        Ok(roster) => reply(&bot, &msg, format!("Admin list refreshed ({} admins).", roster.len())).await,
        Err(e) => {
            warn!("Failed to refresh admins for chat {}: {}", msg.chat.id, e);
            reply(&bot, &msg, "Couldn't refresh the admin list right now.").await
        }
    }
}
