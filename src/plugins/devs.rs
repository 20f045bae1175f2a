//! Bot team commands (owners, devs and sudo users).

use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode};
use tracing::info;

use super::reply;
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::database::{TeamChange, TeamRole};
use crate::utils::{html_escape, mention_html};

/// Resolve the target user from a reply or a numeric argument.
fn target_user(msg: &Message, args: &str) -> Option<i64> {
    if let Some(user) = msg.reply_to_message().and_then(|m| m.from.as_ref()) {
        return Some(user.id.0 as i64);
    }
    args.split_whitespace()
        .next()
        .and_then(|s| s.parse::<i64>().ok())
        .filter(|id| *id > 0)
}

/// First argument as a chat id.
fn chat_id_arg(args: &str) -> Option<ChatId> {
    args.split_whitespace()
        .next()
        .and_then(|s| s.parse::<i64>().ok())
        .map(ChatId)
}

fn sender_id(msg: &Message) -> Option<u64> {
    msg.from.as_ref().map(|u| u.id.0)
}

async fn change_team(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
    change: TeamChange,
) -> anyhow::Result<()> {
    let Some(sender) = sender_id(&msg) else {
        return Ok(());
    };
    if !state.is_owner(sender) {
        return reply(&bot, &msg, "Only bot owners can manage the team.").await;
    }

    let Some(user_id) = target_user(&msg, &args) else {
        return reply(&bot, &msg, "Reply to a user or give a user ID.").await;
    };

    let member = state.team.get(user_id).await;
    let (already, done) = match change {
        TeamChange::AddSudo => (member.sudo, "is now a sudo user"),
        TeamChange::RemSudo => (!member.sudo, "is no longer a sudo user"),
        TeamChange::AddDev => (member.dev, "is now a dev"),
        TeamChange::RemDev => (!member.dev, "is no longer a dev"),
    };

    if already {
        return reply(&bot, &msg, format!("<code>{user_id}</code> already has that status.")).await;
    }

    state.team.clone().update_background(user_id, change);
    reply(&bot, &msg, format!("<code>{user_id}</code> {done}.")).await
}

/// Handle /addsudo command.
pub async fn addsudo_command(bot: ThrottledBot, msg: Message, state: AppState, args: String) -> anyhow::Result<()> {
    change_team(bot, msg, state, args, TeamChange::AddSudo).await
}

/// Handle /adddev command.
pub async fn adddev_command(bot: ThrottledBot, msg: Message, state: AppState, args: String) -> anyhow::Result<()> {
    change_team(bot, msg, state, args, TeamChange::AddDev).await
}

/// Handle /remsudo command.
pub async fn remsudo_command(bot: ThrottledBot, msg: Message, state: AppState, args: String) -> anyhow::Result<()> {
    change_team(bot, msg, state, args, TeamChange::RemSudo).await
}

/// Handle /remdev command.
pub async fn remdev_command(bot: ThrottledBot, msg: Message, state: AppState, args: String) -> anyhow::Result<()> {
    change_team(bot, msg, state, args, TeamChange::RemDev).await
}

/// Handle /teamusers command - list owners, devs and sudo users.
pub async fn teamusers_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(sender) = sender_id(&msg) else {
        return Ok(());
    };
    if !state.is_owner(sender) && state.team.get(sender as i64).await.role().is_none() {
        return Ok(());
    }

    let members = state.team.members().await;

    let mut text = String::from("<b>Bot team</b>\n\n<b>Owners:</b>\n");
    for id in &state.owner_ids {
        text.push_str(&format!("• {}\n", mention_html(*id, &id.to_string())));
    }

    for (title, role) in [("Devs", TeamRole::Dev), ("Sudo users", TeamRole::Sudo)] {
        let mut ids: Vec<i64> = members
            .iter()
            .filter(|(_, r)| **r == role)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();

        text.push_str(&format!("\n<b>{title}:</b>\n"));
        if ids.is_empty() {
            text.push_str("None\n");
        }
        for id in ids {
            text.push_str(&format!("• {}\n", mention_html(id as u64, &id.to_string())));
        }
    }

    reply(&bot, &msg, text).await
}

/// Handle /stats command.
pub async fn stats_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(sender) = sender_id(&msg) else {
        return Ok(());
    };
    if !state.is_dev(sender).await {
        return Ok(());
    }

    let pending = bot.send_message(msg.chat.id, "Fetching bot stats...").await?;

    let rules = state.rules.stats().await;
    let (devs, sudos) = state.team.counts().await;

    let text = format!(
        "<b>Bot stats</b>\n\n\
         Chats with rules: <code>{}</code>\n\
         Private rules: <code>{}</code>\n\
         Devs: <code>{}</code>\n\
         Sudo users: <code>{}</code>",
        rules.with_rules, rules.private, devs, sudos
    );

    bot.edit_message_text(msg.chat.id, pending.id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// Handle /chatinfo command - name, member count and invite link of a chat.
pub async fn chatinfo_command(bot: ThrottledBot, msg: Message, state: AppState, args: String) -> anyhow::Result<()> {
    let Some(sender) = sender_id(&msg) else {
        return Ok(());
    };
    if !state.is_dev(sender).await {
        return Ok(());
    }

    let Some(chat_id) = chat_id_arg(&args) else {
        return reply(&bot, &msg, "Usage: <code>/chatinfo chat_id</code>").await;
    };

    let chat = match bot.get_chat(chat_id).await {
        Ok(chat) => chat,
        Err(e) => return reply(&bot, &msg, html_escape(&e.to_string())).await,
    };
    let members = bot.get_chat_member_count(chat_id).await.unwrap_or(0);

    let text = format!(
        "<b>Name:</b> {}\n<b>Chat ID:</b> <code>{}</code>\n<b>Users Count:</b> {}\n<b>Link:</b> {}",
        html_escape(chat.title().unwrap_or("-")),
        chat.id,
        members,
        chat.invite_link().map(html_escape).unwrap_or_else(|| "-".to_string())
    );
    reply(&bot, &msg, text).await
}

/// Handle /leavechat command.
pub async fn leavechat_command(bot: ThrottledBot, msg: Message, state: AppState, args: String) -> anyhow::Result<()> {
    let Some(sender) = sender_id(&msg) else {
        return Ok(());
    };
    if !state.is_dev(sender).await {
        return Ok(());
    }

    let Some(chat_id) = chat_id_arg(&args) else {
        return reply(&bot, &msg, "Usage: <code>/leavechat chat_id</code>").await;
    };

    bot.leave_chat(chat_id).await?;
    state.permissions.invalidate(chat_id).await;
    info!("Left chat {} on request of {}", chat_id, sender);

    reply(&bot, &msg, "Okay, I left the chat!").await
}
