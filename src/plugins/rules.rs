//! Rules command handlers.
//!
//! Commands for setting and viewing group rules.

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode, ReplyParameters};
use tracing::info;

use super::{reply, require_group};
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::utils::html_escape;

/// Handle /rules command - show group rules.
pub async fn rules_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    if !require_group(&bot, &msg).await? {
        return Ok(());
    }

    let chat_id = msg.chat.id;
    let settings = state.rules.get(chat_id.0).await;

    if !settings.has_rules() {
        return reply(&bot, &msg, "This chat has no rules set up yet.").await;
    }

    if settings.private {
        let deep_link = format!("https://t.me/{}?start=rules_{}", state.bot_username, chat_id.0);
        let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::url(
            settings.button_label().to_string(),
            deep_link.parse()?,
        )]]);

        bot.send_message(chat_id, "Click the button below to read this chat's rules.")
            .reply_markup(keyboard)
            .reply_parameters(ReplyParameters::new(msg.id))
            .await?;
    } else {
        let title = msg.chat.title().unwrap_or("this chat");
        let text = format!("<b>Rules for {}:</b>\n\n{}", html_escape(title), settings.rules);
        reply(&bot, &msg, text).await?;
    }

    Ok(())
}

/// Handle `/start rules_<chat_id>` - send a chat's rules in PM.
pub async fn handle_rules_deeplink(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    chat_id: &str,
) -> anyhow::Result<()> {
    let Ok(chat_id) = chat_id.parse::<i64>() else {
        return reply(&bot, &msg, "That link is not valid.").await;
    };

    let settings = state.rules.get(chat_id).await;
    if !settings.has_rules() {
        return reply(&bot, &msg, "That chat has no rules set up yet.").await;
    }

    bot.send_message(msg.chat.id, format!("<b>Rules:</b>\n\n{}", settings.rules))
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// True when the sender may change chat info; otherwise tells them.
async fn require_change_info(bot: &ThrottledBot, msg: &Message, state: &AppState) -> anyhow::Result<bool> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(false);
    };

    if state
        .permissions
        .can_change_info(msg.chat.id, user.id)
        .await
        .unwrap_or(false)
    {
        return Ok(true);
    }

    reply(bot, msg, "You need the <code>CanChangeInfo</code> permission to do this.").await?;
    Ok(false)
}

/// Handle /setrules command - set group rules from args or the replied message.
pub async fn setrules_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    if !require_group(&bot, &msg).await? || !require_change_info(&bot, &msg, &state).await? {
        return Ok(());
    }

    let text = if args.trim().is_empty() {
        msg.reply_to_message()
            .and_then(|r| r.text())
            .map(str::to_string)
            .unwrap_or_default()
    } else {
        args.trim().to_string()
    };

    if text.is_empty() {
        return reply(&bot, &msg, "Usage: <code>/setrules your rules here</code> or reply to a message.").await;
    }

    state.rules.set_rules(msg.chat.id.0, text).await;
    info!("Rules set in chat {}", msg.chat.id);
    reply(&bot, &msg, "New rules saved.").await
}

/// Handle /clearrules command.
pub async fn clearrules_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    if !require_group(&bot, &msg).await? || !require_change_info(&bot, &msg, &state).await? {
        return Ok(());
    }

    state.rules.clear_rules(msg.chat.id.0).await;
    reply(&bot, &msg, "Rules cleared.").await
}

/// Handle /privaterules command - toggle or show rules display mode.
pub async fn privaterules_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    if !require_group(&bot, &msg).await? || !require_change_info(&bot, &msg, &state).await? {
        return Ok(());
    }

    let chat_id = msg.chat.id.0;
    match parse_toggle(&args) {
        Some(true) => {
            state.rules.set_private(chat_id, true).await;
            reply(&bot, &msg, "Rules will now be sent in PM.").await
        }
        Some(false) => {
            state.rules.set_private(chat_id, false).await;
            reply(&bot, &msg, "Rules will now be shown in the group.").await
        }
        None => {
            let settings = state.rules.get(chat_id).await;
            let mode = if settings.private { "on" } else { "off" };
            reply(
                &bot,
                &msg,
                format!("Private rules are <b>{mode}</b>. Use <code>/privaterules on|off</code> to change."),
            )
            .await
        }
    }
}

/// Handle /setrulesbutton command. No argument resets the label.
pub async fn setrulesbutton_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    if !require_group(&bot, &msg).await? || !require_change_info(&bot, &msg, &state).await? {
        return Ok(());
    }

    let settings = state.rules.set_rules_button(msg.chat.id.0, args.trim()).await;
    reply(
        &bot,
        &msg,
        format!("Rules button label is now <b>{}</b>.", html_escape(settings.button_label())),
    )
    .await
}

fn parse_toggle(arg: &str) -> Option<bool> {
    match arg.trim().to_lowercase().as_str() {
        "on" | "yes" | "true" => Some(true),
        "off" | "no" | "false" => Some(false),
        _ => None,
    }
}
