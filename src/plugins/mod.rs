//! Plugin system for command handlers.
//!
//! Add new plugins by:
//! 1. Creating a new file in this directory
//! 2. Adding `pub mod your_plugin;` below
//! 3. Adding the handler to `command_handler()`

pub mod admin;
pub mod devs;
pub mod rules;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::ReplyParameters;
use teloxide::utils::command::BotCommands;

use crate::bot::dispatcher::{AppState, ThrottledBot};

/// All bot commands.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot")]
    Start(String),

    // Rules commands
    #[command(description = "Show the chat rules")]
    Rules,

    #[command(description = "Set the chat rules")]
    Setrules(String),

    #[command(description = "Clear the chat rules")]
    Clearrules,

    #[command(description = "Send rules in PM (on/off)")]
    Privaterules(String),

    #[command(description = "Set the rules button label")]
    Setrulesbutton(String),

    // Admin commands
    #[command(description = "List chat admins")]
    Adminlist,

    #[command(description = "Refresh the cached admin list")]
    Admincache,

    // Team commands
    #[command(description = "Add a sudo user")]
    Addsudo(String),

    #[command(description = "Add a dev user")]
    Adddev(String),

    #[command(description = "Remove a sudo user")]
    Remsudo(String),

    #[command(description = "Remove a dev user")]
    Remdev(String),

    #[command(description = "List the bot team")]
    Teamusers,

    #[command(description = "Bot statistics")]
    Stats,

    #[command(description = "Show info about a chat")]
    Chatinfo(String),

    #[command(description = "Make the bot leave a chat")]
    Leavechat(String),
}

/// Build the combined command handler.
pub fn command_handler() -> UpdateHandler<anyhow::Error> {
    use dptree::case;

    teloxide::filter_command::<Command, _>()
        .branch(case![Command::Start(args)].endpoint(handle_start))
        // Rules
        .branch(case![Command::Rules].endpoint(rules::rules_command))
        .branch(case![Command::Setrules(args)].endpoint(rules::setrules_command))
        .branch(case![Command::Clearrules].endpoint(rules::clearrules_command))
        .branch(case![Command::Privaterules(args)].endpoint(rules::privaterules_command))
        .branch(case![Command::Setrulesbutton(args)].endpoint(rules::setrulesbutton_command))
        // Admin
        .branch(case![Command::Adminlist].endpoint(admin::adminlist_command))
        .branch(case![Command::Admincache].endpoint(admin::admincache_command))
        // Team
        .branch(case![Command::Addsudo(args)].endpoint(devs::addsudo_command))
        .branch(case![Command::Adddev(args)].endpoint(devs::adddev_command))
        .branch(case![Command::Remsudo(args)].endpoint(devs::remsudo_command))
        .branch(case![Command::Remdev(args)].endpoint(devs::remdev_command))
        .branch(case![Command::Teamusers].endpoint(devs::teamusers_command))
        .branch(case![Command::Stats].endpoint(devs::stats_command))
        .branch(case![Command::Chatinfo(args)].endpoint(devs::chatinfo_command))
        .branch(case![Command::Leavechat(args)].endpoint(devs::leavechat_command))
}

/// Handle /start command with optional deep link.
async fn handle_start(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    if let Some(chat_id) = args.strip_prefix("rules_") {
        return rules::handle_rules_deeplink(bot, msg, state, chat_id).await;
    }

    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;
    Ok(())
}

/// Reply to the command message.
pub(crate) async fn reply(bot: &ThrottledBot, msg: &Message, text: impl Into<String>) -> anyhow::Result<()> {
    bot.send_message(msg.chat.id, text)
        .parse_mode(teloxide::types::ParseMode::Html)
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;
    Ok(())
}

/// True in groups and supergroups; otherwise tells the user and returns false.
pub(crate) async fn require_group(bot: &ThrottledBot, msg: &Message) -> anyhow::Result<bool> {
    if msg.chat.is_group() || msg.chat.is_supergroup() {
        return Ok(true);
    }
    reply(bot, msg, "This command only works in groups.").await?;
    Ok(false)
}
