//! Admin lists fetched from the Telegram Bot API.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatMember, ChatMemberKind};

use super::roster::{AdminMember, AdminSource};
use crate::error::RosterError;

/// [`AdminSource`] backed by `getChatAdministrators`.
#[derive(Clone)]
pub struct TelegramAdmins {
    bot: Bot,
}

impl TelegramAdmins {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl AdminSource for TelegramAdmins {
    async fn chat_administrators(&self, chat_id: i64) -> Result<Vec<AdminMember>, RosterError> {
        let members = self.bot.get_chat_administrators(ChatId(chat_id)).await?;
        Ok(members.iter().filter_map(admin_from_chat_member).collect())
    }
}

/// Map a chat member to an [`AdminMember`]; `None` for non-admins.
fn admin_from_chat_member(member: &ChatMember) -> Option<AdminMember> {
    let user = &member.user;
    match &member.kind {
        ChatMemberKind::Owner(owner) => Some(AdminMember {
            username: user.username.clone(),
            is_anonymous: owner.is_anonymous,
            ..AdminMember::owner(user.id.0, user.first_name.clone())
        }),
        ChatMemberKind::Administrator(admin) => Some(AdminMember {
            user_id: user.id.0,
            first_name: user.first_name.clone(),
            username: user.username.clone(),
            is_owner: false,
            is_anonymous: admin.is_anonymous,
            can_delete_messages: admin.can_delete_messages,
            can_restrict_members: admin.can_restrict_members,
            can_promote_members: admin.can_promote_members,
            can_change_info: admin.can_change_info,
            can_invite_users: admin.can_invite_users,
            can_pin_messages: admin.can_pin_messages,
            can_manage_chat: admin.can_manage_chat,
        }),
        _ => None,
    }
}
