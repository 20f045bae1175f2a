//! Permission checks backed by the admin roster cache.

use std::sync::Arc;

use teloxide::types::{ChatId, UserId};
use tracing::debug;

use super::roster::{AdminMember, AdminRoster, AdminRosterCache};
use crate::error::RosterError;

/// Permission checker.
///
/// Bot owners (from OWNER_IDS env) automatically bypass all permission checks.
#[derive(Clone, Debug)]
pub struct Permissions {
    rosters: AdminRosterCache,
    /// Bot owner IDs - these users have all permissions in all chats.
    owner_ids: Arc<[u64]>,
}

impl Permissions {
    pub fn new(rosters: AdminRosterCache, owner_ids: Vec<u64>) -> Self {
        Self {
            rosters,
            owner_ids: owner_ids.into(),
        }
    }

    /// Check if a user is a bot owner.
    #[inline]
    pub fn is_bot_owner(&self, user_id: UserId) -> bool {
        self.owner_ids.contains(&user_id.0)
    }

    /// Current administrators of a chat.
    pub async fn roster(&self, chat_id: ChatId) -> Result<Arc<AdminRoster>, RosterError> {
        self.rosters.get(chat_id.0).await
    }

    /// Admin record for a user, `None` if they are not an admin.
    ///
    /// Bot owners always get a record with every right.
    pub async fn admin_info(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<Option<AdminMember>, RosterError> {
        if self.is_bot_owner(user_id) {
            debug!("User {} is bot owner, granting all permissions", user_id);
            return Ok(Some(AdminMember::owner(user_id.0, "")));
        }

        let roster = self.rosters.get(chat_id.0).await?;
        Ok(roster.get(user_id.0).cloned())
    }

    async fn check(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        right: impl FnOnce(&AdminMember) -> bool,
    ) -> Result<bool, RosterError> {
        Ok(self
            .admin_info(chat_id, user_id)
            .await?
            .is_some_and(|admin| right(&admin)))
    }

    /// Check if a user is an admin (including owner).
    pub async fn is_admin(&self, chat_id: ChatId, user_id: UserId) -> Result<bool, RosterError> {
        self.check(chat_id, user_id, |_| true).await
    }

    /// Check if a user can change group info.
    pub async fn can_change_info(&self, chat_id: ChatId, user_id: UserId) -> Result<bool, RosterError> {
        self.check(chat_id, user_id, |a| a.can_change_info).await
    }

    /// Check if a user can promote/demote admins.
    pub async fn can_promote_members(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<bool, RosterError> {
        self.check(chat_id, user_id, |a| a.can_promote_members).await
    }

    /// Mark the chat's roster stale.
    ///
    /// Call this when admin membership might have changed.
    pub async fn invalidate(&self, chat_id: ChatId) {
        self.rosters.invalidate(chat_id.0).await;
    }

    /// Re-fetch the chat's roster right away.
    pub async fn refresh(&self, chat_id: ChatId) -> Result<Arc<AdminRoster>, RosterError> {
        self.rosters.refresh(chat_id.0).await
    }
}
