//! Per-chat admin roster cache.
//!
//! Each chat gets one [`RosterSlot`] holding the resolved administrator list
//! and an id → member index behind a reader/writer lock. A slot is either
//! valid (readers share the current snapshot) or invalid (the next reader
//! rebuilds it from the transport under the write lock).
//!
//! Snapshots are immutable and swapped whole, so a reader can never see a
//! list and an index from different refreshes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{CacheConfig, TypedCache};
use crate::error::RosterError;

/// A chat administrator and their rights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminMember {
    pub user_id: u64,
    pub first_name: String,
    pub username: Option<String>,
    pub is_owner: bool,
    pub is_anonymous: bool,
    pub can_delete_messages: bool,
    pub can_restrict_members: bool,
    pub can_promote_members: bool,
    pub can_change_info: bool,
    pub can_invite_users: bool,
    pub can_pin_messages: bool,
    pub can_manage_chat: bool,
}

impl AdminMember {
    /// Owner of a chat: every right.
    pub fn owner(user_id: u64, first_name: impl Into<String>) -> Self {
        Self {
            user_id,
            first_name: first_name.into(),
            username: None,
            is_owner: true,
            is_anonymous: false,
            can_delete_messages: true,
            can_restrict_members: true,
            can_promote_members: true,
            can_change_info: true,
            can_invite_users: true,
            can_pin_messages: true,
            can_manage_chat: true,
        }
    }
}

/// Resolved administrators of one chat.
#[derive(Debug, Default)]
pub struct AdminRoster {
    chat_id: i64,
    members: Vec<AdminMember>,
    index: HashMap<u64, usize>,
}

impl AdminRoster {
    /// Later duplicates of a user id are dropped; the first listing wins.
    fn build(chat_id: i64, listed: Vec<AdminMember>) -> Self {
        let mut members = Vec::with_capacity(listed.len());
        let mut index = HashMap::with_capacity(listed.len());

        for member in listed {
            if index.contains_key(&member.user_id) {
                continue;
            }
            index.insert(member.user_id, members.len());
            members.push(member);
        }

        Self { chat_id, members, index }
    }

    pub fn chat_id(&self) -> i64 {
        self.chat_id
    }

    /// Administrators in the order the transport listed them.
    pub fn members(&self) -> &[AdminMember] {
        &self.members
    }

    /// O(1) lookup by user id.
    pub fn get(&self, user_id: u64) -> Option<&AdminMember> {
        self.index.get(&user_id).map(|&pos| &self.members[pos])
    }

    pub fn contains(&self, user_id: u64) -> bool {
        self.index.contains_key(&user_id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of distinct ids in the index.
    pub fn index_len(&self) -> usize {
        self.index.len()
    }
}

/// Where administrator lists come from.
#[async_trait]
pub trait AdminSource: Send + Sync {
    async fn chat_administrators(&self, chat_id: i64) -> Result<Vec<AdminMember>, RosterError>;
}

#[derive(Debug, Default)]
struct SlotState {
    roster: Arc<AdminRoster>,
    cached: bool,
}

/// Cache slot for one chat. Shared by `Arc`, never cloned.
#[derive(Debug)]
pub struct RosterSlot {
    chat_id: i64,
    state: RwLock<SlotState>,
}

impl RosterSlot {
    fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            state: RwLock::new(SlotState {
                roster: Arc::new(AdminRoster {
                    chat_id,
                    ..Default::default()
                }),
                cached: false,
            }),
        }
    }

    /// Current snapshot if the slot is valid.
    async fn cached(&self) -> Option<Arc<AdminRoster>> {
        let state = self.state.read().await;
        state.cached.then(|| Arc::clone(&state.roster))
    }

    /// Rebuild from `source` unless another task already did (`force` skips
    /// that check). Readers wait on the lock meanwhile.
    async fn refresh(&self, source: &dyn AdminSource, force: bool) -> Result<Arc<AdminRoster>, RosterError> {
        let mut state = self.state.write().await;
        if state.cached && !force {
            return Ok(Arc::clone(&state.roster));
        }

        let members = source.chat_administrators(self.chat_id).await?;
        state.roster = Arc::new(AdminRoster::build(self.chat_id, members));
        state.cached = true;

        debug!("Refreshed admin roster for chat {} ({} admins)", self.chat_id, state.roster.len());
        Ok(Arc::clone(&state.roster))
    }

    async fn invalidate(&self) {
        self.state.write().await.cached = false;
    }
}

/// All roster slots, keyed by chat id.
#[derive(Clone)]
pub struct AdminRosterCache {
    slots: TypedCache<i64, Arc<RosterSlot>>,
    source: Arc<dyn AdminSource>,
}

impl AdminRosterCache {
    pub fn new(source: Arc<dyn AdminSource>, config: CacheConfig) -> Self {
        Self {
            slots: TypedCache::new("admin_rosters", config),
            source,
        }
    }

    fn slot(&self, chat_id: i64) -> Arc<RosterSlot> {
        self.slots
            .get_or_insert_with(chat_id, || Arc::new(RosterSlot::new(chat_id)))
    }

    /// Administrators of `chat_id`, refreshing first if the slot is empty or
    /// invalidated.
    pub async fn get(&self, chat_id: i64) -> Result<Arc<AdminRoster>, RosterError> {
        let slot = self.slot(chat_id);
        if let Some(roster) = slot.cached().await {
            return Ok(roster);
        }
        slot.refresh(self.source.as_ref(), false).await
    }

    /// Rebuild the roster now, even if it is valid.
    pub async fn refresh(&self, chat_id: i64) -> Result<Arc<AdminRoster>, RosterError> {
        self.slot(chat_id).refresh(self.source.as_ref(), true).await
    }

    /// Mark the roster stale. The next `get` rebuilds it.
    pub async fn invalidate(&self, chat_id: i64) {
        if let Some(slot) = self.slots.get(&chat_id) {
            slot.invalidate().await;
            debug!("Invalidated admin roster for chat {}", chat_id);
        }
    }
}

impl std::fmt::Debug for AdminRosterCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminRosterCache")
            .field("slots", &self.slots)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::*;

    /// Source whose roster grows by one admin on every fetch (mod 5).
    #[derive(Default)]
    pub(crate) struct FakeAdmins {
        pub calls: AtomicU64,
        pub failing: AtomicBool,
    }

    #[async_trait]
    impl AdminSource for FakeAdmins {
        async fn chat_administrators(&self, chat_id: i64) -> Result<Vec<AdminMember>, RosterError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(RosterError::Unavailable("down".to_string()));
            }
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(1)).await;

            let mut members = vec![AdminMember::owner(chat_id.unsigned_abs(), "owner")];
            for i in 0..(call % 5) {
                let mut admin = AdminMember::owner(1_000 + i, format!("admin{i}"));
                admin.is_owner = false;
                admin.can_promote_members = false;
                members.push(admin);
            }
            Ok(members)
        }
    }

    fn cache() -> (AdminRosterCache, Arc<FakeAdmins>) {
        let source = Arc::new(FakeAdmins::default());
        (AdminRosterCache::new(source.clone(), CacheConfig::admin_rosters()), source)
    }

    #[tokio::test]
    async fn test_first_get_fetches_once() {
        let (rosters, source) = cache();

        let roster = rosters.get(-100).await.unwrap();
        assert_eq!(roster.chat_id(), -100);
        assert_eq!(roster.len(), 1);
        assert!(roster.get(100).unwrap().is_owner);

        rosters.get(-100).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_triggers_rebuild() {
        let (rosters, source) = cache();

        rosters.get(-1).await.unwrap();
        rosters.invalidate(-1).await;
        let roster = rosters.get(-1).await.unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(roster.len(), 2);
        assert!(roster.contains(1_000));
    }

    #[tokio::test]
    async fn test_invalidate_unknown_chat_is_noop() {
        let (rosters, source) = cache();
        rosters.invalidate(-5).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_refresh_stays_invalid() {
        let (rosters, source) = cache();
        source.failing.store(true, Ordering::SeqCst);

        assert_matches!(rosters.get(-1).await, Err(RosterError::Unavailable(_)));

        source.failing.store(false, Ordering::SeqCst);
        assert_eq!(rosters.get(-1).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_never_see_partial_roster() {
        let (rosters, _) = cache();
        let chat_id = -42;

        let mut readers = Vec::new();
        for _ in 0..8 {
            let rosters = rosters.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..200 {
                    let roster = rosters.get(chat_id).await.unwrap();
                    assert_eq!(roster.len(), roster.index_len());
                    for member in roster.members() {
                        assert_eq!(roster.get(member.user_id), Some(member));
                    }
                    tokio::task::yield_now().await;
                }
            }));
        }

        let writer = {
            let rosters = rosters.clone();
            tokio::spawn(async move {
                for i in 0..50 {
                    rosters.invalidate(chat_id).await;
                    if i % 2 == 0 {
                        rosters.refresh(chat_id).await.unwrap();
                    }
                    tokio::task::yield_now().await;
                }
            })
        };

        for reader in readers {
            reader.await.unwrap();
        }
        writer.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_cold_readers_share_one_fetch() {
        let (rosters, source) = cache();

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let rosters = rosters.clone();
                tokio::spawn(async move { rosters.get(-7).await.unwrap().len() })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap(), 1);
        }

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_build_drops_duplicate_ids() {
        let mut first = AdminMember::owner(1, "first");
        first.is_owner = false;
        let listed = vec![
            first.clone(),
            AdminMember::owner(2, "owner"),
            AdminMember::owner(1, "again"),
        ];

        let roster = AdminRoster::build(-1, listed);
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.len(), roster.index_len());
        assert_eq!(roster.get(1), Some(&first));
        assert!(roster.get(2).unwrap().is_owner);
    }
}
