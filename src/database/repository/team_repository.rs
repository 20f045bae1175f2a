//! Bot team repository (sudo and dev users).
//!
//! Promotions and demotions can run in the background: the caller gets
//! control back immediately and failures only show up in the logs.

use std::collections::HashMap;
use std::sync::Arc;

use mongodb::bson::doc;
use tokio::task::JoinHandle;

use crate::database::context::StoreContext;
use crate::database::models::{TeamMember, TeamRole};
use crate::utils::spawn_background;

/// Repository for team membership.
#[derive(Debug, Clone)]
pub struct TeamRepository {
    ctx: StoreContext,
}

impl TeamRepository {
    pub fn new(ctx: StoreContext) -> Self {
        Self { ctx }
    }

    /// Team flags for a user. Never fails; unknown users have no role.
    pub async fn get(&self, user_id: i64) -> TeamMember {
        self.ctx.load(user_id).await
    }

    pub async fn add_sudo(&self, user_id: i64) -> TeamMember {
        self.ctx
            .mutate(user_id, "add_sudo", |m: &mut TeamMember| m.sudo = true)
            .await
    }

    pub async fn rem_sudo(&self, user_id: i64) -> TeamMember {
        self.ctx
            .mutate(user_id, "rem_sudo", |m: &mut TeamMember| m.sudo = false)
            .await
    }

    pub async fn add_dev(&self, user_id: i64) -> TeamMember {
        self.ctx
            .mutate(user_id, "add_dev", |m: &mut TeamMember| m.dev = true)
            .await
    }

    pub async fn rem_dev(&self, user_id: i64) -> TeamMember {
        self.ctx
            .mutate(user_id, "rem_dev", |m: &mut TeamMember| m.dev = false)
            .await
    }

    /// Run `change` without waiting for it.
    pub fn update_background(self: Arc<Self>, user_id: i64, change: TeamChange) -> JoinHandle<()> {
        spawn_background(change.op(), async move {
            match change {
                TeamChange::AddSudo => self.add_sudo(user_id).await,
                TeamChange::RemSudo => self.rem_sudo(user_id).await,
                TeamChange::AddDev => self.add_dev(user_id).await,
                TeamChange::RemDev => self.rem_dev(user_id).await,
            };
        })
    }

    /// Every user holding a team role, with their highest role.
    pub async fn members(&self) -> HashMap<i64, TeamRole> {
        let mut members = HashMap::new();

        for member in self.ctx.find_many::<TeamMember>(doc! { "sudo": true }).await {
            members.insert(member.user_id, TeamRole::Sudo);
        }
        for member in self.ctx.find_many::<TeamMember>(doc! { "dev": true }).await {
            members.insert(member.user_id, TeamRole::Dev);
        }

        members
    }

    /// (dev count, sudo count)
    pub async fn counts(&self) -> (u64, u64) {
        let devs = self.ctx.count::<TeamMember>(doc! { "dev": true }).await;
        let sudos = self.ctx.count::<TeamMember>(doc! { "sudo": true }).await;
        (devs, sudos)
    }
}

/// A single team flag change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamChange {
    AddSudo,
    RemSudo,
    AddDev,
    RemDev,
}

impl TeamChange {
    fn op(self) -> &'static str {
        match self {
            Self::AddSudo => "add_sudo",
            Self::RemSudo => "rem_sudo",
            Self::AddDev => "add_dev",
            Self::RemDev => "rem_dev",
        }
    }
}
