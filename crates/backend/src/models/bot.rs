//! Records for the Discord bot's simplified purchase flow.
//!
//! This is the second, independent VIP-granting path: the bot tracks a
//! single `vip`/`vipExpiresAt` pair per Discord user plus its own payment
//! rows, in one instance-independent document. Nothing here is reconciled
//! with the per-instance entitlement ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vip_core::{DiscordId, ServerInstance, VipType};

/// The bot-side document (`users.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BotStoreDocument {
    pub users: Vec<BotUser>,
    pub payments: Vec<BotPayment>,
}

impl BotStoreDocument {
    /// Find a bot user by Discord identity.
    #[must_use]
    pub fn find_user(&self, discord_id: &DiscordId) -> Option<&BotUser> {
        self.users.iter().find(|u| &u.discord_id == discord_id)
    }

    /// Find a bot user by Discord identity, mutably.
    #[must_use]
    pub fn find_user_mut(&mut self, discord_id: &DiscordId) -> Option<&mut BotUser> {
        self.users.iter_mut().find(|u| &u.discord_id == discord_id)
    }
}

/// A Discord user's bot-side state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotUser {
    pub discord_id: DiscordId,
    pub server: Option<ServerInstance>,
    pub steam_id: Option<String>,
    pub vip: Option<VipType>,
    pub vip_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BotUser {
    /// A fresh record with every flow field unset.
    #[must_use]
    pub fn new(discord_id: DiscordId) -> Self {
        let now = Utc::now();
        Self {
            discord_id,
            server: None,
            steam_id: None,
            vip: None,
            vip_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Status of a bot-side payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotPaymentStatus {
    Pending,
    Approved,
    Failed,
}

/// A payment row in the bot-side flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotPayment {
    pub order_id: String,
    pub discord_id: DiscordId,
    #[serde(rename = "type")]
    pub vip_type: VipType,
    pub status: BotPaymentStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}
