//! Per-server-instance document and its record types.
//!
//! Each game-server instance persists one JSON document with four
//! collections. Field names are camelCase on disk so documents written by
//! earlier deployments stay readable, and `#[serde(default)]` lets a
//! collection added later materialize as empty when absent from an older
//! file.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use vip_core::{DiscordId, OrderNsu, SteamId64, VipType};

/// The whole-document unit of persistence for one server instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Document {
    pub users: Vec<User>,
    pub vips: Vec<VipEntitlement>,
    pub purchases: Vec<Purchase>,
    pub discord_steam_links: Vec<DiscordSteamLink>,
}

impl Document {
    /// Find a user by Steam identity.
    #[must_use]
    pub fn find_user(&self, steam_id: &SteamId64) -> Option<&User> {
        self.users.iter().find(|u| &u.steam_id64 == steam_id)
    }

    /// Upsert a user keyed by SteamID64; the Discord ID is last-write-wins.
    pub fn upsert_user(&mut self, steam_id: &SteamId64, discord_id: &DiscordId) {
        let now = Utc::now();
        if let Some(user) = self.users.iter_mut().find(|u| &u.steam_id64 == steam_id) {
            user.discord_id = discord_id.clone();
            user.updated_at = now;
        } else {
            self.users.push(User {
                steam_id64: steam_id.clone(),
                discord_id: discord_id.clone(),
                created_at: now,
                updated_at: now,
            });
        }
    }

    /// Find the entitlement for a (steamId64, vipType) pair, if any.
    #[must_use]
    pub fn find_vip_mut(
        &mut self,
        steam_id: &SteamId64,
        vip_type: VipType,
    ) -> Option<&mut VipEntitlement> {
        self.vips
            .iter_mut()
            .find(|v| &v.steam_id64 == steam_id && v.vip_type == vip_type)
    }

    /// Find a purchase by order reference.
    #[must_use]
    pub fn find_purchase(&self, order_nsu: &OrderNsu) -> Option<&Purchase> {
        self.purchases.iter().find(|p| &p.order_nsu == order_nsu)
    }

    /// Find a purchase by order reference, mutably.
    #[must_use]
    pub fn find_purchase_mut(&mut self, order_nsu: &OrderNsu) -> Option<&mut Purchase> {
        self.purchases
            .iter_mut()
            .find(|p| &p.order_nsu == order_nsu)
    }
}

/// A player known to one server instance.
///
/// Keyed by SteamID64; one Steam identity maps to at most one live record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub steam_id64: SteamId64,
    pub discord_id: DiscordId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A time-boxed VIP grant.
///
/// At most one entitlement exists per (steamId64, vipType) pair; renewals
/// mutate it in place. Expiry is evaluated lazily at query time - records
/// are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VipEntitlement {
    pub steam_id64: SteamId64,
    pub vip_type: VipType,
    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: String,
    pub order_nsu: OrderNsu,
    pub updated_at: DateTime<Utc>,
}

impl VipEntitlement {
    /// Stored status value for a live entitlement.
    pub const STATUS_ACTIVE: &'static str = "active";

    /// Whether this entitlement currently grants the perk.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == Self::STATUS_ACTIVE && self.expires_at > now
    }
}

/// A checkout attempt and its reconciliation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub order_nsu: OrderNsu,
    pub steam_id64: SteamId64,
    pub discord_id: DiscordId,
    pub vip_type: VipType,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub description: String,
    pub status: PurchaseStatus,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Purchase status, with passthrough for provider statuses outside the
/// confirmation set.
///
/// The provider may report statuses this system does not model
/// (`chargeback`, `refunded`, ...); those are stored verbatim and round-trip
/// unchanged, without triggering entitlement logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PurchaseStatus {
    PendingPayment,
    Paid,
    Other(String),
}

impl PurchaseStatus {
    /// Whether the purchase has been confirmed and credited.
    #[must_use]
    pub const fn is_paid(&self) -> bool {
        matches!(self, Self::Paid)
    }

    /// The stored string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::PendingPayment => "pending_payment",
            Self::Paid => "paid",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for PurchaseStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending_payment" => Self::PendingPayment,
            "paid" => Self::Paid,
            _ => Self::Other(s),
        }
    }
}

impl From<PurchaseStatus> for String {
    fn from(status: PurchaseStatus) -> Self {
        status.as_str().to_owned()
    }
}

/// A manual Discord<->Steam link, independent of purchase-driven linking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscordSteamLink {
    pub discord_id: DiscordId,
    pub steam_id64: SteamId64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_deserializes_from_empty_object() {
        let doc: Document = serde_json::from_str("{}").expect("deserialize");
        assert!(doc.users.is_empty());
        assert!(doc.vips.is_empty());
        assert!(doc.purchases.is_empty());
        assert!(doc.discord_steam_links.is_empty());
    }

    #[test]
    fn purchase_status_round_trips_unknown_strings() {
        let status: PurchaseStatus =
            serde_json::from_str("\"chargeback\"").expect("deserialize");
        assert_eq!(status, PurchaseStatus::Other("chargeback".to_owned()));
        assert_eq!(
            serde_json::to_string(&status).expect("serialize"),
            "\"chargeback\""
        );
    }

    #[test]
    fn purchase_status_known_values() {
        let status: PurchaseStatus = serde_json::from_str("\"paid\"").expect("deserialize");
        assert!(status.is_paid());
        let status: PurchaseStatus =
            serde_json::from_str("\"pending_payment\"").expect("deserialize");
        assert_eq!(status, PurchaseStatus::PendingPayment);
    }

    #[test]
    fn upsert_user_is_last_write_wins_on_discord_id() {
        let steam = SteamId64::parse("76561198000000000").expect("valid id");
        let first = DiscordId::parse("discord-one").expect("valid id");
        let second = DiscordId::parse("discord-two").expect("valid id");

        let mut doc = Document::default();
        doc.upsert_user(&steam, &first);
        doc.upsert_user(&steam, &second);

        assert_eq!(doc.users.len(), 1);
        assert_eq!(doc.users[0].discord_id, second);
    }

    #[test]
    fn entitlement_activity_requires_status_and_future_expiry() {
        let now = Utc::now();
        let steam = SteamId64::parse("76561198000000000").expect("valid id");
        let mut vip = VipEntitlement {
            steam_id64: steam,
            vip_type: VipType::Vip,
            starts_at: now,
            expires_at: now + chrono::Duration::days(1),
            status: VipEntitlement::STATUS_ACTIVE.to_owned(),
            order_nsu: OrderNsu::from_raw("SOLO-1-aaaaaaaa"),
            updated_at: now,
        };
        assert!(vip.is_active_at(now));

        vip.expires_at = now - chrono::Duration::seconds(1);
        assert!(!vip.is_active_at(now));
    }
}
