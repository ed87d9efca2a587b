//! The VIP entitlement ledger.
//!
//! The one piece of this system with real behavioral contracts:
//!
//! - at most one entitlement per (steamId64, vipType); renewals mutate it
//!   in place
//! - stacking expiry: renewing a still-active entitlement appends the new
//!   validity period after the *existing* expiry; a lapsed one restarts
//!   from now
//! - `expiresAt` is therefore monotonically non-decreasing across renewals
//! - expiry is evaluated lazily at query time; nothing ever deletes a row

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use vip_core::{OrderNsu, ServerInstance, SteamId64, VipType};

use crate::db::JsonStore;
use crate::error::AppError;
use crate::models::VipEntitlement;

/// Result of a successful activation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activation {
    pub steam_id64: SteamId64,
    pub vip_type: VipType,
    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub order_nsu: OrderNsu,
}

/// Ledger operations over a [`JsonStore`].
pub struct VipLedger<'a> {
    store: &'a JsonStore,
}

impl<'a> VipLedger<'a> {
    /// Create a ledger over the given store.
    #[must_use]
    pub const fn new(store: &'a JsonStore) -> Self {
        Self { store }
    }

    /// Grant or extend a VIP entitlement for a confirmed purchase.
    ///
    /// Runs as one read-modify-write transaction. The user must already
    /// exist in the instance (checkout creation upserts it).
    ///
    /// # Errors
    ///
    /// Returns [`AppError::UserNotFound`] if no user record exists for the
    /// Steam identity, or a store error if persistence fails.
    pub async fn activate(
        &self,
        instance: ServerInstance,
        steam_id: SteamId64,
        vip_type: VipType,
        order_nsu: OrderNsu,
    ) -> Result<Activation, AppError> {
        let now = Utc::now();

        self.store
            .with_transaction(instance, move |doc| {
                if doc.find_user(&steam_id).is_none() {
                    return Err(AppError::UserNotFound);
                }

                let starts_at = match doc.find_vip_mut(&steam_id, vip_type) {
                    Some(existing) if existing.expires_at > now => existing.expires_at,
                    _ => now,
                };
                let expires_at = starts_at + Duration::days(vip_type.duration_days());

                if let Some(existing) = doc.find_vip_mut(&steam_id, vip_type) {
                    existing.starts_at = starts_at;
                    existing.expires_at = expires_at;
                    existing.status = VipEntitlement::STATUS_ACTIVE.to_owned();
                    existing.order_nsu = order_nsu.clone();
                    existing.updated_at = now;
                } else {
                    doc.vips.push(VipEntitlement {
                        steam_id64: steam_id.clone(),
                        vip_type,
                        starts_at,
                        expires_at,
                        status: VipEntitlement::STATUS_ACTIVE.to_owned(),
                        order_nsu: order_nsu.clone(),
                        updated_at: now,
                    });
                }

                Ok(Activation {
                    steam_id64: steam_id,
                    vip_type,
                    starts_at,
                    expires_at,
                    order_nsu,
                })
            })
            .await
    }

    /// Entitlements currently granting a perk for this Steam identity.
    ///
    /// Filters on `status == "active"` *and* a future expiry; a record
    /// whose stored status is still "active" but whose expiry has passed
    /// is not returned.
    ///
    /// # Errors
    ///
    /// Returns a store error if the document cannot be read.
    pub async fn active_entitlements(
        &self,
        instance: ServerInstance,
        steam_id: &SteamId64,
    ) -> Result<Vec<VipEntitlement>, AppError> {
        let doc = self.store.read(instance).await?;
        let now = Utc::now();

        Ok(doc
            .vips
            .into_iter()
            .filter(|vip| &vip.steam_id64 == steam_id && vip.is_active_at(now))
            .collect())
    }
}
