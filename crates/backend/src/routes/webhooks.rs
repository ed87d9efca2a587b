//! Payment webhook reconciliation.
//!
//! Matches asynchronous provider notifications back to the originating
//! purchase. The handler takes the raw body: the signature covers the
//! exact bytes on the wire, so parsing must happen after verification.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use vip_core::{OrderNsu, ServerInstance, SteamId64, VipType};

use crate::error::{AppError, Result};
use crate::models::PurchaseStatus;
use crate::services::payments::verify_webhook_signature;
use crate::services::vip::VipLedger;
use crate::state::AppState;

/// Header carrying the provider's HMAC signature.
pub const SIGNATURE_HEADER: &str = "x-infinitepay-signature";

/// Provider statuses that confirm payment and credit the ledger. Any other
/// status is recorded verbatim with no entitlement effect.
const CONFIRMATION_STATUSES: [&str; 3] = ["paid", "approved", "confirmed"];

/// Webhook notification payload. Required fields are typed strictly;
/// providers add fields freely, so unknown keys are ignored rather than
/// rejected.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub event: String,
    pub data: WebhookData,
}

/// The `data` object of a notification.
#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub status: String,
    pub external_reference: String,
    pub id: ProviderPaymentId,
}

/// Provider payment ids arrive as either a string or a number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ProviderPaymentId {
    Text(String),
    Number(serde_json::Number),
}

impl ProviderPaymentId {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

/// Outcome of the paid-transition transaction for one instance.
enum Confirmation {
    /// The purchase moved to `paid` in this call; the ledger owes a grant.
    Granted {
        steam_id: SteamId64,
        vip_type: VipType,
    },
    /// The purchase was already `paid`; a replay, nothing to grant.
    AlreadyProcessed,
    /// The purchase is not in this instance's document.
    Missing,
}

/// Reconcile a payment notification.
#[instrument(skip_all)]
pub async fn infinitepay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    if !verify_webhook_signature(
        state.config().infinitepay_webhook_secret.as_ref(),
        &body,
        signature,
    ) {
        return Err(AppError::InvalidSignature);
    }

    let payload: WebhookPayload = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("invalid webhook payload: {e}")))?;

    if payload.event.trim().is_empty() {
        return Err(AppError::Validation("event must not be empty".to_owned()));
    }
    if payload.data.status.trim().is_empty() {
        return Err(AppError::Validation("data.status must not be empty".to_owned()));
    }
    if payload.data.external_reference.trim().is_empty() {
        return Err(AppError::Validation(
            "data.external_reference must not be empty".to_owned(),
        ));
    }

    let order_nsu = OrderNsu::from_raw(payload.data.external_reference);
    let status = payload.data.status.to_lowercase();
    let payment_id = payload.data.id.into_string();
    let guard_replays = state.config().webhook_replay_protection;

    // The order reference encodes no instance authoritatively, so scan the
    // fixed instance set; the first one holding the purchase wins.
    for instance in ServerInstance::ALL {
        let doc = state.store().read(instance).await?;
        if doc.find_purchase(&order_nsu).is_none() {
            continue;
        }

        if CONFIRMATION_STATUSES.contains(&status.as_str()) {
            // The already-paid check and the transition to `paid` happen
            // inside one transaction, under the instance lock. Concurrent
            // duplicate deliveries serialize here; exactly one observes
            // the pending state and earns the grant.
            let transition = state
                .store()
                .with_transaction::<_, AppError, _>(instance, {
                    let order_nsu = order_nsu.clone();
                    let payment_id = payment_id.clone();
                    move |doc| {
                        let Some(target) = doc.find_purchase_mut(&order_nsu) else {
                            return Ok(Confirmation::Missing);
                        };
                        if guard_replays && target.status.is_paid() {
                            return Ok(Confirmation::AlreadyProcessed);
                        }
                        target.status = PurchaseStatus::Paid;
                        target.provider_payment_id = Some(payment_id);
                        target.updated_at = Utc::now();
                        Ok(Confirmation::Granted {
                            steam_id: target.steam_id64.clone(),
                            vip_type: target.vip_type,
                        })
                    }
                })
                .await?;

            let (steam_id, vip_type) = match transition {
                Confirmation::Missing => continue,
                Confirmation::AlreadyProcessed => {
                    tracing::info!(
                        order_nsu = %order_nsu,
                        "duplicate payment confirmation ignored"
                    );
                    return Ok(Json(json!({
                        "message": "Webhook already processed; entitlement unchanged.",
                    })));
                }
                Confirmation::Granted { steam_id, vip_type } => (steam_id, vip_type),
            };

            let activation = VipLedger::new(state.store())
                .activate(instance, steam_id, vip_type, order_nsu)
                .await?;

            tracing::info!(
                steam_id = %activation.steam_id64,
                vip_type = %activation.vip_type,
                expires_at = %activation.expires_at,
                "payment confirmed, VIP granted"
            );
            return Ok(Json(json!({
                "message": "Payment confirmed and VIP granted.",
                "vip": activation,
            })));
        }

        // Non-confirmation status: stored verbatim, no entitlement logic.
        state
            .store()
            .with_transaction::<_, AppError, _>(instance, {
                let order_nsu = order_nsu.clone();
                let status = status.clone();
                move |doc| {
                    if let Some(target) = doc.find_purchase_mut(&order_nsu) {
                        target.status = PurchaseStatus::from(status);
                        target.updated_at = Utc::now();
                    }
                    Ok(())
                }
            })
            .await?;

        return Ok(Json(json!({
            "message": "Webhook processed; no entitlement granted.",
        })));
    }

    Err(AppError::OrderNotFound)
}
