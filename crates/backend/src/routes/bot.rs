//! Discord bot flow endpoints.
//!
//! The bot walks a user through server choice, Steam linking, and a
//! simplified VIP purchase. Durable state lives in the bot store
//! (`users.json`); transient flow state lives in the TTL session cache.
//! This path grants VIP on the bot user record directly and is not
//! reconciled with the per-instance entitlement ledger.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use vip_core::{DiscordId, ServerInstance, VipType};

use crate::error::{AppError, Result};
use crate::models::{BotPayment, BotPaymentStatus};
use crate::state::AppState;

/// Statuses that approve a bot-side payment; everything else fails it.
const APPROVAL_STATUSES: [&str; 3] = ["approved", "paid", "confirmed"];

/// Routes mounted under `/api/bot`, all behind the bot bearer token.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/server", post(save_server))
        .route("/steam-link", post(create_steam_link))
        .route("/purchases", post(create_vip_purchase))
        .route("/webhook", post(payment_webhook))
        .route("/session", get(get_session))
}

fn parse_discord_id(raw: &str) -> Result<DiscordId> {
    DiscordId::parse(raw).map_err(|e| AppError::Validation(e.to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveServerRequest {
    pub discord_id: String,
    pub server: String,
}

/// Persist the user's server choice and mirror it into the flow session.
#[instrument(skip_all)]
pub async fn save_server(
    State(state): State<AppState>,
    Json(body): Json<SaveServerRequest>,
) -> Result<Json<serde_json::Value>> {
    let discord_id = parse_discord_id(&body.discord_id)?;
    let instance: ServerInstance = body.server.parse()?;

    let user = state
        .bot_store()
        .upsert_user(&discord_id, |user| {
            user.server = Some(instance);
        })
        .await?;

    state
        .sessions()
        .update(&discord_id, |session| session.server = Some(instance));

    Ok(Json(json!({
        "message": "Server choice saved.",
        "user": user,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SteamLinkRequest {
    pub discord_id: String,
}

/// Hand out a Steam OpenID login URL for this flow.
///
/// Falls back to the backend's own auth route if the OpenID URL cannot be
/// built, so the bot always has something to show the user.
#[instrument(skip_all)]
pub async fn create_steam_link(
    State(state): State<AppState>,
    Json(body): Json<SteamLinkRequest>,
) -> Result<Json<serde_json::Value>> {
    let discord_id = parse_discord_id(&body.discord_id)?;

    let auth_url = state.steam().auth_url().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "steam auth url failed, using backend route");
        format!(
            "{}/api/auth/steam",
            state.config().base_url.trim_end_matches('/')
        )
    });

    state.bot_store().upsert_user(&discord_id, |_| {}).await?;
    state.sessions().update(&discord_id, |session| {
        session.steam_auth_url = Some(auth_url.clone());
    });

    Ok(Json(json!({ "authUrl": auth_url })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotPurchaseRequest {
    pub discord_id: String,
    #[serde(rename = "type")]
    pub vip_type: String,
}

/// Open a pending bot-side payment for a VIP tier.
///
/// The user must have picked a server first; the grant itself happens when
/// the payment webhook confirms. An unknown `discordId` gets a blank record
/// created on the spot, so the only precondition error is the missing
/// server choice.
#[instrument(skip_all)]
pub async fn create_vip_purchase(
    State(state): State<AppState>,
    Json(body): Json<BotPurchaseRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let discord_id = parse_discord_id(&body.discord_id)?;
    let vip_type = match body.vip_type.as_str() {
        "vip" => VipType::Vip,
        "vip+" => VipType::VipPlus,
        other => {
            return Err(AppError::Validation(format!(
                "type must be 'vip' or 'vip+', got '{other}'"
            )));
        }
    };

    // The upsert persists even when the request then fails on the
    // missing server choice.
    let user = state.bot_store().upsert_user(&discord_id, |_| {}).await?;
    if user.server.is_none() {
        return Err(AppError::ServerNotSelected);
    }

    let payment = state
        .bot_store()
        .with_transaction::<_, AppError, _>(|doc| {
            let payment = BotPayment {
                order_id: bot_order_id(),
                discord_id: discord_id.clone(),
                vip_type,
                status: BotPaymentStatus::Pending,
                created_at: Utc::now(),
                updated_at: None,
            };
            doc.payments.push(payment.clone());
            Ok(payment)
        })
        .await?;

    tracing::info!(order_id = %payment.order_id, "bot payment opened");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Payment created.",
            "payment": payment,
        })),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotWebhookRequest {
    pub order_id: String,
    pub status: String,
    pub discord_id: String,
    #[serde(rename = "type")]
    pub vip_type: String,
}

/// Settle a bot-side payment, located by (orderId, discordId, type).
///
/// An approval status sets `vip` and a flat 30-day `vipExpiresAt` on the
/// bot user record; any other status fails the payment.
#[instrument(skip_all)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    Json(body): Json<BotWebhookRequest>,
) -> Result<Json<serde_json::Value>> {
    if body.order_id.trim().is_empty() {
        return Err(AppError::Validation("orderId must not be empty".to_owned()));
    }
    let discord_id = parse_discord_id(&body.discord_id)?;
    let status = body.status.to_lowercase();
    if status.trim().is_empty() {
        return Err(AppError::Validation("status must not be empty".to_owned()));
    }

    let approved = APPROVAL_STATUSES.contains(&status.as_str());
    let replay_guard = state.config().webhook_replay_protection;

    let (payment, user) = state
        .bot_store()
        .with_transaction::<_, AppError, _>(move |doc| {
            let pos = doc
                .payments
                .iter()
                .position(|p| {
                    p.order_id == body.order_id
                        && p.discord_id == discord_id
                        && p.vip_type.as_str() == body.vip_type
                })
                .ok_or(AppError::PaymentNotFound)?;

            let now = Utc::now();
            let already_approved = doc.payments[pos].status == BotPaymentStatus::Approved;

            if approved && replay_guard && already_approved {
                let payment = doc.payments[pos].clone();
                let user = doc.find_user(&discord_id).cloned();
                return Ok((payment, user));
            }

            doc.payments[pos].status = if approved {
                BotPaymentStatus::Approved
            } else {
                BotPaymentStatus::Failed
            };
            doc.payments[pos].updated_at = Some(now);
            let payment = doc.payments[pos].clone();

            let user = if approved {
                let vip_type = payment.vip_type;
                let user = doc
                    .find_user_mut(&discord_id)
                    .ok_or(AppError::UserNotFound)?;

                user.vip = Some(vip_type);
                user.vip_expires_at = Some(now + Duration::days(vip_type.duration_days()));
                user.updated_at = now;
                Some(user.clone())
            } else {
                doc.find_user(&discord_id).cloned()
            };

            Ok((payment, user))
        })
        .await?;

    if approved {
        state.sessions().remove(&payment.discord_id);
    }

    Ok(Json(json!({
        "message": if approved { "Payment approved." } else { "Payment failed." },
        "payment": payment,
        "user": user,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionQuery {
    pub discord_id: Option<String>,
}

/// Current flow session plus the persisted bot user record.
#[instrument(skip_all)]
pub async fn get_session(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<serde_json::Value>> {
    let raw = query
        .discord_id
        .ok_or_else(|| AppError::Validation("discordId query parameter is required".to_owned()))?;
    let discord_id = parse_discord_id(&raw)?;

    let session = state.sessions().get(&discord_id);
    let user = state.bot_store().read().await?.find_user(&discord_id).cloned();

    let session = session.map(|s| {
        json!({
            "server": s.server,
            "steamId64": s.steam_id64,
            "steamAuthUrl": s.steam_auth_url,
        })
    });

    Ok(Json(json!({
        "session": session,
        "user": user,
    })))
}

/// Order id for bot-side payments: `VIP-{epochMillis}-{8 hex chars}`.
fn bot_order_id() -> String {
    let mut buf = uuid::Uuid::encode_buffer();
    let simple = uuid::Uuid::new_v4().simple().encode_lower(&mut buf);
    let suffix: String = simple.chars().take(8).collect();
    format!("VIP-{}-{}", Utc::now().timestamp_millis(), suffix)
}
