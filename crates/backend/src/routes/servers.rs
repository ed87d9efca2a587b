//! Read-only query surface over the per-instance documents.
//!
//! Served both to the public site (`/api/servers/...`) and to machine
//! callers (`/api/plugin/...`, `/api/discord/...`), which reuse the same
//! handlers behind their own credentials.

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use vip_core::{ServerInstance, SteamId64};

use crate::error::{AppError, Result};
use crate::services::vip::VipLedger;
use crate::state::AppState;

/// Common `?steamId64=` query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SteamQuery {
    pub steam_id64: Option<String>,
}

fn parse_query(server: &str, query: SteamQuery) -> Result<(ServerInstance, SteamId64)> {
    let instance: ServerInstance = server.parse()?;
    let raw = query
        .steam_id64
        .ok_or_else(|| AppError::Validation("steamId64 query parameter is required".to_owned()))?;
    let steam_id = SteamId64::parse(&raw).map_err(|e| AppError::Validation(e.to_string()))?;
    Ok((instance, steam_id))
}

/// Full user view: record, live entitlements, and purchase history.
#[instrument(skip_all, fields(server = %server))]
pub async fn get_user_by_steam(
    State(state): State<AppState>,
    Path(server): Path<String>,
    Query(query): Query<SteamQuery>,
) -> Result<Json<serde_json::Value>> {
    let (instance, steam_id) = parse_query(&server, query)?;

    let doc = state.store().read(instance).await?;
    let user = doc.find_user(&steam_id).ok_or(AppError::UserNotFound)?.clone();

    let vips = VipLedger::new(state.store())
        .active_entitlements(instance, &steam_id)
        .await?;
    let purchases: Vec<_> = doc
        .purchases
        .iter()
        .filter(|p| p.steam_id64 == steam_id)
        .cloned()
        .collect();

    Ok(Json(json!({
        "user": user,
        "vip": vips,
        "purchases": purchases,
    })))
}

/// Purchase history for an instance, newest first. `?steamId64=` narrows
/// to one identity.
#[instrument(skip_all, fields(server = %server))]
pub async fn get_purchase_history(
    State(state): State<AppState>,
    Path(server): Path<String>,
    Query(query): Query<SteamQuery>,
) -> Result<Json<serde_json::Value>> {
    let instance: ServerInstance = server.parse()?;
    let steam_id = query
        .steam_id64
        .map(|raw| SteamId64::parse(&raw).map_err(|e| AppError::Validation(e.to_string())))
        .transpose()?;

    let doc = state.store().read(instance).await?;
    let mut purchases: Vec<_> = doc
        .purchases
        .into_iter()
        .filter(|p| steam_id.as_ref().is_none_or(|id| &p.steam_id64 == id))
        .collect();
    purchases.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(Json(json!({
        "server": instance,
        "total": purchases.len(),
        "purchases": purchases,
    })))
}

/// VIP gate for the in-game plugin: a compact yes/no plus the live tiers.
#[instrument(skip_all, fields(server = %server))]
pub async fn get_vip_for_plugin(
    State(state): State<AppState>,
    Path(server): Path<String>,
    Query(query): Query<SteamQuery>,
) -> Result<Json<serde_json::Value>> {
    let (instance, steam_id) = parse_query(&server, query)?;

    let vips = VipLedger::new(state.store())
        .active_entitlements(instance, &steam_id)
        .await?;

    let tiers: Vec<_> = vips
        .iter()
        .map(|vip| {
            json!({
                "vipType": vip.vip_type,
                "expiresAt": vip.expires_at,
            })
        })
        .collect();

    Ok(Json(json!({
        "steamId64": steam_id,
        "hasVip": !tiers.is_empty(),
        "vip": tiers,
        "checkedAt": Utc::now(),
    })))
}
