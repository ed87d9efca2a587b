//! Steam OpenID handshake and Discord<->Steam linking.

use std::collections::HashMap;

use axum::Json;
use axum::extract::{Query, State};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use vip_core::{DiscordId, ServerInstance, SteamId64};

use crate::error::{AppError, Result};
use crate::models::DiscordSteamLink;
use crate::state::AppState;

/// Start the Steam OpenID login flow.
pub async fn start_steam_auth(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let auth_url = state.steam().auth_url()?;
    Ok(Json(json!({ "authUrl": auth_url })))
}

/// OpenID return route: verify the assertion, then double-check the
/// extracted SteamID64 against the Steam Web API.
#[instrument(skip_all)]
pub async fn steam_return(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<serde_json::Value>> {
    let steam_id = state.steam().verify_assertion(&params).await?;

    if !state.steam().validate_steam_id64(&steam_id).await? {
        return Err(AppError::InvalidSteamId);
    }

    tracing::info!(steam_id = %steam_id, "steam authentication completed");
    Ok(Json(json!({
        "message": "Steam authentication completed.",
        "steamId64": steam_id,
    })))
}

/// Manual link request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRequest {
    pub server: String,
    pub discord_id: String,
    pub steam_id64: String,
}

/// Upsert a Discord<->Steam link, creating the user record if absent.
///
/// This is the legacy/manual linking path, independent of purchase-driven
/// linking: an existing user's Discord ID is deliberately left untouched.
#[instrument(skip_all, fields(discord_id = %body.discord_id))]
pub async fn link_discord_steam(
    State(state): State<AppState>,
    Json(body): Json<LinkRequest>,
) -> Result<Json<serde_json::Value>> {
    let instance: ServerInstance = body.server.parse()?;
    let discord_id =
        DiscordId::parse(&body.discord_id).map_err(|e| AppError::Validation(e.to_string()))?;
    let steam_id =
        SteamId64::parse(&body.steam_id64).map_err(|e| AppError::Validation(e.to_string()))?;

    if !state.steam().validate_steam_id64(&steam_id).await? {
        return Err(AppError::InvalidSteamId);
    }

    state
        .store()
        .with_transaction::<_, AppError, _>(instance, move |doc| {
            let now = Utc::now();

            if let Some(link) = doc
                .discord_steam_links
                .iter_mut()
                .find(|l| l.discord_id == discord_id)
            {
                link.steam_id64 = steam_id.clone();
                link.updated_at = now;
            } else {
                doc.discord_steam_links.push(DiscordSteamLink {
                    discord_id: discord_id.clone(),
                    steam_id64: steam_id.clone(),
                    created_at: now,
                    updated_at: now,
                });
            }

            if doc.find_user(&steam_id).is_none() {
                doc.upsert_user(&steam_id, &discord_id);
            }

            Ok(())
        })
        .await?;

    Ok(Json(json!({
        "message": "Discord <-> Steam link saved.",
    })))
}
