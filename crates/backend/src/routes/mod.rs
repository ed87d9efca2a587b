//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /api/health                       - Health check
//!
//! # Steam auth & linking
//! GET  /api/auth/steam                   - Steam OpenID login URL
//! GET  /api/auth/steam/return            - OpenID return (assertion check)
//! POST /api/auth/link-discord-steam      - Manual Discord<->Steam link
//!
//! # Checkout & reconciliation
//! POST /api/checkout                     - Create checkout + pending purchase
//! POST /api/webhooks/infinitepay         - Payment status notifications
//!
//! # Queries
//! GET  /api/servers/{server}/users       - User + VIP + purchase lookup
//! GET  /api/servers/{server}/purchases   - Purchase history
//! GET  /api/plugin/{server}/vip-status   - VIP gate for the game plugin (token)
//! GET  /api/discord/{server}/users       - User lookup for the bridge (token)
//!
//! # Bot flow (bearer token)
//! POST /api/bot/server                   - Persist server choice
//! POST /api/bot/steam-link               - Steam OpenID URL for the flow
//! POST /api/bot/purchases                - Simplified VIP purchase
//! POST /api/bot/webhook                  - Bot-side payment notification
//! GET  /api/bot/session                  - Current flow + persisted state
//! ```

pub mod auth;
pub mod bot;
pub mod checkout;
pub mod servers;
pub mod webhooks;

use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::middleware;
use crate::state::AppState;

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/steam", get(auth::start_steam_auth))
        .route("/api/auth/steam/return", get(auth::steam_return))
        .route("/api/auth/link-discord-steam", post(auth::link_discord_steam))
        .route("/api/checkout", post(checkout::create_checkout))
        .route("/api/webhooks/infinitepay", post(webhooks::infinitepay_webhook))
        .route("/api/servers/{server}/users", get(servers::get_user_by_steam))
        .route(
            "/api/servers/{server}/purchases",
            get(servers::get_purchase_history),
        )
        .route(
            "/api/plugin/{server}/vip-status",
            get(servers::get_vip_for_plugin),
        )
        .route("/api/discord/{server}/users", get(servers::get_user_by_steam))
        .nest("/api/bot", bot::router())
        .fallback(not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::authorize,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "service": "vip-backend",
        "status": "ok",
        "timestamp": Utc::now(),
    }))
}

/// JSON body for unmatched routes, same shape as the error taxonomy.
async fn not_found() -> (axum::http::StatusCode, Json<serde_json::Value>) {
    (
        axum::http::StatusCode::NOT_FOUND,
        Json(json!({
            "error": "not_found",
            "message": "route not found",
        })),
    )
}
