//! Unified error handling.
//!
//! Provides a single `AppError` type mapping the error taxonomy to HTTP
//! status codes and a stable JSON body `{ "error": <code>, "message":
//! <text> }`. All route handlers return `Result<T, AppError>`. Internal
//! detail is logged, never exposed to clients.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use vip_core::InvalidInstance;

use crate::db::StoreError;
use crate::services::payments::PaymentError;
use crate::services::steam::SteamError;

/// Application-level error type for the backend.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed request input, rejected before persistence or upstream
    /// calls.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown server instance key.
    #[error(transparent)]
    InvalidInstance(#[from] InvalidInstance),

    /// SteamID64 rejected by the Steam Web API.
    #[error("steamId64 not recognized by the Steam Web API")]
    InvalidSteamId,

    /// Missing or mismatched credential.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Webhook signature did not match the configured secret.
    #[error("webhook signature mismatch")]
    InvalidSignature,

    /// No user record for the given Steam identity.
    #[error("user not found")]
    UserNotFound,

    /// No purchase matches the order reference in any instance.
    #[error("order reference not found")]
    OrderNotFound,

    /// No bot-side payment matches the given order id.
    #[error("payment not found")]
    PaymentNotFound,

    /// Bot purchase attempted before a server was selected.
    #[error("no server selected for this user")]
    ServerNotSelected,

    /// Persistence failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Steam collaborator failure.
    #[error("steam error: {0}")]
    Steam(#[from] SteamError),

    /// Payment collaborator failure.
    #[error("payment provider error: {0}")]
    Payment(#[from] PaymentError),

    /// A required credential or setting is absent on the backend side.
    #[error("misconfigured: {0}")]
    Misconfigured(String),
}

/// Stable JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl AppError {
    /// Stable machine-readable code for the client.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::InvalidInstance(_) => "invalid_instance",
            Self::InvalidSteamId => "invalid_steam_id",
            Self::Unauthorized(_) => "unauthorized",
            Self::InvalidSignature => "invalid_signature",
            Self::UserNotFound => "user_not_found",
            Self::OrderNotFound => "order_not_found",
            Self::PaymentNotFound => "payment_not_found",
            Self::ServerNotSelected => "server_not_selected",
            Self::Store(_) => "internal_error",
            Self::Steam(_) | Self::Payment(_) => "upstream_error",
            Self::Misconfigured(_) => "misconfigured",
        }
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::InvalidInstance(_)
            | Self::InvalidSteamId
            | Self::ServerNotSelected => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) | Self::InvalidSignature => StatusCode::UNAUTHORIZED,
            Self::UserNotFound | Self::OrderNotFound | Self::PaymentNotFound => {
                StatusCode::NOT_FOUND
            }
            Self::Store(_) | Self::Steam(_) | Self::Payment(_) | Self::Misconfigured(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Store(_) | Self::Misconfigured(_)) {
            tracing::error!(error = %self, "request error");
        } else if matches!(self, Self::Steam(_) | Self::Payment(_)) {
            tracing::warn!(error = %self, "upstream collaborator error");
        }

        // Store failures keep their detail in the logs only; upstream
        // errors pass the provider's status/message through.
        let message = match &self {
            Self::Store(_) => "internal server error".to_owned(),
            other => other.to_string(),
        };

        let body = ErrorBody {
            error: self.code(),
            message,
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
