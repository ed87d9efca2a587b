//! Declarative route authorization.
//!
//! A single policy table maps path prefixes to the credential each caller
//! class must present. One middleware consults it for every request, so
//! adding a protected surface means adding a table row, not sprinkling a
//! token comparison into another handler.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use secrecy::{ExposeSecret, SecretString};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::state::AppState;

/// Header carrying a shared service secret.
pub const SERVICE_TOKEN_HEADER: &str = "x-service-token";

/// Machine callers holding a shared service secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceCaller {
    /// The in-game plugin querying VIP status.
    GamePlugin,
    /// The Discord bridge reading user records.
    DiscordBridge,
}

/// Credential a route prefix requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredAuth {
    /// No credential.
    Public,
    /// `x-service-token` matching the caller's configured secret.
    ServiceToken(ServiceCaller),
    /// `Authorization: Bearer` matching the bot API token.
    BotBearer,
}

/// The capability table. Longest matching prefix wins; unlisted paths are
/// public.
const POLICY: &[(&str, RequiredAuth)] = &[
    ("/api/plugin", RequiredAuth::ServiceToken(ServiceCaller::GamePlugin)),
    ("/api/discord", RequiredAuth::ServiceToken(ServiceCaller::DiscordBridge)),
    ("/api/bot", RequiredAuth::BotBearer),
];

/// Resolve the credential required for a request path.
#[must_use]
pub fn required_for(path: &str) -> RequiredAuth {
    POLICY
        .iter()
        .filter(|(prefix, _)| path.starts_with(prefix))
        .max_by_key(|(prefix, _)| prefix.len())
        .map_or(RequiredAuth::Public, |(_, required)| *required)
}

/// Authorization middleware applied to the whole router.
///
/// # Errors
///
/// Returns [`AppError::Unauthorized`] on a missing or mismatched
/// credential and [`AppError::Misconfigured`] when the expected secret is
/// absent on the backend side.
pub async fn authorize(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    check_credentials(
        required_for(request.uri().path()),
        request.headers(),
        state.config(),
    )?;
    Ok(next.run(request).await)
}

/// Validate the request headers against the required credential.
fn check_credentials(
    required: RequiredAuth,
    headers: &HeaderMap,
    config: &AppConfig,
) -> Result<(), AppError> {
    match required {
        RequiredAuth::Public => Ok(()),
        RequiredAuth::ServiceToken(caller) => {
            let expected = expected_service_token(caller, config).ok_or_else(|| {
                AppError::Misconfigured(format!(
                    "service token for {caller:?} is not configured"
                ))
            })?;

            let provided = headers
                .get(SERVICE_TOKEN_HEADER)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| AppError::Unauthorized("missing service token".to_owned()))?;

            if provided == expected.expose_secret() {
                Ok(())
            } else {
                Err(AppError::Unauthorized("invalid service token".to_owned()))
            }
        }
        RequiredAuth::BotBearer => {
            let expected = config.bot_api_token.as_ref().ok_or_else(|| {
                AppError::Misconfigured("BOT_API_TOKEN is not configured".to_owned())
            })?;

            let header = headers
                .get(axum::http::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();

            let token = header
                .strip_prefix("Bearer ")
                .ok_or_else(|| AppError::Unauthorized("invalid Authorization header".to_owned()))?
                .trim();

            if token == expected.expose_secret() {
                Ok(())
            } else {
                Err(AppError::Unauthorized("invalid bearer token".to_owned()))
            }
        }
    }
}

fn expected_service_token<'a>(
    caller: ServiceCaller,
    config: &'a AppConfig,
) -> Option<&'a SecretString> {
    match caller {
        ServiceCaller::GamePlugin => config.rust_plugin_token.as_ref(),
        ServiceCaller::DiscordBridge => config.discord_service_token.as_ref(),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            host: "127.0.0.1".parse().expect("valid ip"),
            port: 3000,
            base_url: "http://localhost:3000".to_owned(),
            data_dir: std::path::PathBuf::from("./data"),
            steam_api_key: None,
            infinitepay_api_token: None,
            infinitepay_webhook_secret: None,
            discord_service_token: Some(SecretString::from("discord-secret-token")),
            rust_plugin_token: Some(SecretString::from("plugin-secret-token")),
            bot_api_token: Some(SecretString::from("bot-bearer-token-16ch")),
            webhook_replay_protection: true,
        }
    }

    #[test]
    fn policy_table_lookup() {
        assert_eq!(
            required_for("/api/plugin/solo/vip-status"),
            RequiredAuth::ServiceToken(ServiceCaller::GamePlugin)
        );
        assert_eq!(
            required_for("/api/discord/duo/users"),
            RequiredAuth::ServiceToken(ServiceCaller::DiscordBridge)
        );
        assert_eq!(required_for("/api/bot/purchases"), RequiredAuth::BotBearer);
        assert_eq!(required_for("/api/checkout"), RequiredAuth::Public);
        assert_eq!(required_for("/api/health"), RequiredAuth::Public);
    }

    #[test]
    fn service_token_must_match() {
        let config = config();
        let mut headers = HeaderMap::new();

        let required = RequiredAuth::ServiceToken(ServiceCaller::GamePlugin);
        assert!(matches!(
            check_credentials(required, &headers, &config),
            Err(AppError::Unauthorized(_))
        ));

        headers.insert(
            SERVICE_TOKEN_HEADER,
            HeaderValue::from_static("wrong-token"),
        );
        assert!(matches!(
            check_credentials(required, &headers, &config),
            Err(AppError::Unauthorized(_))
        ));

        headers.insert(
            SERVICE_TOKEN_HEADER,
            HeaderValue::from_static("plugin-secret-token"),
        );
        assert!(check_credentials(required, &headers, &config).is_ok());
    }

    #[test]
    fn unconfigured_expected_token_is_a_server_error() {
        let mut config = config();
        config.rust_plugin_token = None;
        let headers = HeaderMap::new();

        assert!(matches!(
            check_credentials(
                RequiredAuth::ServiceToken(ServiceCaller::GamePlugin),
                &headers,
                &config
            ),
            Err(AppError::Misconfigured(_))
        ));
    }

    #[test]
    fn bearer_token_requires_scheme_prefix() {
        let config = config();
        let mut headers = HeaderMap::new();

        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("bot-bearer-token-16ch"),
        );
        assert!(matches!(
            check_credentials(RequiredAuth::BotBearer, &headers, &config),
            Err(AppError::Unauthorized(_))
        ));

        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer bot-bearer-token-16ch"),
        );
        assert!(check_credentials(RequiredAuth::BotBearer, &headers, &config).is_ok());
    }
}
