//! Backend configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional (with defaults)
//! - `HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` - Listen port (default: 3000)
//! - `BASE_URL` - Public URL of this backend (default: http://localhost:3000)
//! - `DATA_DIR` - Directory holding the JSON documents (default: ./data)
//! - `WEBHOOK_REPLAY_PROTECTION` - Guard against duplicate payment
//!   confirmations re-extending entitlements (default: true)
//!
//! ## Credentials (optional at load, checked at use)
//! - `STEAM_API_KEY` - Steam Web API key for identity validation
//! - `INFINITEPAY_API_TOKEN` - Payment provider API token
//! - `INFINITEPAY_WEBHOOK_SECRET` - Webhook HMAC secret; when unset,
//!   signature verification is skipped (trust-by-default)
//! - `DISCORD_SERVICE_TOKEN` - Shared secret for the Discord bridge routes
//! - `RUST_PLUGIN_TOKEN` - Shared secret for the game-server plugin routes
//! - `BOT_API_TOKEN` - Bearer token for the bot routes (min 16 chars)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

/// Minimum length accepted for the bot bearer token.
const MIN_BOT_TOKEN_LENGTH: usize = 16;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Backend application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// IP address to bind the server to.
    pub host: IpAddr,
    /// Port to listen on.
    pub port: u16,
    /// Public base URL, used to build the Steam OpenID return route.
    pub base_url: String,
    /// Directory holding the per-instance and bot JSON documents.
    pub data_dir: PathBuf,
    /// Steam Web API key.
    pub steam_api_key: Option<SecretString>,
    /// Payment provider API token.
    pub infinitepay_api_token: Option<SecretString>,
    /// Payment webhook HMAC secret; `None` skips signature verification.
    pub infinitepay_webhook_secret: Option<SecretString>,
    /// Shared secret expected from the Discord bridge.
    pub discord_service_token: Option<SecretString>,
    /// Shared secret expected from the game-server plugin.
    pub rust_plugin_token: Option<SecretString>,
    /// Bearer token expected from the bot routes.
    pub bot_api_token: Option<SecretString>,
    /// Whether a replayed payment confirmation may re-extend a VIP
    /// entitlement. On by default; disable to restore the legacy behavior.
    pub webhook_replay_protection: bool,
}

impl AppConfig {
    /// Load configuration from the environment (reading `.env` first).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is present but unparseable, or
    /// if `BOT_API_TOKEN` is set but too short to be a credible secret.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Missing .env is fine; real deployments set variables directly.
        dotenvy::dotenv().ok();

        let host: IpAddr = get_env_or_default("HOST", "127.0.0.1")
            .parse()
            .map_err(|e| ConfigError::InvalidEnvVar("HOST".to_owned(), format!("{e}")))?;

        let port: u16 = get_env_or_default("PORT", "3000")
            .parse()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_owned(), format!("{e}")))?;

        let webhook_replay_protection =
            match get_env_or_default("WEBHOOK_REPLAY_PROTECTION", "true").as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                other => {
                    return Err(ConfigError::InvalidEnvVar(
                        "WEBHOOK_REPLAY_PROTECTION".to_owned(),
                        format!("expected a boolean, got '{other}'"),
                    ));
                }
            };

        let bot_api_token = get_optional_secret("BOT_API_TOKEN");
        if let Some(token) = &bot_api_token {
            use secrecy::ExposeSecret;
            if token.expose_secret().len() < MIN_BOT_TOKEN_LENGTH {
                return Err(ConfigError::InsecureSecret(
                    "BOT_API_TOKEN".to_owned(),
                    format!("must be at least {MIN_BOT_TOKEN_LENGTH} characters"),
                ));
            }
        }

        Ok(Self {
            host,
            port,
            base_url: get_env_or_default("BASE_URL", "http://localhost:3000"),
            data_dir: PathBuf::from(get_env_or_default("DATA_DIR", "./data")),
            steam_api_key: get_optional_secret("STEAM_API_KEY"),
            infinitepay_api_token: get_optional_secret("INFINITEPAY_API_TOKEN"),
            infinitepay_webhook_secret: get_optional_secret("INFINITEPAY_WEBHOOK_SECRET"),
            discord_service_token: get_optional_secret("DISCORD_SERVICE_TOKEN"),
            rust_plugin_token: get_optional_secret("RUST_PLUGIN_TOKEN"),
            bot_api_token,
            webhook_replay_protection,
        })
    }

    /// The socket address to bind.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an optional secret; empty values count as unset.
fn get_optional_secret(key: &str) -> Option<SecretString> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .map(SecretString::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_addr_combines_host_and_port() {
        let config = AppConfig {
            host: "127.0.0.1".parse().expect("valid ip"),
            port: 3210,
            base_url: "http://localhost:3210".to_owned(),
            data_dir: PathBuf::from("./data"),
            steam_api_key: None,
            infinitepay_api_token: None,
            infinitepay_webhook_secret: None,
            discord_service_token: None,
            rust_plugin_token: None,
            bot_api_token: None,
            webhook_replay_protection: true,
        };
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3210");
    }
}
