//! Steam identity collaborator.
//!
//! Two concerns, both behind the [`SteamGateway`] trait so tests can run
//! without network access:
//!
//! - the OpenID 2.0 relying-party handshake against
//!   `steamcommunity.com/openid` (auth URL construction and stateless
//!   `check_authentication` verification)
//! - SteamID64 validation via the Steam Web API's `GetPlayerSummaries`

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use vip_core::SteamId64;

use crate::config::AppConfig;

/// Steam OpenID 2.0 provider endpoint.
const OPENID_ENDPOINT: &str = "https://steamcommunity.com/openid/login";

/// OpenID 2.0 namespace value.
const OPENID_NS: &str = "http://specs.openid.net/auth/2.0";

/// OpenID identifier-select value used by Steam.
const IDENTIFIER_SELECT: &str = "http://specs.openid.net/auth/2.0/identifier_select";

/// Steam Web API endpoint for player summaries.
const PLAYER_SUMMARIES_URL: &str =
    "https://api.steampowered.com/ISteamUser/GetPlayerSummaries/v0002/";

/// Timeout applied to every outbound Steam call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur when talking to Steam.
#[derive(Debug, Error)]
pub enum SteamError {
    /// `STEAM_API_KEY` is not configured on the backend.
    #[error("STEAM_API_KEY is not configured")]
    MissingApiKey,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Steam Web API returned a non-success status.
    #[error("Steam API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The OpenID assertion could not be verified.
    #[error("OpenID verification failed: {0}")]
    OpenId(String),

    /// The claimed identifier did not contain a SteamID64.
    #[error("claimed id '{0}' does not contain a valid SteamID64")]
    BadClaimedId(String),

    /// The relying-party URLs could not be built from `BASE_URL`.
    #[error("invalid base_url: {0}")]
    BadBaseUrl(#[from] url::ParseError),
}

/// Boundary to the Steam identity collaborator.
#[async_trait]
pub trait SteamGateway: Send + Sync {
    /// Build the Steam OpenID login URL to redirect a player to.
    ///
    /// # Errors
    ///
    /// Returns [`SteamError`] if the relying-party URLs cannot be built.
    fn auth_url(&self) -> Result<String, SteamError>;

    /// Verify an OpenID return assertion and extract the SteamID64.
    ///
    /// # Errors
    ///
    /// Returns [`SteamError`] if the assertion is malformed, rejected by
    /// Steam, or carries an unusable claimed identifier.
    async fn verify_assertion(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<SteamId64, SteamError>;

    /// Whether the SteamID64 belongs to an existing Steam account.
    ///
    /// # Errors
    ///
    /// Returns [`SteamError`] on missing API key or upstream failure.
    async fn validate_steam_id64(&self, steam_id: &SteamId64) -> Result<bool, SteamError>;
}

/// Production Steam client.
pub struct SteamClient {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    base_url: String,
}

impl SteamClient {
    /// Create a Steam client from the backend configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SteamError`] if the HTTP client fails to build.
    pub fn new(config: &AppConfig) -> Result<Self, SteamError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            api_key: config.steam_api_key.clone(),
            base_url: config.base_url.clone(),
        })
    }

    fn return_to(&self) -> String {
        format!("{}/api/auth/steam/return", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SteamGateway for SteamClient {
    fn auth_url(&self) -> Result<String, SteamError> {
        let mut url = Url::parse(OPENID_ENDPOINT)?;
        url.query_pairs_mut()
            .append_pair("openid.ns", OPENID_NS)
            .append_pair("openid.mode", "checkid_setup")
            .append_pair("openid.return_to", &self.return_to())
            .append_pair("openid.realm", self.base_url.trim_end_matches('/'))
            .append_pair("openid.identity", IDENTIFIER_SELECT)
            .append_pair("openid.claimed_id", IDENTIFIER_SELECT);
        Ok(url.into())
    }

    async fn verify_assertion(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<SteamId64, SteamError> {
        if params.get("openid.mode").map(String::as_str) != Some("id_res") {
            return Err(SteamError::OpenId("assertion mode is not id_res".to_owned()));
        }

        let claimed_id = params
            .get("openid.claimed_id")
            .ok_or_else(|| SteamError::OpenId("missing openid.claimed_id".to_owned()))?;

        // Stateless verification: echo the assertion back with mode
        // check_authentication and let Steam confirm the signature.
        let mut form: Vec<(&str, &str)> = params
            .iter()
            .filter(|(key, _)| key.as_str() != "openid.mode")
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        form.push(("openid.mode", "check_authentication"));

        let response = self
            .client
            .post(OPENID_ENDPOINT)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SteamError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        if !body.lines().any(|line| line.trim() == "is_valid:true") {
            return Err(SteamError::OpenId(
                "Steam rejected the OpenID assertion".to_owned(),
            ));
        }

        extract_steam_id64(claimed_id)
    }

    async fn validate_steam_id64(&self, steam_id: &SteamId64) -> Result<bool, SteamError> {
        let api_key = self.api_key.as_ref().ok_or(SteamError::MissingApiKey)?;

        let response = self
            .client
            .get(PLAYER_SUMMARIES_URL)
            .query(&[
                ("key", api_key.expose_secret()),
                ("steamids", steam_id.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SteamError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let summaries: PlayerSummariesResponse = response.json().await?;
        Ok(!summaries.response.players.is_empty())
    }
}

/// Pull the trailing SteamID64 out of an OpenID claimed identifier
/// (`https://steamcommunity.com/openid/id/7656119...`).
fn extract_steam_id64(claimed_id: &str) -> Result<SteamId64, SteamError> {
    let last_segment = claimed_id
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    SteamId64::parse(last_segment)
        .map_err(|_| SteamError::BadClaimedId(claimed_id.to_owned()))
}

#[derive(Debug, Deserialize)]
struct PlayerSummariesResponse {
    response: PlayerList,
}

#[derive(Debug, Deserialize)]
struct PlayerList {
    #[serde(default)]
    players: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SteamClient {
        let config = AppConfig {
            host: "127.0.0.1".parse().expect("valid ip"),
            port: 3000,
            base_url: "http://localhost:3000".to_owned(),
            data_dir: std::path::PathBuf::from("./data"),
            steam_api_key: None,
            infinitepay_api_token: None,
            infinitepay_webhook_secret: None,
            discord_service_token: None,
            rust_plugin_token: None,
            bot_api_token: None,
            webhook_replay_protection: true,
        };
        SteamClient::new(&config).expect("client")
    }

    #[test]
    fn auth_url_targets_steam_openid() {
        let url = client().auth_url().expect("auth url");
        let parsed = Url::parse(&url).expect("parseable");
        assert_eq!(parsed.host_str(), Some("steamcommunity.com"));

        let pairs: HashMap<_, _> = parsed.query_pairs().into_owned().collect();
        assert_eq!(pairs.get("openid.mode").map(String::as_str), Some("checkid_setup"));
        assert_eq!(
            pairs.get("openid.return_to").map(String::as_str),
            Some("http://localhost:3000/api/auth/steam/return")
        );
    }

    #[test]
    fn extracts_steam_id_from_claimed_id() {
        let id = extract_steam_id64("https://steamcommunity.com/openid/id/76561198000000000")
            .expect("valid claimed id");
        assert_eq!(id.as_str(), "76561198000000000");
    }

    #[test]
    fn rejects_claimed_id_without_steam_id() {
        assert!(matches!(
            extract_steam_id64("https://steamcommunity.com/openid/id/not-a-number"),
            Err(SteamError::BadClaimedId(_))
        ));
    }

    #[tokio::test]
    async fn missing_api_key_is_reported() {
        let steam_id = SteamId64::parse("76561198000000000").expect("valid id");
        let result = client().validate_steam_id64(&steam_id).await;
        assert!(matches!(result, Err(SteamError::MissingApiKey)));
    }
}
