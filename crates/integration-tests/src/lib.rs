//! In-process test harness for the VIP backend.
//!
//! Builds the real router over a temp data directory, with the Steam and
//! payment collaborators replaced by local doubles so no test touches the
//! network. Requests are driven through `tower::ServiceExt::oneshot`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::Value;
use sha2::Sha256;
use tower::ServiceExt;

use vip_backend::config::AppConfig;
use vip_backend::routes;
use vip_backend::services::payments::{CheckoutProvider, CheckoutRequest, PaymentError};
use vip_backend::services::steam::{SteamError, SteamGateway};
use vip_backend::state::AppState;
use vip_core::SteamId64;

/// Secrets wired into every test configuration.
pub const WEBHOOK_SECRET: &str = "test-webhook-secret";
pub const PLUGIN_TOKEN: &str = "test-plugin-token";
pub const DISCORD_TOKEN: &str = "test-discord-token";
pub const BOT_TOKEN: &str = "test-bot-bearer-token";

/// SteamID64 used by the default fixtures.
pub const STEAM_ID: &str = "76561198000000001";

/// Steam double: every assertion verifies, and `valid` controls whether
/// SteamID64 validation passes.
pub struct StubSteam {
    pub valid: bool,
}

#[async_trait]
impl SteamGateway for StubSteam {
    fn auth_url(&self) -> Result<String, SteamError> {
        Ok("https://steamcommunity.com/openid/login?openid.mode=checkid_setup".to_owned())
    }

    async fn verify_assertion(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<SteamId64, SteamError> {
        let claimed = params
            .get("openid.claimed_id")
            .map_or(STEAM_ID, |id| id.trim_end_matches('/').rsplit('/').next().unwrap_or(STEAM_ID));
        SteamId64::parse(claimed).map_err(|_| SteamError::BadClaimedId(claimed.to_owned()))
    }

    async fn validate_steam_id64(&self, _steam_id: &SteamId64) -> Result<bool, SteamError> {
        Ok(self.valid)
    }
}

/// Payment double: always succeeds with a canned checkout session.
pub struct StubCheckout;

#[async_trait]
impl CheckoutProvider for StubCheckout {
    async fn create_checkout_link(
        &self,
        request: &CheckoutRequest,
    ) -> Result<serde_json::Value, PaymentError> {
        Ok(serde_json::json!({
            "id": "chk_test",
            "url": format!(
                "https://checkout.infinitepay.io/session/{}",
                request.external_reference
            ),
        }))
    }
}

/// A router over a fresh temp data directory plus the state behind it.
pub struct TestContext {
    pub router: Router,
    pub state: AppState,
    _data_dir: tempfile::TempDir,
}

impl TestContext {
    /// Default context: collaborators succeed, replay protection on.
    #[must_use]
    pub fn new() -> Self {
        Self::build(|_| {})
    }

    /// Context with a tweaked configuration.
    #[must_use]
    pub fn build<F>(tweak: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let data_dir = tempfile::tempdir().expect("temp data dir");
        let mut config = test_config(data_dir.path().to_path_buf());
        tweak(&mut config);

        let state = AppState::with_collaborators(
            config,
            Arc::new(StubSteam { valid: true }),
            Arc::new(StubCheckout),
        );
        Self {
            router: routes::router(state.clone()),
            state,
            _data_dir: data_dir,
        }
    }

    /// Context whose Steam double rejects every SteamID64.
    #[must_use]
    pub fn with_invalid_steam() -> Self {
        let data_dir = tempfile::tempdir().expect("temp data dir");
        let config = test_config(data_dir.path().to_path_buf());

        let state = AppState::with_collaborators(
            config,
            Arc::new(StubSteam { valid: false }),
            Arc::new(StubCheckout),
        );
        Self {
            router: routes::router(state.clone()),
            state,
            _data_dir: data_dir,
        }
    }

    /// Drive one request through the router and decode the JSON body.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json).expect("encode body")))
                .expect("build request"),
            None => builder.body(Body::empty()).expect("build request"),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible router");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    /// POST a signed webhook body to `/api/webhooks/infinitepay`.
    pub async fn signed_webhook(&self, body: &Value) -> (StatusCode, Value) {
        let raw = serde_json::to_vec(body).expect("encode body");
        let signature = sign(WEBHOOK_SECRET, &raw);
        self.request(
            "POST",
            "/api/webhooks/infinitepay",
            &[("x-infinitepay-signature", signature.as_str())],
            Some(body.clone()),
        )
        .await
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercase hex HMAC-SHA256, as the payment provider signs webhook bodies.
#[must_use]
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

fn test_config(data_dir: PathBuf) -> AppConfig {
    AppConfig {
        host: "127.0.0.1".parse().expect("valid ip"),
        port: 0,
        base_url: "http://localhost:3000".to_owned(),
        data_dir,
        steam_api_key: Some(SecretString::from("test-steam-key")),
        infinitepay_api_token: Some(SecretString::from("test-api-token")),
        infinitepay_webhook_secret: Some(SecretString::from(WEBHOOK_SECRET)),
        discord_service_token: Some(SecretString::from(DISCORD_TOKEN)),
        rust_plugin_token: Some(SecretString::from(PLUGIN_TOKEN)),
        bot_api_token: Some(SecretString::from(BOT_TOKEN)),
        webhook_replay_protection: true,
    }
}
