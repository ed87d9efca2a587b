//! InfinitePay collaborator: checkout links and webhook signatures.

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use sha2::Sha256;
use thiserror::Error;

use vip_core::{DiscordId, OrderNsu, ServerInstance, SteamId64, VipType};

use crate::config::AppConfig;

/// Payment provider API base URL.
const BASE_URL: &str = "https://api.infinitepay.io";

/// Timeout applied to checkout-link creation.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

type HmacSha256 = Hmac<Sha256>;

/// Errors that can occur when talking to the payment provider.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// `INFINITEPAY_API_TOKEN` is not configured on the backend.
    #[error("INFINITEPAY_API_TOKEN is not configured")]
    MissingApiToken,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned a non-success status; the body is passed through.
    #[error("provider error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// Checkout-link creation payload sent to the provider.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutRequest {
    pub external_reference: OrderNsu,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub description: String,
    pub customer: Customer,
    pub metadata: CheckoutMetadata,
}

/// Customer contact details forwarded to the checkout session.
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Purchase context echoed back by the provider's webhook.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutMetadata {
    pub server: ServerInstance,
    pub steam_id64: SteamId64,
    pub discord_id: DiscordId,
    pub vip_type: VipType,
    pub vip_duration_days: i64,
}

/// Boundary to the payment-checkout collaborator.
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    /// Create a checkout session and return the provider's payload
    /// verbatim (it carries the redirect/payment URL).
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError`] on missing token or upstream failure.
    async fn create_checkout_link(
        &self,
        request: &CheckoutRequest,
    ) -> Result<serde_json::Value, PaymentError>;
}

/// Production InfinitePay client.
pub struct InfinitePayClient {
    client: reqwest::Client,
    api_token: Option<SecretString>,
}

impl InfinitePayClient {
    /// Create a client from the backend configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError`] if the HTTP client fails to build.
    pub fn new(config: &AppConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            api_token: config.infinitepay_api_token.clone(),
        })
    }
}

#[async_trait]
impl CheckoutProvider for InfinitePayClient {
    async fn create_checkout_link(
        &self,
        request: &CheckoutRequest,
    ) -> Result<serde_json::Value, PaymentError> {
        let api_token = self.api_token.as_ref().ok_or(PaymentError::MissingApiToken)?;

        let response = self
            .client
            .post(format!("{BASE_URL}/invoices/public/checkout/links"))
            .bearer_auth(api_token.expose_secret())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

/// Verify a webhook body against its `x-infinitepay-signature` header.
///
/// The signature is the lowercase hex HMAC-SHA256 of the raw body. When no
/// secret is configured verification is skipped entirely - an explicit
/// operational choice inherited from the source deployment, not a fallback
/// on bad input.
#[must_use]
pub fn verify_webhook_signature(
    secret: Option<&SecretString>,
    raw_body: &[u8],
    signature: Option<&str>,
) -> bool {
    let Some(secret) = secret else {
        return true;
    };

    let Some(signature) = signature else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose_secret().as_bytes()) else {
        return false;
    };
    mac.update(raw_body);
    let computed = hex::encode(mac.finalize().into_bytes());

    computed == signature
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac key");
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_valid_signature() {
        let secret = SecretString::from("webhook-secret");
        let body = br#"{"event":"invoice.paid"}"#;
        let signature = sign("webhook-secret", body);
        assert!(verify_webhook_signature(
            Some(&secret),
            body,
            Some(&signature)
        ));
    }

    #[test]
    fn rejects_bad_or_missing_signature() {
        let secret = SecretString::from("webhook-secret");
        let body = br#"{"event":"invoice.paid"}"#;
        assert!(!verify_webhook_signature(
            Some(&secret),
            body,
            Some("deadbeef")
        ));
        assert!(!verify_webhook_signature(Some(&secret), body, None));
    }

    #[test]
    fn skips_verification_without_secret() {
        assert!(verify_webhook_signature(None, b"anything", None));
    }

    #[test]
    fn signature_covers_the_exact_bytes() {
        let secret = SecretString::from("webhook-secret");
        let signature = sign("webhook-secret", b"body-one");
        assert!(!verify_webhook_signature(
            Some(&secret),
            b"body-two",
            Some(&signature)
        ));
    }
}
