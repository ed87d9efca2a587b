//! Checkout orchestration.
//!
//! Validates identity, records a pending purchase, and brokers a checkout
//! session with the payment provider. Failure after the purchase row is
//! written leaves it at `pending_payment` for later reconciliation - there
//! is no rollback and no cleanup of abandoned checkouts.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use vip_core::{DiscordId, OrderNsu, ServerInstance, SteamId64, VipType};

use crate::error::{AppError, Result};
use crate::models::{Purchase, PurchaseStatus};
use crate::services::payments::{CheckoutMetadata, CheckoutRequest, Customer};
use crate::state::AppState;

/// Provider key stored on every purchase row.
const PROVIDER: &str = "infinitepay";

/// Checkout request body, validated field by field before anything is
/// persisted or any upstream call is made.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutRequest {
    pub server: String,
    pub steam_id64: String,
    pub discord_id: String,
    pub vip_type: String,
    pub customer: Customer,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub description: String,
}

struct ValidCheckout {
    instance: ServerInstance,
    steam_id: SteamId64,
    discord_id: DiscordId,
    vip_type: VipType,
    customer: Customer,
    amount: Decimal,
    description: String,
}

fn validate(body: CreateCheckoutRequest) -> Result<ValidCheckout> {
    let instance: ServerInstance = body.server.parse()?;
    let steam_id =
        SteamId64::parse(&body.steam_id64).map_err(|e| AppError::Validation(e.to_string()))?;
    let discord_id =
        DiscordId::parse(&body.discord_id).map_err(|e| AppError::Validation(e.to_string()))?;

    let vip_type = match body.vip_type.as_str() {
        "vip" => VipType::Vip,
        "vip+" => VipType::VipPlus,
        other => {
            return Err(AppError::Validation(format!(
                "vipType must be 'vip' or 'vip+', got '{other}'"
            )));
        }
    };

    if body.customer.name.trim().len() < 3 {
        return Err(AppError::Validation(
            "customer.name must be at least 3 characters".to_owned(),
        ));
    }
    if !is_plausible_email(&body.customer.email) {
        return Err(AppError::Validation(
            "customer.email is not a valid email address".to_owned(),
        ));
    }
    if body.customer.phone.trim().len() < 8 {
        return Err(AppError::Validation(
            "customer.phone must be at least 8 characters".to_owned(),
        ));
    }

    if body.amount <= Decimal::ZERO {
        return Err(AppError::Validation("amount must be positive".to_owned()));
    }

    let description_len = body.description.trim().len();
    if !(5..=255).contains(&description_len) {
        return Err(AppError::Validation(
            "description must be between 5 and 255 characters".to_owned(),
        ));
    }

    Ok(ValidCheckout {
        instance,
        steam_id,
        discord_id,
        vip_type,
        customer: body.customer,
        amount: body.amount,
        description: body.description,
    })
}

/// Create a checkout session and a pending purchase row.
#[instrument(skip_all, fields(server = %body.server, vip_type = %body.vip_type))]
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(body): Json<CreateCheckoutRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let checkout = validate(body)?;

    if !state.steam().validate_steam_id64(&checkout.steam_id).await? {
        return Err(AppError::InvalidSteamId);
    }

    let order_nsu = OrderNsu::generate(checkout.instance);

    {
        let order_nsu = order_nsu.clone();
        let steam_id = checkout.steam_id.clone();
        let discord_id = checkout.discord_id.clone();
        let vip_type = checkout.vip_type;
        let amount = checkout.amount;
        let description = checkout.description.clone();

        state
            .store()
            .with_transaction::<_, AppError, _>(checkout.instance, move |doc| {
                let now = Utc::now();
                doc.upsert_user(&steam_id, &discord_id);
                doc.purchases.push(Purchase {
                    order_nsu,
                    steam_id64: steam_id,
                    discord_id,
                    vip_type,
                    amount,
                    description,
                    status: PurchaseStatus::PendingPayment,
                    provider: PROVIDER.to_owned(),
                    provider_payment_id: None,
                    created_at: now,
                    updated_at: now,
                });
                Ok(())
            })
            .await?;
    }

    let request = CheckoutRequest {
        external_reference: order_nsu.clone(),
        amount: checkout.amount,
        description: checkout.description,
        customer: checkout.customer,
        metadata: CheckoutMetadata {
            server: checkout.instance,
            steam_id64: checkout.steam_id,
            discord_id: checkout.discord_id,
            vip_type: checkout.vip_type,
            vip_duration_days: checkout.vip_type.duration_days(),
        },
    };

    let session = state.payments().create_checkout_link(&request).await?;

    tracing::info!(order_nsu = %order_nsu, "checkout created");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Checkout created.",
            "orderNsu": order_nsu,
            "checkout": session,
        })),
    ))
}

/// Structural email check, nothing more. Deliverability is the payment
/// provider's problem.
fn is_plausible_email(email: &str) -> bool {
    let Some(at) = email.find('@') else {
        return false;
    };
    at > 0 && at < email.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_body() -> CreateCheckoutRequest {
        CreateCheckoutRequest {
            server: "solo".to_owned(),
            steam_id64: "76561198000000000".to_owned(),
            discord_id: "discord-user".to_owned(),
            vip_type: "vip".to_owned(),
            customer: Customer {
                name: "Player One".to_owned(),
                email: "player@example.com".to_owned(),
                phone: "11999990000".to_owned(),
            },
            amount: Decimal::new(499, 1),
            description: "VIP 30 dias".to_owned(),
        }
    }

    #[test]
    fn accepts_a_valid_body() {
        let checkout = validate(valid_body()).expect("valid");
        assert_eq!(checkout.instance, ServerInstance::Solo);
        assert_eq!(checkout.vip_type, VipType::Vip);
    }

    #[test]
    fn rejects_unknown_instance() {
        let mut body = valid_body();
        body.server = "trio".to_owned();
        assert!(matches!(
            validate(body),
            Err(AppError::InvalidInstance(_))
        ));
    }

    #[test]
    fn rejects_unknown_vip_type() {
        let mut body = valid_body();
        body.vip_type = "vip++".to_owned();
        assert!(matches!(validate(body), Err(AppError::Validation(_))));
    }

    #[test]
    fn rejects_non_positive_amount() {
        let mut body = valid_body();
        body.amount = Decimal::ZERO;
        assert!(matches!(validate(body), Err(AppError::Validation(_))));
    }

    #[test]
    fn rejects_short_description() {
        let mut body = valid_body();
        body.description = "VIP".to_owned();
        assert!(matches!(validate(body), Err(AppError::Validation(_))));
    }

    #[test]
    fn email_check_is_structural() {
        assert!(is_plausible_email("a@b.c"));
        assert!(!is_plausible_email("no-at-sign"));
        assert!(!is_plausible_email("@domain"));
        assert!(!is_plausible_email("local@"));
    }
}
