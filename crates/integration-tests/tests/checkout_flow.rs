//! Checkout creation and the full purchase-to-entitlement flow.

use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};

use vip_backend::models::PurchaseStatus;
use vip_core::ServerInstance;
use vip_integration_tests::{STEAM_ID, TestContext};

fn checkout_body() -> Value {
    json!({
        "server": "solo",
        "steamId64": STEAM_ID,
        "discordId": "discord-user-1",
        "vipType": "vip",
        "customer": {
            "name": "Player One",
            "email": "player@example.com",
            "phone": "11999990000",
        },
        "amount": 49.9,
        "description": "VIP 30 dias - solo",
    })
}

fn paid_webhook(order_nsu: &str) -> Value {
    json!({
        "event": "invoice.status_changed",
        "data": {
            "status": "paid",
            "external_reference": order_nsu,
            "id": "pay_001",
        },
    })
}

#[tokio::test]
async fn checkout_records_a_pending_purchase() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .request("POST", "/api/checkout", &[], Some(checkout_body()))
        .await;

    assert_eq!(status, 201);
    let order_nsu = body["orderNsu"].as_str().expect("orderNsu in response");
    assert!(order_nsu.starts_with("SOLO-"), "got {order_nsu}");
    assert!(
        body["checkout"]["url"].as_str().is_some(),
        "provider session passed through"
    );

    let doc = ctx
        .state
        .store()
        .read(ServerInstance::Solo)
        .await
        .expect("read solo document");
    assert_eq!(doc.users.len(), 1);
    assert_eq!(doc.purchases.len(), 1);
    assert_eq!(doc.purchases[0].status, PurchaseStatus::PendingPayment);
    assert!(doc.vips.is_empty(), "no entitlement before confirmation");
}

#[tokio::test]
async fn confirmed_payment_grants_thirty_days() {
    let ctx = TestContext::new();

    let (_, body) = ctx
        .request("POST", "/api/checkout", &[], Some(checkout_body()))
        .await;
    let order_nsu = body["orderNsu"].as_str().expect("orderNsu").to_owned();

    let (status, body) = ctx.signed_webhook(&paid_webhook(&order_nsu)).await;
    assert_eq!(status, 200);
    assert_eq!(body["vip"]["vipType"], "vip");

    let uri = format!("/api/servers/solo/users?steamId64={STEAM_ID}");
    let (status, body) = ctx.request("GET", &uri, &[], None).await;
    assert_eq!(status, 200);
    assert_eq!(body["vip"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["purchases"][0]["status"], "paid");

    let expires: DateTime<Utc> = body["vip"][0]["expiresAt"]
        .as_str()
        .expect("expiresAt")
        .parse()
        .expect("rfc3339 timestamp");
    let remaining = expires - Utc::now();
    assert!(
        remaining > Duration::days(29) && remaining <= Duration::days(30),
        "expected ~30 days, got {remaining}"
    );
}

#[tokio::test]
async fn unrecognized_steam_id_is_rejected_before_persistence() {
    let ctx = TestContext::with_invalid_steam();

    let (status, body) = ctx
        .request("POST", "/api/checkout", &[], Some(checkout_body()))
        .await;

    assert_eq!(status, 400);
    assert_eq!(body["error"], "invalid_steam_id");

    let doc = ctx
        .state
        .store()
        .read(ServerInstance::Solo)
        .await
        .expect("read solo document");
    assert!(doc.purchases.is_empty());
    assert!(doc.users.is_empty());
}

#[tokio::test]
async fn unknown_instance_fails_validation() {
    let ctx = TestContext::new();

    let mut body = checkout_body();
    body["server"] = json!("trio");
    let (status, body) = ctx.request("POST", "/api/checkout", &[], Some(body)).await;

    assert_eq!(status, 400);
    assert_eq!(body["error"], "invalid_instance");
}

#[tokio::test]
async fn renewal_stacks_on_the_live_expiry() {
    let ctx = TestContext::new();

    let (_, body) = ctx
        .request("POST", "/api/checkout", &[], Some(checkout_body()))
        .await;
    let first_order = body["orderNsu"].as_str().expect("orderNsu").to_owned();
    ctx.signed_webhook(&paid_webhook(&first_order)).await;

    let (_, body) = ctx
        .request("POST", "/api/checkout", &[], Some(checkout_body()))
        .await;
    let second_order = body["orderNsu"].as_str().expect("orderNsu").to_owned();
    let (status, body) = ctx.signed_webhook(&paid_webhook(&second_order)).await;
    assert_eq!(status, 200);

    let starts: DateTime<Utc> = body["vip"]["startsAt"]
        .as_str()
        .expect("startsAt")
        .parse()
        .expect("rfc3339 timestamp");
    let expires: DateTime<Utc> = body["vip"]["expiresAt"]
        .as_str()
        .expect("expiresAt")
        .parse()
        .expect("rfc3339 timestamp");

    assert!(
        starts > Utc::now() + Duration::days(29),
        "second grant must start at the first expiry"
    );
    assert_eq!(expires - starts, Duration::days(30));

    let doc = ctx
        .state
        .store()
        .read(ServerInstance::Solo)
        .await
        .expect("read solo document");
    assert_eq!(doc.vips.len(), 1, "renewal mutates the entitlement in place");
    assert_eq!(doc.purchases.len(), 2);
}
