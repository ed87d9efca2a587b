//! The Discord bot's simplified purchase flow, end to end.

use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};

use vip_integration_tests::{BOT_TOKEN, TestContext};

const DISCORD_ID: &str = "discord-user-42";

fn bearer() -> String {
    format!("Bearer {BOT_TOKEN}")
}

async fn bot_post(ctx: &TestContext, path: &str, body: Value) -> (axum::http::StatusCode, Value) {
    let auth = bearer();
    ctx.request(
        "POST",
        path,
        &[("authorization", auth.as_str())],
        Some(body),
    )
    .await
}

async fn bot_get(ctx: &TestContext, path: &str) -> (axum::http::StatusCode, Value) {
    let auth = bearer();
    ctx.request("GET", path, &[("authorization", auth.as_str())], None)
        .await
}

#[tokio::test]
async fn full_flow_grants_vip_on_the_bot_record() {
    let ctx = TestContext::new();

    let (status, body) = bot_post(
        &ctx,
        "/api/bot/server",
        json!({ "discordId": DISCORD_ID, "server": "duo" }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["user"]["server"], "duo");

    let (status, body) = bot_post(
        &ctx,
        "/api/bot/steam-link",
        json!({ "discordId": DISCORD_ID }),
    )
    .await;
    assert_eq!(status, 200);
    assert!(
        body["authUrl"]
            .as_str()
            .is_some_and(|url| url.contains("steamcommunity.com"))
    );

    let (status, body) = bot_post(
        &ctx,
        "/api/bot/purchases",
        json!({ "discordId": DISCORD_ID, "type": "vip" }),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(body["payment"]["status"], "pending");
    let order_id = body["payment"]["orderId"]
        .as_str()
        .expect("orderId")
        .to_owned();
    assert!(order_id.starts_with("VIP-"));

    let (status, body) = bot_post(
        &ctx,
        "/api/bot/webhook",
        json!({ "orderId": order_id, "status": "approved", "discordId": DISCORD_ID, "type": "vip" }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["payment"]["status"], "approved");
    assert_eq!(body["user"]["vip"], "vip");

    let expires: DateTime<Utc> = body["user"]["vipExpiresAt"]
        .as_str()
        .expect("vipExpiresAt")
        .parse()
        .expect("rfc3339 timestamp");
    assert!(expires > Utc::now() + Duration::days(29));

    // Approval closes the flow session; the durable record survives.
    let (status, body) = bot_get(
        &ctx,
        &format!("/api/bot/session?discordId={DISCORD_ID}"),
    )
    .await;
    assert_eq!(status, 200);
    assert!(body["session"].is_null());
    assert_eq!(body["user"]["vip"], "vip");
}

#[tokio::test]
async fn purchase_without_a_server_choice_is_rejected() {
    let ctx = TestContext::new();

    // A brand-new discordId still gets a record created; the error is
    // the missing server choice, not an unknown user.
    let (status, body) = bot_post(
        &ctx,
        "/api/bot/purchases",
        json!({ "discordId": "discord-stranger", "type": "vip" }),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "server_not_selected");

    let doc = ctx.state.bot_store().read().await.expect("read bot store");
    assert_eq!(doc.users.len(), 1, "the rejected request persists the user");
    assert!(doc.payments.is_empty(), "no payment is opened");
}

#[tokio::test]
async fn unknown_vip_tier_is_rejected() {
    let ctx = TestContext::new();
    bot_post(
        &ctx,
        "/api/bot/server",
        json!({ "discordId": DISCORD_ID, "server": "solo" }),
    )
    .await;

    let (status, body) = bot_post(
        &ctx,
        "/api/bot/purchases",
        json!({ "discordId": DISCORD_ID, "type": "mvp" }),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn failed_payment_grants_nothing() {
    let ctx = TestContext::new();
    bot_post(
        &ctx,
        "/api/bot/server",
        json!({ "discordId": DISCORD_ID, "server": "solo" }),
    )
    .await;
    let (_, body) = bot_post(
        &ctx,
        "/api/bot/purchases",
        json!({ "discordId": DISCORD_ID, "type": "vip+" }),
    )
    .await;
    let order_id = body["payment"]["orderId"]
        .as_str()
        .expect("orderId")
        .to_owned();

    let (status, body) = bot_post(
        &ctx,
        "/api/bot/webhook",
        json!({ "orderId": order_id, "status": "rejected", "discordId": DISCORD_ID, "type": "vip+" }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["payment"]["status"], "failed");
    assert!(body["user"]["vip"].is_null());
}

#[tokio::test]
async fn unknown_order_id_is_not_found() {
    let ctx = TestContext::new();

    let (status, body) = bot_post(
        &ctx,
        "/api/bot/webhook",
        json!({ "orderId": "VIP-0-ffffffff", "status": "approved", "discordId": "discord-stranger", "type": "vip" }),
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "payment_not_found");
}

#[tokio::test]
async fn replayed_approval_does_not_extend_again() {
    let ctx = TestContext::new();
    bot_post(
        &ctx,
        "/api/bot/server",
        json!({ "discordId": DISCORD_ID, "server": "duo" }),
    )
    .await;
    let (_, body) = bot_post(
        &ctx,
        "/api/bot/purchases",
        json!({ "discordId": DISCORD_ID, "type": "vip" }),
    )
    .await;
    let order_id = body["payment"]["orderId"]
        .as_str()
        .expect("orderId")
        .to_owned();

    let approve = json!({ "orderId": order_id, "status": "approved", "discordId": DISCORD_ID, "type": "vip" });
    let (_, first) = bot_post(&ctx, "/api/bot/webhook", approve.clone()).await;
    let (_, second) = bot_post(&ctx, "/api/bot/webhook", approve).await;

    assert_eq!(
        first["user"]["vipExpiresAt"], second["user"]["vipExpiresAt"],
        "replayed approvals must not stack"
    );
}
