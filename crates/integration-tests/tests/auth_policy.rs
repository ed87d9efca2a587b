//! Credential enforcement across the route surface.

use vip_integration_tests::{BOT_TOKEN, DISCORD_TOKEN, PLUGIN_TOKEN, STEAM_ID, TestContext};

#[tokio::test]
async fn health_is_public() {
    let ctx = TestContext::new();
    let (status, body) = ctx.request("GET", "/api/health", &[], None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "vip-backend");
}

#[tokio::test]
async fn plugin_routes_require_the_service_token() {
    let ctx = TestContext::new();
    let uri = format!("/api/plugin/solo/vip-status?steamId64={STEAM_ID}");

    let (status, body) = ctx.request("GET", &uri, &[], None).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = ctx
        .request("GET", &uri, &[("x-service-token", "wrong")], None)
        .await;
    assert_eq!(status, 401);

    let (status, body) = ctx
        .request("GET", &uri, &[("x-service-token", PLUGIN_TOKEN)], None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["hasVip"], false);
}

#[tokio::test]
async fn discord_routes_use_their_own_token() {
    let ctx = TestContext::new();
    let uri = format!("/api/discord/solo/users?steamId64={STEAM_ID}");

    // The plugin token does not open the bridge surface.
    let (status, _) = ctx
        .request("GET", &uri, &[("x-service-token", PLUGIN_TOKEN)], None)
        .await;
    assert_eq!(status, 401);

    // The right token passes auth; the 404 comes from the handler.
    let (status, body) = ctx
        .request("GET", &uri, &[("x-service-token", DISCORD_TOKEN)], None)
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "user_not_found");
}

#[tokio::test]
async fn bot_routes_require_the_bearer_token() {
    let ctx = TestContext::new();
    let uri = "/api/bot/session?discordId=discord-user-1";

    let (status, _) = ctx.request("GET", uri, &[], None).await;
    assert_eq!(status, 401);

    // The raw token without the scheme prefix is rejected.
    let (status, _) = ctx
        .request("GET", uri, &[("authorization", BOT_TOKEN)], None)
        .await;
    assert_eq!(status, 401);

    let bearer = format!("Bearer {BOT_TOKEN}");
    let (status, body) = ctx
        .request("GET", uri, &[("authorization", bearer.as_str())], None)
        .await;
    assert_eq!(status, 200);
    assert!(body["session"].is_null());
    assert!(body["user"].is_null());
}

#[tokio::test]
async fn missing_backend_secret_is_a_server_error_not_a_bypass() {
    let ctx = TestContext::build(|config| config.rust_plugin_token = None);
    let uri = format!("/api/plugin/solo/vip-status?steamId64={STEAM_ID}");

    let (status, body) = ctx
        .request("GET", &uri, &[("x-service-token", PLUGIN_TOKEN)], None)
        .await;
    assert_eq!(status, 500);
    assert_eq!(body["error"], "misconfigured");
}
