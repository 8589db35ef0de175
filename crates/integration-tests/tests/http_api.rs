//! The HTTP surface against a live local server.
//!
//! Each test serves its own in-memory storefront on an ephemeral port.

use std::time::Duration;

use futures::StreamExt;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde_json::{Value, json};

use fashion_hub_integration_tests::{MAIN_ADMIN, PASSWORD, TestContext, spawn_server, test_config};

async fn body(resp: reqwest::Response) -> Value {
    resp.json().await.unwrap()
}

async fn login(client: &Client, base: &str, path: &str, identifier: &str) -> String {
    let resp = client
        .post(format!("{base}{path}"))
        .json(&json!({"identifier": identifier, "password": PASSWORD}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    body(resp).await["data"]["token"]
        .as_str()
        .unwrap()
        .to_owned()
}

fn order_payload() -> Value {
    json!({
        "items": [
            {"sku": "SAREE-BNR", "name": "Banarasi Saree", "unit_price": "2499.00", "quantity": 1},
            {"sku": "BANGLE-SET", "name": "Bangle Set", "unit_price": "350.50", "quantity": 2}
        ],
        "branch": "Jayanagar",
        "customer_address": "4th Block, Jayanagar",
        "total": "1.00"
    })
}

#[tokio::test]
async fn test_health_and_response_headers() {
    let ctx = TestContext::new();
    let base = spawn_server(ctx.state.clone()).await;

    let resp = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
    assert_eq!(resp.headers()["x-frame-options"], "DENY");
    assert_eq!(resp.text().await.unwrap(), "ok");

    let resp = reqwest::get(format!("{base}/health/ready")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_approval_over_http() {
    let ctx = TestContext::new();
    ctx.main_admin().await;
    let base = spawn_server(ctx.state.clone()).await;
    let client = Client::new();

    let resp = client
        .post(format!("{base}/api/admin/requests"))
        .json(&json!({"identifier": "bob", "name": "Bob", "password": PASSWORD}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let bob_id = body(resp).await["data"]["id"].as_str().unwrap().to_owned();

    let resp = client
        .post(format!("{base}/api/admin/login"))
        .json(&json!({"identifier": "bob", "password": PASSWORD}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let failure = body(resp).await;
    assert_eq!(failure["success"], false);
    assert_eq!(failure["code"], "pending_approval");

    let main_token = login(&client, &base, "/api/admin/login", MAIN_ADMIN).await;

    let resp = client
        .get(format!("{base}/api/admin/requests/pending"))
        .bearer_auth(&main_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let pending = body(resp).await;
    assert_eq!(pending["data"][0]["id"], bob_id.as_str());
    assert!(pending["data"][0].get("password").is_none());

    let resp = client
        .post(format!("{base}/api/admin/admins/{bob_id}/decision"))
        .bearer_auth(&main_token)
        .json(&json!({"decision": "approved"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body(resp).await["data"]["role"], "approved_admin");

    let bob_token = login(&client, &base, "/api/admin/login", "bob").await;

    // An approved admin still cannot decide.
    let resp = client
        .post(format!("{base}/api/admin/admins/{bob_id}/decision"))
        .bearer_auth(&bob_token)
        .json(&json!({"decision": "rejected"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(body(resp).await["code"], "permission_denied");

    let resp = client
        .post(format!("{base}/api/admin/admins/not-a-uuid/decision"))
        .bearer_auth(&main_token)
        .json(&json!({"decision": "approved"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_checkout_payment_and_tracking_over_http() {
    let ctx = TestContext::new();
    let main = ctx.main_admin().await;
    ctx.approved_admin(main.id, "bob").await;
    let base = spawn_server(ctx.state.clone()).await;
    let client = Client::new();

    let resp = client
        .post(format!("{base}/api/auth/register"))
        .json(&json!({"name": "Asha <b>", "email": "Asha@Example.com", "password": PASSWORD}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(body(resp).await["data"]["display_name"], "Asha b");

    let asha = login(&client, &base, "/api/auth/login", "asha@example.com").await;

    let resp = client
        .post(format!("{base}/api/orders"))
        .bearer_auth(&asha)
        .json(&order_payload())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order = body(resp).await["data"].clone();
    let code = order["code"].as_str().unwrap().to_owned();
    let total: Decimal = order["total"].as_str().unwrap().parse().unwrap();
    assert_eq!(total, Decimal::new(320_000, 2));
    assert_eq!(order["status"], "Order Placed");
    assert_eq!(order["customer"]["name"], "Asha b");

    // Guests track by code alone.
    let resp = client
        .get(format!("{base}/api/orders/{code}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .post(format!("{base}/api/payments/verifications"))
        .bearer_auth(&asha)
        .json(&json!({"order_code": code, "transaction_id": "UPI-20240611-88"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let verification_id = body(resp).await["data"]["id"].as_str().unwrap().to_owned();

    // Customers cannot decide their own claim.
    let resp = client
        .post(format!(
            "{base}/api/admin/payments/verifications/{verification_id}/decision"
        ))
        .bearer_auth(&asha)
        .json(&json!({"accept": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let bob = login(&client, &base, "/api/admin/login", "bob").await;
    let resp = client
        .get(format!("{base}/api/admin/payments/verifications/pending"))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(body(resp).await["data"].as_array().unwrap().len(), 1);

    let resp = client
        .post(format!(
            "{base}/api/admin/payments/verifications/{verification_id}/decision"
        ))
        .bearer_auth(&bob)
        .json(&json!({"accept": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body(resp).await["data"]["status"], "verified");

    let resp = client
        .patch(format!("{base}/api/admin/orders/{code}/status"))
        .bearer_auth(&bob)
        .json(&json!({"status": "Shipped", "location": "Bengaluru hub"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{base}/api/orders/mine"))
        .bearer_auth(&asha)
        .send()
        .await
        .unwrap();
    let mine = body(resp).await;
    assert_eq!(mine["data"][0]["payment_status"], "paid");
    assert_eq!(mine["data"][0]["status"], "Shipped");
    assert_eq!(mine["data"][0]["location"], "Bengaluru hub");
}

#[tokio::test]
async fn test_authentication_failures() {
    let ctx = TestContext::new();
    let base = spawn_server(ctx.state.clone()).await;
    let client = Client::new();

    let resp = client
        .get(format!("{base}/api/admin/orders"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body(resp).await["code"], "unauthenticated");

    let resp = client
        .get(format!("{base}/api/orders/mine"))
        .bearer_auth("not-a-real-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .post(format!("{base}/api/auth/login"))
        .json(&json!({"identifier": "nobody@example.com", "password": PASSWORD}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body(resp).await["code"], "invalid_credential");
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let ctx = TestContext::new();
    ctx.customer("Asha", "asha@example.com").await;
    let base = spawn_server(ctx.state.clone()).await;
    let client = Client::new();
    let token = login(&client, &base, "/api/auth/login", "asha@example.com").await;

    let resp = client
        .post(format!("{base}/api/auth/logout"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{base}/api/orders/mine"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_one_time_code_login_over_http() {
    let ctx = TestContext::new();
    ctx.customer("Asha", "asha@example.com").await;
    let base = spawn_server(ctx.state.clone()).await;
    let client = Client::new();

    let resp = client
        .post(format!("{base}/api/auth/otp/request"))
        .json(&json!({"identifier": "asha@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let code = ctx.sender.last_code_for("asha@example.com").unwrap();

    let resp = client
        .post(format!("{base}/api/auth/otp/verify"))
        .json(&json!({"identifier": "asha@example.com", "code": code}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body(resp).await["data"]["token"].is_string());

    // Unknown identifiers get the same answer and no code.
    let resp = client
        .post(format!("{base}/api/auth/otp/request"))
        .json(&json!({"identifier": "ghost@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(ctx.sender.count(), 1);
}

#[tokio::test]
async fn test_auth_routes_are_throttled_per_client() {
    let mut config = test_config();
    config.security.auth_throttle_burst = 2;
    config.security.auth_throttle_replenish = Duration::from_secs(60);
    let ctx = TestContext::with_config(config);
    let base = spawn_server(ctx.state.clone()).await;
    let client = Client::new();

    let attempt = || {
        client
            .post(format!("{base}/api/auth/login"))
            .json(&json!({"identifier": "nobody", "password": PASSWORD}))
            .send()
    };
    assert_eq!(attempt().await.unwrap().status(), StatusCode::UNAUTHORIZED);
    assert_eq!(attempt().await.unwrap().status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        attempt().await.unwrap().status(),
        StatusCode::TOO_MANY_REQUESTS
    );

    // Routes outside the auth group are not throttled.
    let resp = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_order_feed_streams_new_orders() {
    let ctx = TestContext::new();
    ctx.main_admin().await;
    let base = spawn_server(ctx.state.clone()).await;
    let client = Client::new();
    let token = login(&client, &base, "/api/admin/login", MAIN_ADMIN).await;

    let resp = client
        .get(format!("{base}/api/admin/orders/events"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "text/event-stream");

    let order = ctx.place_order(None).await;

    let mut stream = resp.bytes_stream();
    let mut received = String::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        while !received.contains(order.code.as_str()) {
            let chunk = stream.next().await.unwrap().unwrap();
            received.push_str(&String::from_utf8_lossy(&chunk));
        }
    })
    .await
    .unwrap();
    assert!(received.contains("\"kind\":\"created\""));

    let resp = client
        .get(format!("{base}/api/admin/orders/events"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
