use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::Query, http::StatusCode as AxumStatus, routing::get, routing::post, Json, Router};
use reqwest::StatusCode;
use serde_json::json;

use chargeforge_api::app::{build_app_with, AppServices};
use chargeforge_core::ActorId;
use chargeforge_orders::PollerConfig;
use chargeforge_provider::{ProviderClient, ProviderConfig};

/// Stub Provider: the remote side of the boundary, served over real HTTP so
/// the live client code path is exercised end to end.
fn stub_provider_router() -> Router {
    Router::new()
        .route(
            "/services",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                let game = q.get("game").cloned().unwrap_or_default();
                Json(json!([
                    {
                        "code": "ff-100",
                        "name": "100 Diamonds",
                        "game": game,
                        "price": { "basic": 15000, "premium": 14500 },
                        "status": "available"
                    }
                ]))
            }),
        )
        .route(
            "/stock",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                let code = q.get("code").cloned().unwrap_or_default();
                Json(json!({ "code": code, "stock": 9 }))
            }),
        )
        .route(
            "/nickname",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                match q.get("user_id").map(String::as_str) {
                    Some("404") => Err(AxumStatus::NOT_FOUND),
                    Some(_) => Ok(Json(json!({ "nickname": "player-one" }))),
                    None => Err(AxumStatus::NOT_FOUND),
                }
            }),
        )
        .route(
            "/order",
            post(|| async { Json(json!({ "trxid": "TRX-100", "status": "pending" })) }),
        )
        .route(
            "/status",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                let trxid = q.get("trxid").cloned().unwrap_or_default();
                Json(json!([
                    { "trxid": trxid, "status": "success", "note": "delivered" }
                ]))
            }),
        )
        .route("/balance", get(|| async { Json(json!({ "balance": 250000.0 })) }))
}

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(app: Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// App + stub provider pair, with a fast poller for tests.
async fn spawn_storefront() -> (TestServer, TestServer) {
    let provider_srv = TestServer::spawn(stub_provider_router()).await;

    let config = ProviderConfig::default()
        .with_base_url(provider_srv.base_url.clone())
        .with_timeout(Duration::from_secs(2));
    let client = ProviderClient::new(&config).expect("provider client");

    let services = Arc::new(AppServices::with_provider(
        Arc::new(client),
        PollerConfig::default()
            .with_interval(Duration::from_millis(10))
            .with_max_attempts(20),
    ));

    let app_srv = TestServer::spawn(build_app_with(services)).await;
    (app_srv, provider_srv)
}

fn admin(client: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    client
        .header("x-actor-id", ActorId::new().to_string())
        .header("x-actor-role", "admin")
}

fn customer(client: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    client.header("x-actor-id", ActorId::new().to_string())
}

async fn create_product(client: &reqwest::Client, base_url: &str, stock: i64) -> String {
    let res = admin(client.post(format!("{base_url}/products")))
        .json(&json!({
            "name": "100 Diamonds",
            "game": "free-fire",
            "service_code": "ff-100",
            "stock": stock,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    body["product_id"].as_str().unwrap().to_string()
}

async fn get_order_eventually(
    client: &reqwest::Client,
    base_url: &str,
    order_id: &str,
    wanted_status: &str,
) -> serde_json::Value {
    // The submit path finalizes asynchronously; poll briefly until the
    // background poller lands the terminal status.
    for _ in 0..100 {
        let res = customer(client.get(format!("{base_url}/checkout/orders/{order_id}")))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = res.json().await.unwrap();
        if body["status"] == wanted_status {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("order did not reach status {wanted_status} within timeout");
}

#[tokio::test]
async fn health_needs_no_actor() {
    let (srv, _provider) = spawn_storefront().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn domain_routes_require_an_actor() {
    let (srv, _provider) = spawn_storefront().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/stock", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_refuse_customers() {
    let (srv, _provider) = spawn_storefront().await;
    let client = reqwest::Client::new();

    let res = customer(client.get(format!("{}/stock", srv.base_url)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_restock_writes_audited_history() {
    let (srv, _provider) = spawn_storefront().await;
    let client = reqwest::Client::new();

    let product_id = create_product(&client, &srv.base_url, 10).await;

    let res = admin(client.put(format!("{}/stock", srv.base_url)))
        .json(&json!({ "product_id": product_id, "stock": 50, "reason": "restock" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["quantity"], 50);
    assert_eq!(body["entry"]["type"], "MANUAL_ADJUSTMENT");
    assert_eq!(body["entry"]["quantity_delta"], 40);
    assert_eq!(body["entry"]["previous_stock"], 10);
    assert_eq!(body["entry"]["new_stock"], 50);

    let res = admin(client.get(format!("{}/stock/history?limit=5", srv.base_url)))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["history"][0]["type"], "MANUAL_ADJUSTMENT");
    assert_eq!(body["history"][0]["reason"], "restock");
}

#[tokio::test]
async fn vip_sync_reconciles_against_provider_stock() {
    let (srv, _provider) = spawn_storefront().await;
    let client = reqwest::Client::new();

    create_product(&client, &srv.base_url, 4).await;

    // Stub provider reports 9 for every code.
    let res = admin(client.post(format!("{}/vip-sync", srv.base_url)))
        .json(&json!({ "action": "sync-stock" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["synced"], 1);
    assert_eq!(body["updated"], 1);

    let res = admin(client.get(format!("{}/stock", srv.base_url)))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["stock"][0]["quantity"], 9);

    // A second sync is a no-op and writes no further history.
    let res = admin(client.post(format!("{}/vip-sync", srv.base_url)))
        .json(&json!({ "action": "sync-stock" }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["synced"], 1);
    assert_eq!(body["updated"], 0);
}

#[tokio::test]
async fn checkout_flow_reaches_success_end_to_end() {
    let (srv, _provider) = spawn_storefront().await;
    let client = reqwest::Client::new();

    let product_id = create_product(&client, &srv.base_url, 5).await;

    // Draft.
    let res = customer(client.post(format!("{}/checkout/orders", srv.base_url)))
        .json(&json!({ "game": "free-fire", "account_id": "12345" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let order: serde_json::Value = res.json().await.unwrap();
    let order_id = order["id"].as_str().unwrap().to_string();
    assert_eq!(order["status"], "draft");

    // Validate.
    let res = customer(client.post(format!(
        "{}/checkout/orders/{order_id}/validate",
        srv.base_url
    )))
    .send()
    .await
    .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["display_name"], "player-one");

    // Select.
    let res = customer(client.post(format!(
        "{}/checkout/orders/{order_id}/select",
        srv.base_url
    )))
    .json(&json!({ "product_id": product_id }))
    .send()
    .await
    .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Submit: accepted, polling, trxid assigned.
    let res = customer(client.post(format!(
        "{}/checkout/orders/{order_id}/submit",
        srv.base_url
    )))
    .send()
    .await
    .unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "polling");
    assert_eq!(body["display_status"], "still processing");
    assert_eq!(body["provider_transaction_id"], "TRX-100");

    // Background poller observes the stub's success.
    let body = get_order_eventually(&client, &srv.base_url, &order_id, "success").await;
    assert_eq!(body["note"], "delivered");

    // Local stock was decremented once and never restored.
    let res = admin(client.get(format!("{}/stock", srv.base_url)))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["stock"][0]["quantity"], 4);
}

#[tokio::test]
async fn unknown_account_maps_to_not_found() {
    let (srv, _provider) = spawn_storefront().await;
    let client = reqwest::Client::new();

    let res = customer(client.post(format!("{}/checkout/validate", srv.base_url)))
        .json(&json!({ "game": "free-fire", "account_id": "404" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "account_not_found");
}

#[tokio::test]
async fn exhausted_local_stock_is_a_conflict_before_submission() {
    let (srv, _provider) = spawn_storefront().await;
    let client = reqwest::Client::new();

    let product_id = create_product(&client, &srv.base_url, 0).await;

    let res = customer(client.post(format!("{}/checkout/orders", srv.base_url)))
        .json(&json!({ "game": "free-fire", "account_id": "12345" }))
        .send()
        .await
        .unwrap();
    let order: serde_json::Value = res.json().await.unwrap();
    let order_id = order["id"].as_str().unwrap().to_string();

    customer(client.post(format!(
        "{}/checkout/orders/{order_id}/validate",
        srv.base_url
    )))
    .send()
    .await
    .unwrap();

    let res = customer(client.post(format!(
        "{}/checkout/orders/{order_id}/select",
        srv.base_url
    )))
    .json(&json!({ "product_id": product_id }))
    .send()
    .await
    .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "package_unavailable");
}

#[tokio::test]
async fn provider_balance_passthrough_for_admins() {
    let (srv, _provider) = spawn_storefront().await;
    let client = reqwest::Client::new();

    let res = admin(client.get(format!("{}/provider/balance", srv.base_url)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["balance"], 250000.0);
}
