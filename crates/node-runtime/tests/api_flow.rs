//! # Registration API Integration Tests
//!
//! Runs the real node wiring (container + axum server on an ephemeral port)
//! and drives it over HTTP the way a merchant would.

use std::time::Duration;

use node_runtime::api::{build_router, serve, AppState};
use node_runtime::container::{NodeConfig, StorageBackend, SubsystemContainer};
use serde_json::{json, Value};
use tokio::sync::watch;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WATCHED: &str = "qc1qwatchedaddressxxxxxxxxxxxxxxxxxxxxxxxxxxxxx";
const PAYER: &str = "qc1qpayeraddressxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx";

struct TestNode {
    base: String,
    container: SubsystemContainer,
    shutdown: watch::Sender<bool>,
}

async fn start_node() -> TestNode {
    let mut config = NodeConfig::default();
    config.storage.backend = StorageBackend::Memory;

    let (shutdown, shutdown_rx) = watch::channel(false);
    let container = SubsystemContainer::new(config, shutdown_rx.clone()).unwrap();
    let router = build_router(AppState::from_container(&container));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(serve(listener, router, shutdown_rx));

    TestNode {
        base,
        container,
        shutdown,
    }
}

async fn post(client: &reqwest::Client, url: String, body: Value) -> (u16, Value) {
    let response = client.post(url).json(&body).send().await.unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_registered_url_receives_payment_notification() {
    let merchant = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/paid"))
        .and(body_json(json!({
            "asset_id": "X",
            "amount": 100,
            "address": WATCHED,
            "tx_id": "ab01"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&merchant)
        .await;

    let node = start_node().await;
    let client = reqwest::Client::new();

    let (status, body) = post(
        &client,
        format!("{}/add-address-callback", node.base),
        json!({"address": WATCHED, "url": format!("{}/paid", merchant.uri())}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "success");

    let (status, _) = post(
        &client,
        format!("{}/submit-transaction", node.base),
        json!({
            "tx_id": "ab01",
            "inputs": [{"address": PAYER, "asset_id": "X", "amount": 110}],
            "outputs": [{"address": WATCHED, "asset_id": "X", "amount": 100}]
        }),
    )
    .await;
    assert_eq!(status, 202);

    let log = node.container.delivery_log();
    for _ in 0..200 {
        if !log.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let records: Value = client
        .get(format!("{}/delivery-log", node.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(records["data"][0]["outcome"], "delivered");
    assert_eq!(records["data"][0]["status"], 200);

    node.shutdown.send(true).unwrap();
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let node = start_node().await;
    let client = reqwest::Client::new();
    let body = json!({"address": WATCHED, "url": "https://merchant.example.com/hook"});

    let (status, _) = post(&client, format!("{}/add-address-callback", node.base), body.clone()).await;
    assert_eq!(status, 200);

    let (status, body) = post(&client, format!("{}/add-address-callback", node.base), body).await;
    assert_eq!(status, 400);
    assert_eq!(body["status"], "fail");
    assert_eq!(body["code"], "DUPLICATE_URL");

    node.shutdown.send(true).unwrap();
}
