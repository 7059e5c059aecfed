//! Integration tests for the API server.
//!
//! Every test starts the whole saga in-process with in-memory stores and
//! no simulated delays.

use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;

use api::{Config, StoreBackend, System};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::InMemoryBus;
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

async fn setup() -> (Router, System) {
    let config = Config {
        assembly_time_unit: Duration::ZERO,
        part_delivery_min: Duration::ZERO,
        part_delivery_max: Duration::ZERO,
        shutdown_grace: Duration::from_secs(1),
        ..Config::default()
    };
    let system = System::start(&config, &StoreBackend::Memory, InMemoryBus::new())
        .await
        .unwrap();
    let app = api::create_app(system.state(), get_metrics_handle());
    (app, system)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_order(app: &Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/orders")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

/// Polls `condition` until it holds or five seconds pass.
async fn eventually<F, Fut>(what: &str, mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

#[tokio::test]
async fn test_health_check() {
    let (app, system) = setup().await;

    let (status, json) = get_json(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["headquarters"], "london");
    assert_eq!(json["sites"], json!(["usa", "china"]));
    system.stop(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_create_order() {
    let (app, system) = setup().await;

    let (status, json) = post_order(&app, json!({"customer": "demo", "items": [1, 4]})).await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(json["orderID"].is_string());
    assert_eq!(json["customer"], "demo");
    assert_eq!(json["status"], "processing");
    assert_eq!(json["items"], json!([1, 4]));
    system.stop(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_created_order_is_fulfilled() {
    let (app, system) = setup().await;

    let (_, created) = post_order(&app, json!({"customer": "demo", "items": [1]})).await;
    let uri = format!("/orders/{}", created["orderID"].as_str().unwrap());

    eventually("order to be shipped", || async {
        let (_, order) = get_json(&app, &uri).await;
        order["status"] == "shipped"
    })
    .await;

    let (status, order) = get_json(&app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    // UltraCool9000: parts 1, 3 and 6
    assert_eq!(order["costsOfParts"], 139 + 18 + 98);
    system.stop(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_invalid_orders_are_rejected() {
    let (app, system) = setup().await;

    for body in [
        json!({"customer": "demo", "items": []}),
        json!({"customer": "", "items": [1]}),
        json!({"customer": "ghost", "items": [1]}),
        json!({"customer": "demo", "items": [99]}),
        json!({"items": [1]}),
    ] {
        let (status, json) = post_order(&app, body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert!(json["error"].is_string());
    }

    let (_, orders) = get_json(&app, "/orders").await;
    assert_eq!(orders, json!([]));
    system.stop(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_get_order_errors() {
    let (app, system) = setup().await;

    let (status, _) = get_json(&app, "/orders/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = get_json(&app, "/orders/00000000-0000-0000-0000-000000000000").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("not found"));
    system.stop(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_list_orders() {
    let (app, system) = setup().await;

    for items in [json!([1]), json!([2, 3])] {
        let (status, _) = post_order(&app, json!({"customer": "demo", "items": items})).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, orders) = get_json(&app, "/orders").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().unwrap().len(), 2);
    system.stop(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_kpi_retrieval() {
    let (app, system) = setup().await;

    let (status, json) = get_json(&app, "/kpi").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!([]));

    let (status, _) = get_json(&app, "/kpi/usa").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get_json(&app, "/kpi/atlantis").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    system.state().kpi.request_all().await;
    eventually("both sites to report", || async {
        let (_, json) = get_json(&app, "/kpi").await;
        json.as_array().is_some_and(|snapshots| snapshots.len() == 2)
    })
    .await;

    let (status, latest) = get_json(&app, "/kpi/china").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest["location"], "china");
    assert_eq!(latest["total"], 0);

    system.state().kpi.request_all().await;
    eventually("a second usa report", || async {
        let (_, json) = get_json(&app, "/kpi/usa/5").await;
        json.as_array().is_some_and(|snapshots| snapshots.len() == 2)
    })
    .await;

    let (status, history) = get_json(&app, "/kpi/usa/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);
    system.stop(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, system) = setup().await;
    post_order(&app, json!({"customer": "demo", "items": [2]})).await;

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("orders_created_total"));
    system.stop(Duration::from_secs(1)).await;
}
