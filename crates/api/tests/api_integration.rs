//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::VariantKey;
use metrics_exporter_prometheus::PrometheusHandle;
use orders::RecordingNotifier;
use serde_json::{Value, json};
use store::{InMemoryStore, ProductRecord, StockLedger};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            api::routes::metrics::install_recorder().expect("failed to install Prometheus recorder")
        })
        .clone()
}

const ALICE: &str = "8f9c1a52-5d0e-4c8e-9f35-0a7d6c3b2e11";
const BOB: &str = "1b2d3e4f-6a7b-4c8d-9e0f-112233445566";
const ADMIN: &str = "00000000-0000-4000-8000-000000000001";

struct TestApp {
    app: axum::Router,
    store: InMemoryStore,
    notifier: RecordingNotifier,
}

impl TestApp {
    async fn new(stock: u32) -> Self {
        let store = InMemoryStore::new();
        store
            .insert_product(
                ProductRecord::new("tee", "Classic Tee", 2000).with_variant("M", "red", stock),
            )
            .await;
        store.insert_size("M", "Medium").await;
        store.insert_color("red", "Red").await;

        let notifier = RecordingNotifier::new();
        let state = api::create_state(store.clone(), Arc::new(notifier.clone()));
        let app = api::create_app(state, get_metrics_handle());
        Self {
            app,
            store,
            notifier,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    async fn stock(&self) -> u32 {
        self.store
            .variant_stock(&VariantKey::new("tee", "M", "red"))
            .await
            .unwrap()
            .unwrap()
            .stock
    }

    async fn place(&self, user: &str, quantity: i64) -> (StatusCode, Value) {
        self.send(json_request(
            "POST",
            "/orders",
            Some(user),
            false,
            json!({
                "items": [{
                    "product_id": "tee",
                    "size_id": "M",
                    "color_id": "red",
                    "quantity": quantity
                }]
            }),
        ))
        .await
    }
}

fn request(method: &str, uri: &str, user: Option<&str>, admin: bool) -> axum::http::request::Builder {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    if admin {
        builder = builder.header("x-role", "admin");
    }
    builder
}

fn json_request(
    method: &str,
    uri: &str,
    user: Option<&str>,
    admin: bool,
    body: Value,
) -> Request<Body> {
    request(method, uri, user, admin)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str, user: Option<&str>, admin: bool) -> Request<Body> {
    request(method, uri, user, admin)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new(5).await;

    let (status, json) = app.send(empty_request("GET", "/health", None, false)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_create_order() {
    let app = TestApp::new(5).await;

    let (status, json) = app.place(ALICE, 2).await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(json["order_id"].is_string());
    let order = &json["order"];
    assert_eq!(order["status"], "pending");
    assert_eq!(order["user_id"], ALICE);
    assert_eq!(order["total"], 4000);
    assert_eq!(order["items"][0]["product_name"], "Classic Tee");
    assert_eq!(order["items"][0]["size_name"], "Medium");
    assert_eq!(order["items"][0]["color_name"], "Red");
    assert_eq!(order["items"][0]["stock_before_purchase"], 5);
    assert_eq!(order["items"][0]["stock_at_purchase"], 3);

    assert_eq!(app.stock().await, 3);
    assert_eq!(app.notifier.len(), 1);
}

#[tokio::test]
async fn test_create_order_keeps_shipping_info() {
    let app = TestApp::new(5).await;

    let (status, json) = app
        .send(json_request(
            "POST",
            "/orders",
            Some(ALICE),
            false,
            json!({
                "items": [{ "product_id": "tee", "size_id": "M", "color_id": "red", "quantity": 1 }],
                "shipping_info": { "recipient": "Alice", "city": "Lisbon" }
            }),
        ))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["order"]["shipping_info"]["recipient"], "Alice");
    assert_eq!(json["order"]["shipping_info"]["city"], "Lisbon");
}

#[tokio::test]
async fn test_create_order_requires_caller() {
    let app = TestApp::new(5).await;

    let (status, json) = app
        .send(json_request(
            "POST",
            "/orders",
            None,
            false,
            json!({ "items": [] }),
        ))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json["error"].as_str().unwrap().contains("x-user-id"));
    assert_eq!(app.stock().await, 5);
}

#[tokio::test]
async fn test_create_order_insufficient_stock() {
    let app = TestApp::new(5).await;

    let (status, json) = app.place(ALICE, 10).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["product_id"], "tee");
    assert_eq!(json["size_id"], "M");
    assert_eq!(json["color_id"], "red");
    assert_eq!(app.stock().await, 5);
    assert!(app.notifier.is_empty());
}

#[tokio::test]
async fn test_create_order_rejects_bad_quantities() {
    let app = TestApp::new(5).await;

    let (negative, _) = app.place(ALICE, -1).await;
    let (zero, _) = app.place(ALICE, 0).await;
    let (empty, _) = app
        .send(json_request(
            "POST",
            "/orders",
            Some(ALICE),
            false,
            json!({ "items": [] }),
        ))
        .await;

    assert_eq!(negative, StatusCode::BAD_REQUEST);
    assert_eq!(zero, StatusCode::BAD_REQUEST);
    assert_eq!(empty, StatusCode::BAD_REQUEST);
    assert_eq!(app.stock().await, 5);
}

#[tokio::test]
async fn test_get_order_is_scoped_to_owner() {
    let app = TestApp::new(5).await;
    let (_, created) = app.place(ALICE, 1).await;
    let uri = format!("/orders/{}", created["order_id"].as_str().unwrap());

    let (own, json) = app.send(empty_request("GET", &uri, Some(ALICE), false)).await;
    let (other, _) = app.send(empty_request("GET", &uri, Some(BOB), false)).await;
    let (admin, _) = app.send(empty_request("GET", &uri, Some(ADMIN), true)).await;

    assert_eq!(own, StatusCode::OK);
    assert_eq!(json["order_id"], created["order_id"]);
    assert_eq!(other, StatusCode::NOT_FOUND);
    assert_eq!(admin, StatusCode::OK);
}

#[tokio::test]
async fn test_get_order_invalid_id() {
    let app = TestApp::new(5).await;

    let (status, _) = app
        .send(empty_request("GET", "/orders/not-a-uuid", Some(ALICE), false))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_own_orders() {
    let app = TestApp::new(10).await;
    app.place(ALICE, 1).await;
    app.place(ALICE, 2).await;
    app.place(BOB, 1).await;

    let (status, json) = app.send(empty_request("GET", "/orders", Some(ALICE), false)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 2);

    let (_, paged) = app
        .send(empty_request("GET", "/orders?limit=1", Some(ALICE), false))
        .await;
    assert_eq!(paged.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_admin_routes_require_admin_role() {
    let app = TestApp::new(5).await;
    let (_, created) = app.place(ALICE, 1).await;
    let id = created["order_id"].as_str().unwrap();

    let (list, _) = app
        .send(empty_request("GET", "/admin/orders", Some(ALICE), false))
        .await;
    let (cancel, _) = app
        .send(empty_request(
            "POST",
            &format!("/admin/orders/{id}/cancel"),
            Some(ALICE),
            false,
        ))
        .await;

    assert_eq!(list, StatusCode::FORBIDDEN);
    assert_eq!(cancel, StatusCode::FORBIDDEN);
    assert_eq!(app.stock().await, 4);
}

#[tokio::test]
async fn test_admin_list_filters_by_status() {
    let app = TestApp::new(10).await;
    let (_, first) = app.place(ALICE, 1).await;
    app.place(BOB, 1).await;
    let id = first["order_id"].as_str().unwrap();

    let (status, shipped) = app
        .send(json_request(
            "PATCH",
            &format!("/admin/orders/{id}"),
            Some(ADMIN),
            true,
            json!({ "status": "shipped", "tracking_number": "TRK-1" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shipped["status"], "shipped");
    assert_eq!(shipped["tracking_number"], "TRK-1");

    let (_, all) = app
        .send(empty_request("GET", "/admin/orders", Some(ADMIN), true))
        .await;
    let (_, only_shipped) = app
        .send(empty_request(
            "GET",
            "/admin/orders?status=shipped",
            Some(ADMIN),
            true,
        ))
        .await;
    let (bad, _) = app
        .send(empty_request(
            "GET",
            "/admin/orders?status=lost",
            Some(ADMIN),
            true,
        ))
        .await;

    assert_eq!(all.as_array().unwrap().len(), 2);
    assert_eq!(only_shipped.as_array().unwrap().len(), 1);
    assert_eq!(only_shipped[0]["order_id"], first["order_id"]);
    assert_eq!(bad, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_edit_adjusts_stock_by_difference() {
    let app = TestApp::new(10).await;
    let (_, created) = app.place(ALICE, 2).await;
    let id = created["order_id"].as_str().unwrap();
    assert_eq!(app.stock().await, 8);

    let (status, json) = app
        .send(json_request(
            "PATCH",
            &format!("/admin/orders/{id}"),
            Some(ADMIN),
            true,
            json!({
                "items": [{ "product_id": "tee", "size_id": "M", "color_id": "red", "quantity": 5 }]
            }),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["items"][0]["quantity"], 5);
    assert_eq!(json["items"][0]["stock_before_purchase"], 10);
    assert_eq!(json["total"], 10000);
    assert_eq!(app.stock().await, 5);
}

#[tokio::test]
async fn test_admin_edit_beyond_stock_conflicts() {
    let app = TestApp::new(4).await;
    let (_, created) = app.place(ALICE, 2).await;
    let id = created["order_id"].as_str().unwrap();

    let (status, json) = app
        .send(json_request(
            "PATCH",
            &format!("/admin/orders/{id}"),
            Some(ADMIN),
            true,
            json!({
                "items": [{ "product_id": "tee", "size_id": "M", "color_id": "red", "quantity": 7 }]
            }),
        ))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["product_id"], "tee");
    assert_eq!(app.stock().await, 2);
}

#[tokio::test]
async fn test_cancel_restores_stock_once() {
    let app = TestApp::new(5).await;
    let (_, created) = app.place(ALICE, 3).await;
    let uri = format!(
        "/admin/orders/{}/cancel",
        created["order_id"].as_str().unwrap()
    );
    assert_eq!(app.stock().await, 2);

    let (first, json) = app.send(empty_request("POST", &uri, Some(ADMIN), true)).await;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(json["status"], "cancelled");
    assert_eq!(app.stock().await, 5);

    let (second, json) = app.send(empty_request("POST", &uri, Some(ADMIN), true)).await;
    assert_eq!(second, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("pending"));
    assert_eq!(app.stock().await, 5);
}

#[tokio::test]
async fn test_cancel_unknown_order() {
    let app = TestApp::new(5).await;

    let (status, _) = app
        .send(empty_request(
            "POST",
            "/admin/orders/4a4b7c1e-9b1e-4bb2-8d7e-5f6a7b8c9d0e/cancel",
            Some(ADMIN),
            true,
        ))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = TestApp::new(5).await;
    app.place(ALICE, 1).await;

    let response = app
        .app
        .clone()
        .oneshot(empty_request("GET", "/metrics", None, false))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("orders_placed_total"));
}
