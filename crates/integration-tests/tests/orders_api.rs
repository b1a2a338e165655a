//! End-to-end tests for the orders API surface.
//!
//! Drives the real router with `tower::ServiceExt::oneshot` over the
//! in-memory store: request parsing, auth extractors, the order workflow,
//! and the JSON error contract are all exercised together.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tower::ServiceExt;

use cartwright_core::ProductId;
use cartwright_integration_tests::{TestApp, product, test_app};

async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router
        .clone()
        .oneshot(request)
        .await
        .expect("infallible service")
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

fn json_request(method: &str, uri: &str, user: Option<(i32, bool)>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some((user_id, is_admin)) = user {
        builder = builder.header("x-auth-user-id", user_id.to_string());
        if is_admin {
            builder = builder.header("x-auth-role", "admin");
        }
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get_request(uri: &str, user: Option<(i32, bool)>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some((user_id, is_admin)) = user {
        builder = builder.header("x-auth-user-id", user_id.to_string());
        if is_admin {
            builder = builder.header("x-auth-role", "admin");
        }
    }
    builder.body(Body::empty()).expect("request")
}

fn dec(value: &Value) -> Decimal {
    value
        .as_str()
        .expect("decimal string")
        .parse()
        .expect("valid decimal")
}

fn cart(items: Value) -> Value {
    json!({
        "items": items,
        "shippingAddress": {"street": "1 Main St", "city": "Portland", "zip": "97201"},
        "paymentMethod": "card",
    })
}

#[tokio::test]
async fn test_health_endpoints() {
    let TestApp { router, .. } = test_app();

    let response = send(&router, get_request("/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&router, get_request("/health/ready", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_place_order_end_to_end() {
    let TestApp { router, store } = test_app();
    store.put_product(product(1, "10.00", 5)).await;

    let mut body = cart(json!([{"productId": 1, "quantity": 3}]));
    body["shippingCost"] = json!("2.00");
    body["tax"] = json!("1.00");

    let response = send(
        &router,
        json_request("POST", "/api/orders", Some((1, false)), &body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let order = body_json(response).await;
    assert_eq!(order["userId"], 1);
    assert_eq!(order["status"], "processing");
    assert_eq!(dec(&order["subtotal"]), Decimal::new(3000, 2));
    assert_eq!(dec(&order["total"]), Decimal::new(3300, 2));
    assert_eq!(order["items"].as_array().expect("items").len(), 1);
    assert_eq!(order["items"][0]["quantity"], 3);
    assert_eq!(dec(&order["items"][0]["price"]), Decimal::new(1000, 2));
    assert_eq!(order["items"][0]["product"]["stock"], 2);

    assert_eq!(store.product_stock(ProductId::new(1)).await, Some(2));
}

#[tokio::test]
async fn test_place_order_requires_authentication() {
    let TestApp { router, store } = test_app();
    store.put_product(product(1, "10.00", 5)).await;

    let body = cart(json!([{"productId": 1, "quantity": 1}]));
    let response = send(&router, json_request("POST", "/api/orders", None, &body)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let error = body_json(response).await;
    assert_eq!(error["code"], "authentication_required");
    assert_eq!(store.product_stock(ProductId::new(1)).await, Some(5));
}

#[tokio::test]
async fn test_empty_cart_is_a_bad_request() {
    let TestApp { router, .. } = test_app();

    let body = cart(json!([]));
    let response = send(
        &router,
        json_request("POST", "/api/orders", Some((1, false)), &body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let error = body_json(response).await;
    assert_eq!(error["code"], "invalid_request");
}

#[tokio::test]
async fn test_insufficient_stock_conflict_with_detail() {
    let TestApp { router, store } = test_app();
    store.put_product(product(1, "10.00", 5)).await;
    store.put_product(product(2, "5.00", 1)).await;

    let body = cart(json!([
        {"productId": 1, "quantity": 2},
        {"productId": 2, "quantity": 4},
    ]));
    let response = send(
        &router,
        json_request("POST", "/api/orders", Some((1, false)), &body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let error = body_json(response).await;
    assert_eq!(error["code"], "insufficient_stock");
    assert_eq!(error["productId"], 2);
    assert_eq!(error["requested"], 4);
    assert_eq!(error["available"], 1);

    // no partial decrement from the passing first line
    assert_eq!(store.product_stock(ProductId::new(1)).await, Some(5));
    assert_eq!(store.product_stock(ProductId::new(2)).await, Some(1));
}

#[tokio::test]
async fn test_malformed_body_gets_json_error_body() {
    let TestApp { router, .. } = test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/orders")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-auth-user-id", "1")
        .body(Body::from("{not json"))
        .expect("request");

    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(error["code"], "invalid_request");
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let TestApp { router, store } = test_app();
    store.put_product(product(1, "10.00", 5)).await;

    let body = cart(json!([{"productId": 99, "quantity": 1}]));
    let response = send(
        &router,
        json_request("POST", "/api/orders", Some((1, false)), &body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let error = body_json(response).await;
    assert_eq!(error["code"], "product_not_found");
    assert_eq!(error["productId"], 99);
}

#[tokio::test]
async fn test_get_order_ownership_and_roundtrip() {
    let TestApp { router, store } = test_app();
    store.put_product(product(1, "10.00", 5)).await;

    let body = cart(json!([{"productId": 1, "quantity": 2}]));
    let response = send(
        &router,
        json_request("POST", "/api/orders", Some((7, false)), &body),
    )
    .await;
    let order = body_json(response).await;
    let order_id = order["id"].as_i64().expect("order id");
    let uri = format!("/api/orders/{order_id}");

    // owner sees the order, items and snapshot prices intact
    let response = send(&router, get_request(&uri, Some((7, false)))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = body_json(response).await;
    assert_eq!(fetched["items"], order["items"]);
    assert_eq!(fetched["total"], order["total"]);

    // another user is denied, an admin is not
    let response = send(&router, get_request(&uri, Some((8, false)))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = send(&router, get_request(&uri, Some((8, true)))).await;
    assert_eq!(response.status(), StatusCode::OK);

    // unknown order
    let response = send(&router, get_request("/api/orders/404", Some((7, false)))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_status_is_admin_only() {
    let TestApp { router, store } = test_app();
    store.put_product(product(1, "10.00", 5)).await;

    let body = cart(json!([{"productId": 1, "quantity": 1}]));
    let response = send(
        &router,
        json_request("POST", "/api/orders", Some((1, false)), &body),
    )
    .await;
    let order = body_json(response).await;
    let uri = format!("/api/orders/{}", order["id"]);

    let patch = json!({"status": "shipped", "trackingNumber": "1Z999"});

    // the order's owner is not enough
    let response = send(&router, json_request("PATCH", &uri, Some((1, false)), &patch)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&router, json_request("PATCH", &uri, Some((2, true)), &patch)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["status"], "shipped");
    assert_eq!(updated["trackingNumber"], "1Z999");

    // unknown status values never reach the workflow, and the rejection
    // uses the same error body as every other client error
    let bad = json!({"status": "refunded"});
    let response = send(&router, json_request("PATCH", &uri, Some((2, true)), &bad)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(error["code"], "invalid_request");

    // unknown order
    let response = send(
        &router,
        json_request("PATCH", "/api/orders/404", Some((2, true)), &patch),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let error = body_json(response).await;
    assert_eq!(error["code"], "order_not_found");
}
