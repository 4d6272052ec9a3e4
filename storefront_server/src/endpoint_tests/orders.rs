use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::{json, Value};
use sf_common::Paise;
use storefront_engine::{
    db_types::{Order, OrderStatus, PaymentStatus},
    traits::{Pagination, RemoteOrder, RemotePayment, RemotePaymentStatus},
    GatewayError,
    OrderLedger,
};

use super::{helpers::*, mocks::MockGateway};
use crate::data_objects::{CreateOrderResponse, GatewayKey, OrderPageResponse, OrderResponse};

fn minting_gateway() -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway.expect_mint_order().times(1).returning(|req| {
        Ok(RemoteOrder {
            id: "order_IluGWxBm9U8zJ8".into(),
            amount: req.amount,
            currency: req.currency,
            receipt: Some(req.receipt),
        })
    });
    gateway
}

fn order_body(product_id: i64, quantity: i64) -> Value {
    json!({
        "items": [{ "product_id": product_id, "quantity": quantity }],
        "billing_address": { "name": "Asha Rao", "email": "asha@example.com", "city": "Pune" }
    })
}

#[actix_web::test]
async fn health_check() {
    let db = setup_db().await;
    let (status, body) = send(&db, MockGateway::new(), TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
    tear_down(db).await;
}

#[actix_web::test]
async fn api_requires_a_valid_session() {
    let db = setup_db().await;
    let req = TestRequest::get().uri("/api/orders/mine");
    let (status, body) = send(&db, MockGateway::new(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("No bearer token was provided"), "{body}");

    let req = with_token(TestRequest::get().uri("/api/orders/mine"), "not-a-session");
    let (status, body) = send(&db, MockGateway::new(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("The bearer token is not valid"), "{body}");

    let req = with_token(TestRequest::get().uri("/api/orders/mine"), EXPIRED_TOKEN);
    let (status, body) = send(&db, MockGateway::new(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("The session has expired"), "{body}");
    tear_down(db).await;
}

#[actix_web::test]
async fn gateway_key() {
    let db = setup_db().await;
    // No session needed
    let req = TestRequest::get().uri("/api/gateway_key");
    let (status, body) = send(&db, MockGateway::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    let key: GatewayKey = serde_json::from_str(&body).unwrap();
    assert_eq!(key.key, GATEWAY_KEY);
    // A stale token is not rejected either
    let req = with_token(TestRequest::get().uri("/api/gateway_key"), EXPIRED_TOKEN);
    let (status, _) = send(&db, MockGateway::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    // Neighbouring routes stay behind the session check
    let req = TestRequest::get().uri("/api/orders/mine");
    let (status, _) = send(&db, MockGateway::new(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    tear_down(db).await;
}

#[actix_web::test]
async fn create_order() {
    let db = setup_db().await;
    let ebook = add_product(&db, "Ebook", 500, 10).await;
    let req = with_token(TestRequest::post().uri("/api/orders"), BUYER_TOKEN).set_json(order_body(ebook.id, 2));
    let (status, body) = send(&db, minting_gateway(), req).await;
    assert_eq!(status, StatusCode::CREATED);
    let created: CreateOrderResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(created.local_order.total_amount, Paise::from(100_000));
    assert_eq!(created.local_order.currency, "INR");
    assert_eq!(created.remote_order.id, "order_IluGWxBm9U8zJ8");
    assert_eq!(created.remote_order.amount, Paise::from(100_000));
    assert_eq!(created.remote_order.key, GATEWAY_KEY);

    let order = db.fetch_order(created.local_order.id).await.unwrap().unwrap();
    assert_eq!(order.buyer_id, BUYER);
    assert_eq!(order.state(), "pending/pending");
    assert_eq!(order.remote_order_id.as_deref(), Some("order_IluGWxBm9U8zJ8"));
    assert_eq!(order.billing_address.city.as_deref(), Some("Pune"));
    tear_down(db).await;
}

#[actix_web::test]
async fn create_order_validation_errors() {
    let db = setup_db().await;
    let ebook = add_product(&db, "Ebook", 500, 1).await;
    let cases = [
        (json!({ "items": [], "billing_address": { "name": "A", "email": "a@b.c" } }), "does not contain any items"),
        (order_body(ebook.id, 2), "Only 1 units"),
        (order_body(9_999, 1), "Product #9999 does not exist"),
        (order_body(ebook.id, 0), "must be at least 1"),
    ];
    for (body, expected) in cases {
        let mut gateway = MockGateway::new();
        gateway.expect_mint_order().never();
        let req = with_token(TestRequest::post().uri("/api/orders"), BUYER_TOKEN).set_json(body);
        let (status, body) = send(&db, gateway, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains(expected), "Expected '{expected}' in {body}");
    }
    // Malformed bodies are rejected before they reach the engine
    let req = with_token(TestRequest::post().uri("/api/orders"), BUYER_TOKEN)
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"items\": 7}");
    let (status, body) = send(&db, MockGateway::new(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with("{\"error\":"), "{body}");
    tear_down(db).await;
}

#[actix_web::test]
async fn gateway_outage_leaves_no_order() {
    let db = setup_db().await;
    let ebook = add_product(&db, "Ebook", 500, 10).await;
    let mut gateway = MockGateway::new();
    gateway.expect_mint_order().times(1).returning(|_| Err(GatewayError::Unreachable("operation timed out".into())));
    let req = with_token(TestRequest::post().uri("/api/orders"), BUYER_TOKEN).set_json(order_body(ebook.id, 1));
    let (status, body) = send(&db, gateway, req).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("operation timed out"), "{body}");

    let req = with_token(TestRequest::get().uri("/api/orders/mine"), BUYER_TOKEN);
    let (status, body) = send(&db, MockGateway::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");
    tear_down(db).await;
}

#[actix_web::test]
async fn verify_payment() {
    let db = setup_db().await;
    let ebook = add_product(&db, "Ebook", 500, 10).await;
    let order = seed_order(&db, BUYER, &ebook, "order_9A33XWu170gUtm").await;
    let receipt = json!({
        "order_id": order.id,
        "remote_order_id": "order_9A33XWu170gUtm",
        "remote_payment_id": "pay_29QQoUBi66xm2f",
        "signature": receipt_signature("order_9A33XWu170gUtm", "pay_29QQoUBi66xm2f"),
    });

    // Someone else's order
    let req = with_token(TestRequest::post().uri("/api/orders/verify"), OTHER_TOKEN).set_json(&receipt);
    let (status, _) = send(&db, MockGateway::new(), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let mut gateway = MockGateway::new();
    gateway.expect_fetch_payment().times(1).returning(|id| {
        Ok(RemotePayment {
            id: id.to_string(),
            order_id: Some("order_9A33XWu170gUtm".into()),
            amount: Paise::from(50_000),
            status: RemotePaymentStatus::Captured,
        })
    });
    let req = with_token(TestRequest::post().uri("/api/orders/verify"), BUYER_TOKEN).set_json(&receipt);
    let (status, body) = send(&db, gateway, req).await;
    assert_eq!(status, StatusCode::OK);
    let response: OrderResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(response.order.id, order.id);
    assert_eq!(response.order.status, OrderStatus::Completed);
    assert_eq!(response.order.payment_status, PaymentStatus::Paid);

    // A repeated callback does not go back to the gateway
    let mut gateway = MockGateway::new();
    gateway.expect_fetch_payment().never();
    let req = with_token(TestRequest::post().uri("/api/orders/verify"), BUYER_TOKEN).set_json(&receipt);
    let (status, _) = send(&db, gateway, req).await;
    assert_eq!(status, StatusCode::OK);
    let stored = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.remote_payment_id.as_deref(), Some("pay_29QQoUBi66xm2f"));
    tear_down(db).await;
}

#[actix_web::test]
async fn tampered_receipt_fails_the_order() {
    let db = setup_db().await;
    let ebook = add_product(&db, "Ebook", 500, 10).await;
    let order = seed_order(&db, BUYER, &ebook, "order_9A33XWu170gUtm").await;
    let receipt = json!({
        "order_id": order.id,
        "remote_order_id": "order_9A33XWu170gUtm",
        "remote_payment_id": "pay_29QQoUBi66xm2f",
        "signature": receipt_signature("order_9A33XWu170gUtm", "pay_somebody_else"),
    });
    let mut gateway = MockGateway::new();
    gateway.expect_fetch_payment().never();
    let req = with_token(TestRequest::post().uri("/api/orders/verify"), BUYER_TOKEN).set_json(&receipt);
    let (status, body) = send(&db, gateway, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Invalid payment signature"), "{body}");
    let order = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.state(), "cancelled/failed");

    // Missing fields never reach the engine
    let req = with_token(TestRequest::post().uri("/api/orders/verify"), BUYER_TOKEN)
        .set_json(json!({ "order_id": order.id, "remote_order_id": "order_9A33XWu170gUtm" }));
    let (status, body) = send(&db, MockGateway::new(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("missing field"), "{body}");
    tear_down(db).await;
}

#[actix_web::test]
async fn report_payment_failure() {
    let db = setup_db().await;
    let ebook = add_product(&db, "Ebook", 500, 10).await;
    let order = seed_order(&db, BUYER, &ebook, "order_abandoned").await;
    let body = json!({ "order_id": order.id, "reason": "Buyer closed the checkout" });
    let req = with_token(TestRequest::post().uri("/api/orders/payment_failed"), OTHER_TOKEN).set_json(&body);
    let (status, _) = send(&db, MockGateway::new(), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = with_token(TestRequest::post().uri("/api/orders/payment_failed"), BUYER_TOKEN).set_json(&body);
    let (status, body) = send(&db, MockGateway::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    let response: OrderResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(response.order.payment_status, PaymentStatus::Failed);
    let order = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.note.as_deref(), Some("Buyer closed the checkout"));

    let body = json!({ "order_id": 9_999 });
    let req = with_token(TestRequest::post().uri("/api/orders/payment_failed"), BUYER_TOKEN).set_json(&body);
    let (status, _) = send(&db, MockGateway::new(), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    tear_down(db).await;
}

#[actix_web::test]
async fn order_visibility() {
    let db = setup_db().await;
    let ebook = add_product(&db, "Ebook", 500, 10).await;
    let order = seed_order(&db, BUYER, &ebook, "order_1").await;
    seed_order(&db, OTHER_BUYER, &ebook, "order_2").await;
    let path = format!("/api/orders/{}", order.id);

    let (status, body) = send(&db, MockGateway::new(), with_token(TestRequest::get().uri(&path), BUYER_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    let fetched: Order = serde_json::from_str(&body).unwrap();
    assert_eq!(fetched, order);
    let (status, _) = send(&db, MockGateway::new(), with_token(TestRequest::get().uri(&path), ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&db, MockGateway::new(), with_token(TestRequest::get().uri(&path), OTHER_TOKEN)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let req = with_token(TestRequest::get().uri("/api/orders/9999"), BUYER_TOKEN);
    let (status, _) = send(&db, MockGateway::new(), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = with_token(TestRequest::get().uri("/api/orders/mine"), BUYER_TOKEN);
    let (status, body) = send(&db, MockGateway::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    let mine: Vec<Order> = serde_json::from_str(&body).unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, order.id);
    tear_down(db).await;
}

#[actix_web::test]
async fn admin_routes() {
    let db = setup_db().await;
    let ebook = add_product(&db, "Ebook", 500, 100).await;
    for i in 0..7 {
        seed_order(&db, BUYER, &ebook, &format!("order_{i}")).await;
    }
    let req = with_token(TestRequest::get().uri("/api/admin/orders?page=2&limit=5"), BUYER_TOKEN);
    let (status, body) = send(&db, MockGateway::new(), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("Insufficient Permissions"), "{body}");

    let req = with_token(TestRequest::get().uri("/api/admin/orders?page=2&limit=5"), ADMIN_TOKEN);
    let (status, body) = send(&db, MockGateway::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    let page: OrderPageResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(page.orders.len(), 2);
    assert_eq!(page.pagination.page, 2);
    assert_eq!(page.pagination.limit, 5);
    assert_eq!(page.pagination.total, 7);
    assert_eq!(page.pagination.pages, 2);

    let req = with_token(TestRequest::get().uri("/api/admin/orders?page=two"), ADMIN_TOKEN);
    let (status, _) = send(&db, MockGateway::new(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/api/admin/orders?page={}&limit=100", i64::MAX);
    let (status, body) = send(&db, MockGateway::new(), with_token(TestRequest::get().uri(&uri), ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    let page: OrderPageResponse = serde_json::from_str(&body).unwrap();
    assert!(page.orders.is_empty());
    assert_eq!(page.pagination.page, Pagination::MAX_PAGE);
    assert_eq!(page.pagination.total, 7);

    let paid = seed_paid_order(&db, &ebook, "pay_history").await;
    let path = format!("/api/orders/{}/history", paid.id);
    let (status, _) = send(&db, MockGateway::new(), with_token(TestRequest::get().uri(&path), BUYER_TOKEN)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = send(&db, MockGateway::new(), with_token(TestRequest::get().uri(&path), ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    let history: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1]["payment_status"], "paid");
    tear_down(db).await;
}

#[actix_web::test]
async fn downloads() {
    let db = setup_db().await;
    let ebook = add_product(&db, "Ebook", 500, 10).await;
    let unpaid = seed_order(&db, BUYER, &ebook, "order_unpaid").await;
    let path = format!("/api/orders/{}/download/{}", unpaid.id, ebook.id);
    let (status, body) = send(&db, MockGateway::new(), with_token(TestRequest::get().uri(&path), BUYER_TOKEN)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("has not been paid"), "{body}");

    let paid = seed_paid_order(&db, &ebook, "pay_download").await;
    let path = format!("/api/orders/{}/download/{}", paid.id, ebook.id);
    let (status, body) = send(&db, MockGateway::new(), with_token(TestRequest::get().uri(&path), BUYER_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    let grant: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(grant["product_id"], ebook.id);
    assert_eq!(grant["title"], "Ebook");
    assert_eq!(grant["downloads_remaining"], 4);
    assert!(grant["expires_at"].is_string());

    let (status, _) = send(&db, MockGateway::new(), with_token(TestRequest::get().uri(&path), OTHER_TOKEN)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let path = format!("/api/orders/{}/download/9999", paid.id);
    let (status, _) = send(&db, MockGateway::new(), with_token(TestRequest::get().uri(&path), BUYER_TOKEN)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    tear_down(db).await;
}
