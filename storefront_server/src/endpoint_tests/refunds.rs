use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;
use sf_common::Paise;
use storefront_engine::{db_types::PaymentStatus, traits::RemoteRefund, GatewayError, OrderLedger};

use super::{helpers::*, mocks::MockGateway};
use crate::data_objects::RefundResponse;

fn refunding_gateway() -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway.expect_refund().times(1).returning(|req| {
        assert_eq!(req.remote_payment_id, "pay_FgR9UMzgmKDJRi");
        Ok(RemoteRefund {
            id: "rfnd_FgRAHdNOM4ZVbO".into(),
            payment_id: req.remote_payment_id,
            amount: req.amount,
            status: "processed".into(),
        })
    });
    gateway
}

fn refund_uri(order_id: i64) -> String {
    format!("/api/orders/{order_id}/refund")
}

#[actix_web::test]
async fn only_admins_can_refund() {
    let db = setup_db().await;
    let ebook = add_product(&db, "Ebook", 500, 10).await;
    let order = seed_paid_order(&db, &ebook, "pay_FgR9UMzgmKDJRi").await;
    let mut gateway = MockGateway::new();
    gateway.expect_refund().never();
    let req = with_token(TestRequest::post().uri(&refund_uri(order.id)), BUYER_TOKEN).set_json(json!({}));
    let (status, body) = send(&db, gateway, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("Insufficient Permissions"), "{body}");
    let stored = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Paid);
    tear_down(db).await;
}

#[actix_web::test]
async fn full_refund() {
    let db = setup_db().await;
    let ebook = add_product(&db, "Ebook", 500, 10).await;
    let order = seed_paid_order(&db, &ebook, "pay_FgR9UMzgmKDJRi").await;
    let req = with_token(TestRequest::post().uri(&refund_uri(order.id)), ADMIN_TOKEN)
        .set_json(json!({ "reason": "Buyer bought the wrong edition" }));
    let (status, body) = send(&db, refunding_gateway(), req).await;
    assert_eq!(status, StatusCode::OK);
    let response: RefundResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(response.refund.id, "rfnd_FgRAHdNOM4ZVbO");
    assert_eq!(response.refund.amount, Paise::from(50_000));
    assert_eq!(response.refund.status, "processed");
    assert_eq!(response.order.payment_status, PaymentStatus::Refunded);

    let stored = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.state(), "refunded/refunded");
    assert_eq!(stored.refund_reason.as_deref(), Some("Buyer bought the wrong edition"));

    // The order can only be refunded once
    let mut gateway = MockGateway::new();
    gateway.expect_refund().never();
    let req = with_token(TestRequest::post().uri(&refund_uri(order.id)), ADMIN_TOKEN).set_json(json!({}));
    let (status, body) = send(&db, gateway, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("cannot be refunded"), "{body}");
    tear_down(db).await;
}

#[actix_web::test]
async fn partial_refund_amounts_are_checked() {
    let db = setup_db().await;
    let ebook = add_product(&db, "Ebook", 500, 10).await;
    let order = seed_paid_order(&db, &ebook, "pay_FgR9UMzgmKDJRi").await;
    for amount in [0, -100, 50_001] {
        let mut gateway = MockGateway::new();
        gateway.expect_refund().never();
        let req =
            with_token(TestRequest::post().uri(&refund_uri(order.id)), ADMIN_TOKEN).set_json(json!({ "amount": amount }));
        let (status, body) = send(&db, gateway, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{amount}");
        assert!(body.contains("Invalid refund amount"), "{body}");
    }
    let req =
        with_token(TestRequest::post().uri(&refund_uri(order.id)), ADMIN_TOKEN).set_json(json!({ "amount": 20_000 }));
    let (status, body) = send(&db, refunding_gateway(), req).await;
    assert_eq!(status, StatusCode::OK);
    let response: RefundResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(response.refund.amount, Paise::from(20_000));
    let stored = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.refund_amount, Some(Paise::from(20_000)));
    assert_eq!(stored.refund_reason.as_deref(), Some("Refund requested"));
    tear_down(db).await;
}

#[actix_web::test]
async fn refund_errors() {
    let db = setup_db().await;
    let ebook = add_product(&db, "Ebook", 500, 10).await;
    let unpaid = seed_order(&db, BUYER, &ebook, "order_unpaid").await;
    let req = with_token(TestRequest::post().uri(&refund_uri(unpaid.id)), ADMIN_TOKEN).set_json(json!({}));
    let (status, body) = send(&db, MockGateway::new(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("pending/pending"), "{body}");

    let req = with_token(TestRequest::post().uri(&refund_uri(9_999)), ADMIN_TOKEN).set_json(json!({}));
    let (status, _) = send(&db, MockGateway::new(), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // A gateway failure leaves the order paid
    let paid = seed_paid_order(&db, &ebook, "pay_FgR9UMzgmKDJRi").await;
    let mut gateway = MockGateway::new();
    gateway
        .expect_refund()
        .times(1)
        .returning(|_| Err(GatewayError::Rejected("The refund amount exceeds the captured amount".into())));
    let req = with_token(TestRequest::post().uri(&refund_uri(paid.id)), ADMIN_TOKEN).set_json(json!({}));
    let (status, body) = send(&db, gateway, req).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("exceeds the captured amount"), "{body}");
    let stored = db.fetch_order(paid.id).await.unwrap().unwrap();
    assert_eq!(stored.state(), "completed/paid");
    tear_down(db).await;
}
