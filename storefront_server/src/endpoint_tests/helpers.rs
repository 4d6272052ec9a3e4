use actix_web::{
    body::to_bytes,
    http::{header::AUTHORIZATION, StatusCode},
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use chrono::{Duration, Utc};
use log::*;
use sf_common::{Paise, Secret};
use storefront_engine::{
    db_types::{BillingAddress, NewLineItem, NewOrder, NewProduct, Order, Product, Role},
    events::EventProducers,
    helpers::{sign_payment, SignatureVerifier},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    AccountApi,
    AuthApi,
    CatalogManagement,
    OrderFlowApi,
    OrderLedger,
    SqliteDatabase,
};

use super::mocks::MockGateway;
use crate::{
    config::ProxyConfig,
    data_objects::GatewayKey,
    middleware::AuthenticationMiddlewareFactory,
    routes::{
        health,
        AllOrdersRoute,
        ClaimDownloadRoute,
        CreateOrderRoute,
        GatewayKeyRoute,
        GatewayWebhookRoute,
        MyOrdersRoute,
        OrderByIdRoute,
        OrderHistoryRoute,
        PaymentFailedRoute,
        RefundOrderRoute,
        VerifyPaymentRoute,
    },
    server::{json_config, path_config, query_config},
};

pub const PAYMENT_SECRET: &str = "rzp_test_key_secret";
pub const WEBHOOK_SECRET: &str = "rzp_test_webhook_secret";
pub const GATEWAY_KEY: &str = "rzp_test_1DP5mmOlF5G5ag";

pub const BUYER: i64 = 42;
pub const OTHER_BUYER: i64 = 7;
pub const ADMIN: i64 = 1;
pub const BUYER_TOKEN: &str = "buyer-token";
pub const OTHER_TOKEN: &str = "other-token";
pub const ADMIN_TOKEN: &str = "admin-token";
pub const EXPIRED_TOKEN: &str = "expired-token";

/// A freshly migrated database with sessions for a buyer, a second buyer and an admin.
pub async fn setup_db() -> SqliteDatabase {
    let _ = env_logger::try_init();
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    let auth = AuthApi::new(db.clone());
    let expiry = Utc::now() + Duration::hours(1);
    auth.register_session(BUYER_TOKEN, BUYER, &[Role::User], expiry).await.expect("Error creating session");
    auth.register_session(OTHER_TOKEN, OTHER_BUYER, &[Role::User], expiry).await.expect("Error creating session");
    auth.register_session(ADMIN_TOKEN, ADMIN, &[Role::User, Role::Admin], expiry).await.expect("Error creating session");
    let expired = Utc::now() - Duration::minutes(5);
    auth.register_session(EXPIRED_TOKEN, BUYER, &[Role::User], expired).await.expect("Error creating session");
    db
}

pub async fn tear_down(mut db: SqliteDatabase) {
    if let Err(e) = db.close().await {
        warn!("🚀️ Could not close test database. {e}");
    }
}

pub fn verifier() -> SignatureVerifier {
    SignatureVerifier::new(Secret::new(PAYMENT_SECRET.to_string()), Secret::new(WEBHOOK_SECRET.to_string()))
}

pub fn billing() -> BillingAddress {
    BillingAddress::new("Asha Rao", "asha@example.com")
}

pub async fn add_product(db: &SqliteDatabase, title: &str, rupees: i64, stock: i64) -> Product {
    db.insert_product(NewProduct::new(title, Paise::from_rupees(rupees), stock)).await.expect("Error inserting product")
}

/// Stores a pending order that has already been minted at the gateway as `remote_order_id`.
pub async fn seed_order(db: &SqliteDatabase, buyer_id: i64, product: &Product, remote_order_id: &str) -> Order {
    let order = NewOrder::new(buyer_id, vec![NewLineItem::from_product(product, 1)], billing());
    let order = db.insert_order(order).await.expect("Error inserting order");
    db.set_remote_order_id(order.id, remote_order_id).await.expect("Error saving remote order id")
}

/// Stores an order and marks it as paid with `remote_payment_id`.
pub async fn seed_paid_order(db: &SqliteDatabase, product: &Product, remote_payment_id: &str) -> Order {
    let order = seed_order(db, BUYER, product, &format!("order_for_{remote_payment_id}")).await;
    db.complete_payment(order.id, remote_payment_id).await.expect("Error completing payment").into_order()
}

pub fn receipt_signature(remote_order_id: &str, remote_payment_id: &str) -> String {
    let secret = Secret::new(PAYMENT_SECRET.to_string());
    sign_payment(&secret, remote_order_id, remote_payment_id).expect("Could not sign receipt")
}

pub fn with_token(req: TestRequest, token: &str) -> TestRequest {
    req.insert_header((AUTHORIZATION, format!("Bearer {token}")))
}

/// Registers the routes the way the server does, with `gateway` standing in for the payment gateway.
pub fn configure(cfg: &mut ServiceConfig, db: SqliteDatabase, gateway: MockGateway) {
    let orders_api = OrderFlowApi::new(db.clone(), gateway, verifier(), EventProducers::default());
    cfg.app_data(web::Data::new(orders_api))
        .app_data(web::Data::new(AccountApi::new(db.clone())))
        .app_data(web::Data::new(AuthApi::new(db)))
        .app_data(web::Data::new(GatewayKey::new(GATEWAY_KEY)))
        .app_data(web::Data::new(ProxyConfig::default()))
        .service(health)
        .service(GatewayKeyRoute::new())
        .service(
            web::scope("/api")
                .wrap(AuthenticationMiddlewareFactory::<SqliteDatabase>::new())
                .service(CreateOrderRoute::<SqliteDatabase, MockGateway>::new())
                .service(VerifyPaymentRoute::<SqliteDatabase, MockGateway>::new())
                .service(PaymentFailedRoute::<SqliteDatabase, MockGateway>::new())
                .service(RefundOrderRoute::<SqliteDatabase, MockGateway>::new())
                .service(MyOrdersRoute::<SqliteDatabase>::new())
                .service(OrderByIdRoute::<SqliteDatabase>::new())
                .service(OrderHistoryRoute::<SqliteDatabase>::new())
                .service(ClaimDownloadRoute::<SqliteDatabase>::new())
                .service(AllOrdersRoute::<SqliteDatabase>::new()),
        )
        .service(web::scope("/webhooks").service(GatewayWebhookRoute::<SqliteDatabase, MockGateway>::new()));
}

/// Sends a single request through a fresh app and returns the status and body. Errors raised by middleware are
/// rendered the way the server would render them.
pub async fn send(db: &SqliteDatabase, gateway: MockGateway, req: TestRequest) -> (StatusCode, String) {
    let db = db.clone();
    let app = App::new()
        .app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .configure(move |cfg| configure(cfg, db, gateway));
    let service = test::init_service(app).await;
    let (status, body) = match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            (status, test::read_body(res).await)
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            (status, to_bytes(res.into_body()).await.unwrap_or_default())
        },
    };
    let body = String::from_utf8_lossy(&body).into_owned();
    debug!("🚀️ Response: {status} {body}");
    (status, body)
}
