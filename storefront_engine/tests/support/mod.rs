#![allow(dead_code)]

use log::*;
use sf_common::{Paise, Secret};
use sqlx::{migrate::MigrateDatabase, Sqlite};
use storefront_engine::{
    db_types::{BillingAddress, NewProduct, Product},
    events::EventProducers,
    helpers::{sign_payment, SignatureVerifier},
    order_objects::{CreatedOrder, NewOrderRequest, OrderLine, PaymentReceipt},
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        FakeGateway,
    },
    AccountApi,
    CatalogManagement,
    OrderFlowApi,
    OrderLedger,
    SqliteDatabase,
};

pub const PAYMENT_SECRET: &str = "rzp_test_key_secret";
pub const WEBHOOK_SECRET: &str = "rzp_test_webhook_secret";
pub const BUYER: i64 = 42;
pub const OTHER_BUYER: i64 = 7;

pub struct TestStore {
    pub db: SqliteDatabase,
    pub gateway: FakeGateway,
    pub api: OrderFlowApi<SqliteDatabase, FakeGateway>,
    pub accounts: AccountApi<SqliteDatabase>,
}

pub fn verifier() -> SignatureVerifier {
    SignatureVerifier::new(Secret::new(PAYMENT_SECRET.to_string()), Secret::new(WEBHOOK_SECRET.to_string()))
}

pub async fn setup() -> TestStore {
    setup_with_producers(EventProducers::default()).await
}

pub async fn setup_with_producers(producers: EventProducers) -> TestStore {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    let gateway = FakeGateway::new();
    let api = OrderFlowApi::new(db.clone(), gateway.clone(), verifier(), producers);
    let accounts = AccountApi::new(db.clone());
    TestStore { db, gateway, api, accounts }
}

pub async fn tear_down(mut store: TestStore) {
    let url = store.db.url().to_string();
    if let Err(e) = store.db.close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    if let Err(e) = Sqlite::drop_database(&url).await {
        warn!("🚀️ Could not remove test database {url}: {e}");
    }
}

pub fn billing() -> BillingAddress {
    BillingAddress::new("Asha Rao", "asha@example.com")
}

pub async fn add_product(store: &TestStore, title: &str, rupees: i64, stock: i64) -> Product {
    store
        .db
        .insert_product(NewProduct::new(title, Paise::from_rupees(rupees), stock))
        .await
        .expect("Error inserting product")
}

pub async fn checkout(store: &TestStore, lines: &[(i64, i64)]) -> CreatedOrder {
    let items = lines.iter().map(|(id, qty)| OrderLine::new(*id, *qty)).collect();
    let request = NewOrderRequest { buyer_id: BUYER, items, billing_address: billing() };
    store.api.create_order(request).await.expect("Error creating order")
}

/// A correctly signed receipt for the given payment.
pub fn receipt(created: &CreatedOrder, remote_payment_id: &str) -> PaymentReceipt {
    let secret = Secret::new(PAYMENT_SECRET.to_string());
    let signature =
        sign_payment(&secret, &created.remote_order.id, remote_payment_id).expect("Could not sign payment receipt");
    PaymentReceipt {
        order_id: created.order.id,
        remote_order_id: created.remote_order.id.clone(),
        remote_payment_id: remote_payment_id.to_string(),
        signature,
    }
}
