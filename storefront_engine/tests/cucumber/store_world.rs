use std::collections::HashMap;

use cucumber::World;
use log::*;
use sf_common::Secret;
use storefront_engine::{
    db_types::{Order, Product},
    events::EventProducers,
    helpers::SignatureVerifier,
    order_objects::CreatedOrder,
    test_utils::{
        prepare_env::{create_database, random_db_path, run_migrations},
        FakeGateway,
    },
    AccountApi,
    OrderFlowApi,
    OrderFlowError,
    OrderLedger,
    SqliteDatabase,
};
use tokio::time::sleep;

pub const PAYMENT_SECRET: &str = "bdd_key_secret";
pub const WEBHOOK_SECRET: &str = "bdd_webhook_secret";

#[derive(Default, Debug, World)]
pub struct StoreWorld {
    pub system: Option<StorefrontSystem>,
    pub products: HashMap<String, Product>,
    pub checkout: Option<CreatedOrder>,
    pub remote_payment_id: Option<String>,
    pub last_error: Option<OrderFlowError>,
}

#[derive(Debug)]
pub struct StorefrontSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub gateway: FakeGateway,
    pub api: OrderFlowApi<SqliteDatabase, FakeGateway>,
    pub accounts: AccountApi<SqliteDatabase>,
}

impl StoreWorld {
    pub fn system(&self) -> &StorefrontSystem {
        self.system.as_ref().expect("Storefront not initialised")
    }

    pub fn api(&self) -> &OrderFlowApi<SqliteDatabase, FakeGateway> {
        &self.system().api
    }

    pub fn product(&self, title: &str) -> &Product {
        self.products.get(title).unwrap_or_else(|| panic!("No product called {title}"))
    }

    pub fn created(&self) -> &CreatedOrder {
        self.checkout.as_ref().expect("No order has been placed")
    }

    pub async fn current_order(&self) -> Order {
        let id = self.created().order.id;
        self.system().db.fetch_order(id).await.expect("Error fetching order").expect("Order has disappeared")
    }

    /// Keeps the error of a failed call so that a later step can assert on it.
    pub fn record<T>(&mut self, result: Result<T, OrderFlowError>) -> Option<T> {
        match result {
            Ok(v) => {
                self.last_error = None;
                Some(v)
            },
            Err(e) => {
                debug!("🚀️ Step produced an error: {e}");
                self.last_error = Some(e);
                None
            },
        }
    }
}

impl StorefrontSystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        sleep(std::time::Duration::from_millis(50)).await;
        let gateway = FakeGateway::new();
        let verifier =
            SignatureVerifier::new(Secret::new(PAYMENT_SECRET.to_string()), Secret::new(WEBHOOK_SECRET.to_string()));
        let api = OrderFlowApi::new(db.clone(), gateway.clone(), verifier, EventProducers::default());
        let accounts = AccountApi::new(db.clone());
        Self { db_path: url, db, gateway, api, accounts }
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}
