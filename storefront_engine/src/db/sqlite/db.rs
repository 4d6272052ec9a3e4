//! `SqliteDatabase` is a concrete implementation of a storefront engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`traits`] module.
//!
//! [`traits`]: crate::traits
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::{carts, db_url, new_pool, orders, orders::OrderKey, products, sessions, SqliteDatabaseError};
use crate::{
    db_types::{
        CartItem,
        NewOrder,
        NewProduct,
        Order,
        OrderNumber,
        Product,
        RefundRecord,
        Role,
        Session,
        StatusHistoryEntry,
    },
    helpers::new_order_number,
    traits::{
        AuthApiError,
        AuthManagement,
        CartManagement,
        CatalogManagement,
        DownloadClaim,
        LedgerError,
        OrderLedger,
        OrderPage,
        Pagination,
        TransitionOutcome,
    },
};

/// How many times a fresh order number is drawn before giving up on an insert.
const ORDER_NUMBER_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the `SF_DATABASE_URL` environment variable.
    pub async fn new(max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        SqliteDatabase::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let pool = new_pool(url, max_connections).await?;
        trace!("🗃️ Created new Sqlite pool for {url}");
        Ok(Self { url: url.to_string(), pool })
    }

    /// Brings the schema up to date. The migrations are embedded in the binary.
    pub async fn migrate(&self) -> Result<(), SqliteDatabaseError> {
        sqlx::migrate!("./src/db/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| SqliteDatabaseError::MigrationError(e.to_string()))?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn fetch_by(&self, key: OrderKey<'_>) -> Result<Option<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(key, &mut conn).await?;
        Ok(order)
    }

    /// Fetches an order that the caller has just referenced by id. A missing order is an error here.
    async fn existing_order(&self, id: i64) -> Result<Order, LedgerError> {
        self.fetch_by(OrderKey::Id(id)).await?.ok_or(LedgerError::OrderNotFound(id))
    }
}

impl OrderLedger for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, LedgerError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let order_number = new_order_number();
            let mut tx = self.pool.begin().await?;
            match orders::insert_order(&order, &order_number, &mut tx).await {
                Ok(id) => {
                    let saved = orders::fetch_order(OrderKey::Id(id), &mut tx)
                        .await?
                        .ok_or(LedgerError::OrderNotFound(id))?;
                    tx.commit().await?;
                    debug!("🗃️ Order {order_number} has been saved in the DB with id {id}");
                    return Ok(saved);
                },
                Err(SqliteDatabaseError::DuplicateOrderNumber(n)) if attempt < ORDER_NUMBER_ATTEMPTS => {
                    warn!("🗃️ Order number {n} is already taken. Drawing another one.");
                },
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn delete_order(&self, id: i64) -> Result<(), LedgerError> {
        let mut tx = self.pool.begin().await?;
        let deleted = orders::delete_order(id, &mut tx).await?;
        tx.commit().await?;
        if deleted {
            debug!("🗃️ Order #{id} deleted");
            Ok(())
        } else {
            Err(LedgerError::OrderNotFound(id))
        }
    }

    async fn set_remote_order_id(&self, id: i64, remote_order_id: &str) -> Result<Order, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        if !orders::set_remote_order_id(id, remote_order_id, &mut conn).await? {
            return Err(LedgerError::OrderNotFound(id));
        }
        let order = orders::fetch_order(OrderKey::Id(id), &mut conn).await?.ok_or(LedgerError::OrderNotFound(id))?;
        trace!("🗃️ Order {} is linked to gateway order {remote_order_id}", order.order_number);
        Ok(order)
    }

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, LedgerError> {
        self.fetch_by(OrderKey::Id(id)).await
    }

    async fn fetch_order_by_order_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, LedgerError> {
        self.fetch_by(OrderKey::OrderNumber(order_number)).await
    }

    async fn fetch_order_by_remote_order_id(&self, remote_order_id: &str) -> Result<Option<Order>, LedgerError> {
        self.fetch_by(OrderKey::RemoteOrderId(remote_order_id)).await
    }

    async fn fetch_order_by_remote_payment_id(&self, remote_payment_id: &str) -> Result<Option<Order>, LedgerError> {
        self.fetch_by(OrderKey::RemotePaymentId(remote_payment_id)).await
    }

    async fn fetch_order_by_remote_refund_id(&self, remote_refund_id: &str) -> Result<Option<Order>, LedgerError> {
        self.fetch_by(OrderKey::RemoteRefundId(remote_refund_id)).await
    }

    async fn fetch_orders_for_buyer(&self, buyer_id: i64) -> Result<Vec<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_buyer(buyer_id, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_orders(&self, page: Pagination) -> Result<OrderPage, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let total = orders::count_orders(&mut tx).await?;
        let result = orders::fetch_orders(page.limit, page.offset(), &mut tx).await?;
        tx.commit().await?;
        Ok(OrderPage::new(result, page, total))
    }

    async fn fetch_status_history(&self, id: i64) -> Result<Vec<StatusHistoryEntry>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let history = orders::fetch_status_history(id, &mut conn).await?;
        Ok(history)
    }

    /// The conditional update is the first statement of the transaction, so it takes the write lock before anything
    /// is read. A concurrent caller blocks until this transaction finishes, and then finds nothing to update.
    async fn complete_payment(&self, id: i64, remote_payment_id: &str) -> Result<TransitionOutcome, LedgerError> {
        let mut tx = self.pool.begin().await?;
        if !orders::mark_paid(id, remote_payment_id, &mut tx).await? {
            tx.rollback().await?;
            let order = self.existing_order(id).await?;
            debug!("🗃️ Order {} is already {}. Payment {remote_payment_id} not applied.", order.order_number, order.state());
            return Ok(TransitionOutcome::AlreadySettled(order));
        }
        let order = orders::fetch_order(OrderKey::Id(id), &mut tx).await?.ok_or(LedgerError::OrderNotFound(id))?;
        for item in &order.items {
            products::record_sale(item.product_id, item.quantity, &mut tx).await?;
        }
        let cleared = carts::clear_cart(order.buyer_id, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🗃️ Order {} marked as paid. {} products updated, {cleared} cart lines cleared.",
            order.order_number,
            order.items.len()
        );
        Ok(TransitionOutcome::Applied(order))
    }

    async fn fail_payment(&self, id: i64, reason: &str) -> Result<TransitionOutcome, LedgerError> {
        let mut tx = self.pool.begin().await?;
        if !orders::mark_failed(id, reason, &mut tx).await? {
            tx.rollback().await?;
            let order = self.existing_order(id).await?;
            debug!("🗃️ Order {} is already {}. Not marking it as failed.", order.order_number, order.state());
            return Ok(TransitionOutcome::AlreadySettled(order));
        }
        let order = orders::fetch_order(OrderKey::Id(id), &mut tx).await?.ok_or(LedgerError::OrderNotFound(id))?;
        tx.commit().await?;
        debug!("🗃️ Order {} marked as failed: {reason}", order.order_number);
        Ok(TransitionOutcome::Applied(order))
    }

    async fn refund_payment(&self, id: i64, refund: RefundRecord) -> Result<TransitionOutcome, LedgerError> {
        let mut tx = self.pool.begin().await?;
        if !orders::mark_refunded(id, &refund, &mut tx).await? {
            tx.rollback().await?;
            let order = self.existing_order(id).await?;
            debug!("🗃️ Order {} is {}. Refund {} not applied.", order.order_number, order.state(), refund.remote_refund_id);
            return Ok(TransitionOutcome::AlreadySettled(order));
        }
        let order = orders::fetch_order(OrderKey::Id(id), &mut tx).await?.ok_or(LedgerError::OrderNotFound(id))?;
        tx.commit().await?;
        debug!("🗃️ Order {} refunded {} ({})", order.order_number, refund.amount, refund.remote_refund_id);
        Ok(TransitionOutcome::Applied(order))
    }

    async fn record_download(&self, id: i64, product_id: i64) -> Result<DownloadClaim, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let granted = orders::increment_download(id, product_id, &mut tx).await?;
        let items = orders::fetch_line_items(id, &mut tx).await?;
        tx.commit().await?;
        let item = items.into_iter().find(|i| i.product_id == product_id);
        let claim = match (granted, item) {
            (true, Some(item)) => DownloadClaim::Granted(item),
            (false, Some(item)) => DownloadClaim::LimitReached(item),
            (_, None) => DownloadClaim::NotInOrder,
        };
        Ok(claim)
    }

    async fn close(&mut self) -> Result<(), LedgerError> {
        self.pool.close().await;
        Ok(())
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn fetch_product(&self, id: i64) -> Result<Option<Product>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product(id, &mut conn).await?;
        Ok(product)
    }

    async fn fetch_products(&self, ids: &[i64]) -> Result<Vec<Product>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let result = products::fetch_products(ids, &mut conn).await?;
        Ok(result)
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::insert_product(product, &mut conn).await?;
        debug!("🗃️ Product #{} ({}) added to the catalog", product.id, product.title);
        Ok(product)
    }
}

impl CartManagement for SqliteDatabase {
    async fn fetch_cart(&self, buyer_id: i64) -> Result<Vec<CartItem>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let cart = carts::fetch_cart(buyer_id, &mut conn).await?;
        Ok(cart)
    }

    async fn add_to_cart(&self, buyer_id: i64, product_id: i64, quantity: i64) -> Result<CartItem, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let item = carts::add_to_cart(buyer_id, product_id, quantity, &mut conn).await?;
        Ok(item)
    }

    async fn clear_cart(&self, buyer_id: i64) -> Result<u64, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let n = carts::clear_cart(buyer_id, &mut conn).await?;
        Ok(n)
    }
}

impl AuthManagement for SqliteDatabase {
    async fn fetch_session(&self, token_hash: &str) -> Result<Option<Session>, AuthApiError> {
        let mut conn = self.pool.acquire().await?;
        let session = sessions::fetch_session(token_hash, &mut conn).await?;
        Ok(session)
    }

    async fn upsert_session(
        &self,
        token_hash: &str,
        buyer_id: i64,
        roles: &[Role],
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthApiError> {
        let mut conn = self.pool.acquire().await?;
        sessions::upsert_session(token_hash, buyer_id, roles, expires_at, &mut conn).await?;
        Ok(())
    }

    async fn revoke_session(&self, token_hash: &str) -> Result<(), AuthApiError> {
        let mut conn = self.pool.acquire().await?;
        sessions::revoke_session(token_hash, &mut conn).await?;
        Ok(())
    }
}
