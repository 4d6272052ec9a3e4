use thiserror::Error;

use crate::{
    db_types::{NewOrder, Order, OrderNumber, RefundRecord, StatusHistoryEntry},
    traits::data_objects::{DownloadClaim, OrderPage, Pagination, TransitionOutcome},
};

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order #{0} does not exist")]
    OrderNotFound(i64),
    #[error("Order number {0} is already in use")]
    DuplicateOrderNumber(String),
    #[error("Product #{0} does not exist")]
    ProductNotFound(i64),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}

/// The durable record of orders and their lifecycle.
///
/// Every lifecycle mutation is a conditional update on the current `payment_status`. Exactly one caller wins each
/// transition; the rest receive [`TransitionOutcome::AlreadySettled`] together with the order as it stands. The side
/// effects that belong to a transition (stock, download counters, cart clearing) are committed atomically with it.
#[allow(async_fn_in_trait)]
pub trait OrderLedger: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a new order and its line items in a single transaction. The ledger assigns a fresh order number,
    /// retrying if it collides with an existing one. The order starts as `pending/pending`.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, LedgerError>;

    /// Removes an order and its line items. Only used to roll back an order whose gateway counterpart could not be
    /// created.
    async fn delete_order(&self, id: i64) -> Result<(), LedgerError>;

    /// Records the gateway order id against the order.
    async fn set_remote_order_id(&self, id: i64, remote_order_id: &str) -> Result<Order, LedgerError>;

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, LedgerError>;

    async fn fetch_order_by_order_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, LedgerError>;

    async fn fetch_order_by_remote_order_id(&self, remote_order_id: &str) -> Result<Option<Order>, LedgerError>;

    async fn fetch_order_by_remote_payment_id(&self, remote_payment_id: &str) -> Result<Option<Order>, LedgerError>;

    async fn fetch_order_by_remote_refund_id(&self, remote_refund_id: &str) -> Result<Option<Order>, LedgerError>;

    /// All orders placed by the buyer, newest first.
    async fn fetch_orders_for_buyer(&self, buyer_id: i64) -> Result<Vec<Order>, LedgerError>;

    /// A page of all orders, newest first.
    async fn fetch_orders(&self, page: Pagination) -> Result<OrderPage, LedgerError>;

    /// The audit trail of status changes for an order, oldest first.
    async fn fetch_status_history(&self, id: i64) -> Result<Vec<StatusHistoryEntry>, LedgerError>;

    /// `pending` → `completed/paid`. On success, and in the same transaction:
    /// * the gateway payment id and completion time are recorded,
    /// * each product's stock is decremented (floored at zero) and its download total incremented by the ordered
    ///   quantity,
    /// * the buyer's cart is emptied.
    async fn complete_payment(&self, id: i64, remote_payment_id: &str) -> Result<TransitionOutcome, LedgerError>;

    /// `pending` → `cancelled/failed`, recording the reason in the order note.
    async fn fail_payment(&self, id: i64, reason: &str) -> Result<TransitionOutcome, LedgerError>;

    /// `paid` → `refunded/refunded`, recording the gateway refund details.
    async fn refund_payment(&self, id: i64, refund: RefundRecord) -> Result<TransitionOutcome, LedgerError>;

    /// Increments the download counter of a line item, provided the limit has not been reached.
    async fn record_download(&self, id: i64, product_id: i64) -> Result<DownloadClaim, LedgerError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), LedgerError> {
        Ok(())
    }
}
