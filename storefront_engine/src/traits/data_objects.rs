use std::{collections::BTreeMap, fmt::Display};

use serde::{Deserialize, Serialize};
use sf_common::Paise;

use crate::db_types::{LineItem, Order};

/// The result of a conditional lifecycle update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// This caller won the race and the transition (plus its side effects) was committed.
    Applied(Order),
    /// The order was no longer in the required state. Nothing was changed. The order is returned as it stands.
    AlreadySettled(Order),
}

impl TransitionOutcome {
    pub fn order(&self) -> &Order {
        match self {
            TransitionOutcome::Applied(o) | TransitionOutcome::AlreadySettled(o) => o,
        }
    }

    pub fn into_order(self) -> Order {
        match self {
            TransitionOutcome::Applied(o) | TransitionOutcome::AlreadySettled(o) => o,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadClaim {
    /// The counter was incremented. The line item reflects the new count.
    Granted(LineItem),
    LimitReached(LineItem),
    /// The product is not part of the order.
    NotInOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

impl Pagination {
    pub const MAX_LIMIT: i64 = 100;
    /// The highest page whose offset fits in an `i64` at any allowed limit.
    pub const MAX_PAGE: i64 = i64::MAX / Self::MAX_LIMIT;

    /// Builds a pagination request, replacing missing or nonsensical values with the defaults. Pages past
    /// [`Self::MAX_PAGE`] are clamped to it.
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let default = Self::default();
        let page = page.filter(|p| *p > 0).unwrap_or(default.page).min(Self::MAX_PAGE);
        let limit = limit.filter(|l| *l > 0).unwrap_or(default.limit).min(Self::MAX_LIMIT);
        Self { page, limit }
    }

    /// Never overflows, even for a hand-built `Pagination` that bypassed [`Self::new`].
    pub fn offset(&self) -> i64 {
        self.page.saturating_sub(1).max(0).saturating_mul(self.limit.max(0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl OrderPage {
    pub fn new(orders: Vec<Order>, pagination: Pagination, total: i64) -> Self {
        let pages = (total + pagination.limit - 1) / pagination.limit;
        Self { orders, page: pagination.page, limit: pagination.limit, total, pages }
    }
}

//--------------------------------------   Gateway objects   ---------------------------------------------------------

/// Request to mint an order at the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintOrderRequest {
    pub amount: Paise,
    pub currency: String,
    /// Our order number. The gateway treats it as an idempotency key.
    pub receipt: String,
    pub notes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteOrder {
    pub id: String,
    pub amount: Paise,
    pub currency: String,
    pub receipt: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemotePaymentStatus {
    Created,
    Authorized,
    Captured,
    Refunded,
    Failed,
}

impl Display for RemotePaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemotePaymentStatus::Created => write!(f, "created"),
            RemotePaymentStatus::Authorized => write!(f, "authorized"),
            RemotePaymentStatus::Captured => write!(f, "captured"),
            RemotePaymentStatus::Refunded => write!(f, "refunded"),
            RemotePaymentStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePayment {
    pub id: String,
    pub order_id: Option<String>,
    pub amount: Paise,
    pub status: RemotePaymentStatus,
}

impl RemotePayment {
    /// True if the payment has been captured against the given gateway order.
    pub fn is_captured_for(&self, remote_order_id: &str) -> bool {
        self.status == RemotePaymentStatus::Captured && self.order_id.as_deref() == Some(remote_order_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundRequest {
    pub remote_payment_id: String,
    pub amount: Paise,
    pub notes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRefund {
    pub id: String,
    pub payment_id: String,
    pub amount: Paise,
    /// The gateway's refund state, e.g. `pending` or `processed`.
    pub status: String,
}
