use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sf_common::Paise;

use crate::{
    db_types::{BillingAddress, Order},
    traits::{RemoteOrder, RemoteRefund},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: i64,
    pub quantity: i64,
}

impl OrderLine {
    pub fn new(product_id: i64, quantity: i64) -> Self {
        Self { product_id, quantity }
    }
}

/// A buyer's request to purchase a set of products.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderRequest {
    pub buyer_id: i64,
    pub items: Vec<OrderLine>,
    pub billing_address: BillingAddress,
}

/// The local order, together with its counterpart at the gateway. The client needs both to open the checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedOrder {
    pub order: Order,
    pub remote_order: RemoteOrder,
}

/// What the checkout widget hands back to the client after a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub order_id: i64,
    pub remote_order_id: String,
    pub remote_payment_id: String,
    pub signature: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundOrderRequest {
    /// Defaults to the order total.
    pub amount: Option<Paise>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefundResult {
    pub refund: RemoteRefund,
    pub order: Order,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadGrant {
    pub product_id: i64,
    pub title: String,
    pub downloads_remaining: i64,
    pub expires_at: DateTime<Utc>,
}

/// Merges lines that reference the same product, keeping the order in which products first appear.
pub fn merge_lines(lines: &[OrderLine]) -> Vec<OrderLine> {
    let mut merged: Vec<OrderLine> = Vec::with_capacity(lines.len());
    for line in lines {
        match merged.iter_mut().find(|l| l.product_id == line.product_id) {
            Some(existing) => existing.quantity += line.quantity,
            None => merged.push(*line),
        }
    }
    merged
}
