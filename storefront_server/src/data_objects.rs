use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sf_common::Paise;
use storefront_engine::{
    db_types::{BillingAddress, Order, OrderNumber, OrderStatus, PaymentStatus},
    order_objects::{CreatedOrder, OrderLine, RefundResult},
    traits::OrderPage,
    webhook_objects::WebhookOutcome,
};

/// The public gateway key id. The checkout widget needs it to open a payment for a gateway order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayKey {
    pub key: String,
}

impl GatewayKey {
    pub fn new<S: Into<String>>(key: S) -> Self {
        Self { key: key.into() }
    }
}

//----------------------------------------------   Checkout  ----------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderParams {
    pub items: Vec<OrderLine>,
    pub billing_address: BillingAddress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalOrderSummary {
    pub id: i64,
    pub order_number: OrderNumber,
    pub total_amount: Paise,
    pub currency: String,
}

/// What the checkout widget needs to take a payment for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutOrder {
    pub id: String,
    pub amount: Paise,
    pub currency: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderResponse {
    pub local_order: LocalOrderSummary,
    pub remote_order: CheckoutOrder,
}

impl CreateOrderResponse {
    pub fn new(created: CreatedOrder, key: &GatewayKey) -> Self {
        let CreatedOrder { order, remote_order } = created;
        let local_order = LocalOrderSummary {
            id: order.id,
            order_number: order.order_number,
            total_amount: order.total_amount,
            currency: order.currency,
        };
        let remote_order = CheckoutOrder {
            id: remote_order.id,
            amount: remote_order.amount,
            currency: remote_order.currency,
            key: key.key.clone(),
        };
        Self { local_order, remote_order }
    }
}

//----------------------------------------------   Order state  -------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: i64,
    pub order_number: OrderNumber,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: Paise,
}

impl From<Order> for OrderSummary {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number,
            status: order.status,
            payment_status: order.payment_status,
            total_amount: order.total_amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResponse {
    pub order: OrderSummary,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self { order: order.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentFailedParams {
    pub order_id: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

//----------------------------------------------   Refunds  -----------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundSummary {
    pub id: String,
    pub amount: Paise,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundResponse {
    pub refund: RefundSummary,
    pub order: OrderSummary,
}

impl From<RefundResult> for RefundResponse {
    fn from(result: RefundResult) -> Self {
        let RefundResult { refund, order } = result;
        let refund = RefundSummary { id: refund.id, amount: refund.amount, status: refund.status };
        Self { refund, order: order.into() }
    }
}

//----------------------------------------------   Admin listing  -----------------------------------------------
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPageResponse {
    pub orders: Vec<Order>,
    pub pagination: PageInfo,
}

impl From<OrderPage> for OrderPageResponse {
    fn from(page: OrderPage) -> Self {
        let OrderPage { orders, page, limit, total, pages } = page;
        Self { orders, pagination: PageInfo { page, limit, total, pages } }
    }
}

//----------------------------------------------   Webhooks  ----------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub success: bool,
    /// `transitioned`, `no_change` or `ignored`
    pub outcome: String,
    pub message: String,
    pub processed_at: DateTime<Utc>,
}

impl From<WebhookOutcome> for WebhookResponse {
    fn from(outcome: WebhookOutcome) -> Self {
        let (outcome, message) = match outcome {
            WebhookOutcome::Transitioned(order) => {
                ("transitioned", format!("Order {} is now {}", order.order_number, order.state()))
            },
            WebhookOutcome::NoChange(order) => {
                ("no_change", format!("Order {} is already {}", order.order_number, order.state()))
            },
            WebhookOutcome::Ignored(reason) => ("ignored", reason),
        };
        Self { success: true, outcome: outcome.to_string(), message, processed_at: Utc::now() }
    }
}
