use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sf_common::{Paise, DEFAULT_CURRENCY_CODE};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------      OrderNumber      ---------------------------------------------------------
/// The public, human-friendly order reference. It doubles as the gateway's idempotent receipt key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderNumber(pub String);

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------      OrderStatus      ---------------------------------------------------------
/// The business lifecycle of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// The order has been created and is awaiting payment.
    Pending,
    /// Payment has been captured but fulfilment is still in progress.
    Processing,
    /// The order was paid for and the buyer has been granted their downloads.
    Completed,
    /// The order was abandoned, or the payment failed.
    Cancelled,
    /// A completed order whose payment was returned to the buyer.
    Refunded,
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Processing => write!(f, "processing"),
            OrderStatus::Completed => write!(f, "completed"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
            OrderStatus::Refunded => write!(f, "refunded"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------     PaymentStatus     ---------------------------------------------------------
/// The financial lifecycle of an order. This is tracked separately from [`OrderStatus`], since an order can be
/// cancelled for reasons that have nothing to do with money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Paid => write!(f, "paid"),
            PaymentStatus::Failed => write!(f, "failed"),
            PaymentStatus::Refunded => write!(f, "refunded"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------     BillingAddress    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingAddress {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "India".to_string()
}

impl Default for BillingAddress {
    fn default() -> Self {
        Self {
            name: String::default(),
            email: String::default(),
            phone: None,
            address: None,
            city: None,
            state: None,
            zip_code: None,
            country: default_country(),
        }
    }
}

impl BillingAddress {
    pub fn new<S: Into<String>>(name: S, email: S) -> Self {
        Self { name: name.into(), email: email.into(), ..Default::default() }
    }
}

//--------------------------------------        LineItem       ---------------------------------------------------------
/// A line in an order. Title and price are snapshots taken from the catalog when the order was created and never
/// change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct LineItem {
    pub id: i64,
    pub product_id: i64,
    pub title: String,
    pub unit_price: Paise,
    pub quantity: i64,
    pub download_count: i64,
    pub download_limit: i64,
}

impl LineItem {
    pub fn subtotal(&self) -> Paise {
        self.unit_price * self.quantity
    }

    pub fn downloads_remaining(&self) -> i64 {
        (self.download_limit - self.download_count).max(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLineItem {
    pub product_id: i64,
    pub title: String,
    pub unit_price: Paise,
    pub quantity: i64,
    pub download_limit: i64,
}

impl NewLineItem {
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        Self {
            product_id: product.id,
            title: product.title.clone(),
            unit_price: product.price,
            quantity,
            download_limit: product.download_limit,
        }
    }
}

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_number: OrderNumber,
    pub buyer_id: i64,
    pub items: Vec<LineItem>,
    pub total_amount: Paise,
    pub currency: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub billing_address: BillingAddress,
    pub remote_order_id: Option<String>,
    pub remote_payment_id: Option<String>,
    pub remote_refund_id: Option<String>,
    pub refund_amount: Option<Paise>,
    pub refund_reason: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn is_owned_by(&self, buyer_id: i64) -> bool {
        self.buyer_id == buyer_id
    }

    pub fn line_item(&self, product_id: i64) -> Option<&LineItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// The composite lifecycle state, e.g. `completed/paid`.
    pub fn state(&self) -> String {
        format!("{}/{}", self.status, self.payment_status)
    }

    /// Checks the cross-invariants between the business and financial lifecycles.
    pub fn has_consistent_state(&self) -> bool {
        use OrderStatus as S;
        use PaymentStatus as P;
        match self.payment_status {
            P::Pending => matches!(self.status, S::Pending | S::Processing),
            P::Paid => matches!(self.status, S::Processing | S::Completed),
            P::Failed => self.status == S::Cancelled,
            P::Refunded => self.status == S::Refunded,
        }
    }
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
/// An order that has been priced against the catalog, but not yet stored. The ledger assigns the order number.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub buyer_id: i64,
    pub items: Vec<NewLineItem>,
    pub total_amount: Paise,
    pub currency: String,
    pub billing_address: BillingAddress,
}

impl NewOrder {
    pub fn new(buyer_id: i64, items: Vec<NewLineItem>, billing_address: BillingAddress) -> Self {
        let total_amount = items.iter().map(|i| i.unit_price * i.quantity).sum();
        Self { buyer_id, items, total_amount, currency: DEFAULT_CURRENCY_CODE.to_string(), billing_address }
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }
}

//--------------------------------------   StatusHistoryEntry  ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusHistoryEntry {
    pub id: i64,
    pub order_id: i64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub recorded_at: DateTime<Utc>,
}

//--------------------------------------      RefundRecord     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundRecord {
    pub remote_refund_id: String,
    pub amount: Paise,
    pub reason: Option<String>,
}

//--------------------------------------        Product        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub price: Paise,
    pub stock: i64,
    pub downloads: i64,
    pub is_active: bool,
    pub download_limit: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub title: String,
    pub price: Paise,
    pub stock: i64,
    pub is_active: bool,
    pub download_limit: i64,
}

impl NewProduct {
    pub fn new<S: Into<String>>(title: S, price: Paise, stock: i64) -> Self {
        Self { title: title.into(), price, stock, is_active: true, download_limit: 5 }
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

//--------------------------------------        CartItem       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct CartItem {
    pub buyer_id: i64,
    pub product_id: i64,
    pub quantity: i64,
}

//--------------------------------------          Role         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            s => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

//--------------------------------------        Session        ---------------------------------------------------------
/// The identity behind a bearer token, as recorded by the external authentication service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub buyer_id: i64,
    pub roles: Vec<Role>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}
