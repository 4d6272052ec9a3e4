use thiserror::Error;

use crate::{
    helpers::SignatureError,
    traits::{GatewayError, LedgerError},
};

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("The order does not contain any items")]
    EmptyOrder,
    #[error("The quantity for product #{0} must be at least 1")]
    InvalidQuantity(i64),
    #[error("Product #{0} does not exist")]
    ProductNotFound(i64),
    #[error("Product #{0} is not available for purchase")]
    ProductInactive(i64),
    #[error("Only {available} units of product #{product_id} are in stock, but {requested} were requested")]
    InsufficientStock { product_id: i64, requested: i64, available: i64 },
    #[error("The order total must be more than zero")]
    ZeroTotal,
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Invalid refund amount. {0}")]
    InvalidRefundAmount(String),
    #[error("Order #{0} does not exist")]
    OrderNotFound(i64),
    #[error("The order does not belong to you")]
    NotOrderOwner,
    #[error("Invalid payment signature")]
    InvalidSignature,
    #[error("The payment has not been captured. Gateway status: {0}")]
    PaymentNotCaptured(String),
    #[error("The order cannot be refunded. {0}")]
    CannotRefund(String),
    #[error("The order has not been paid for")]
    OrderNotPaid,
    #[error("Product #{0} is not part of this order")]
    ProductNotInOrder(i64),
    #[error("The download limit for this product has been reached")]
    DownloadLimitReached,
    #[error("The webhook payload is malformed. {0}")]
    MalformedWebhook(String),
    #[error("The payment gateway is unavailable. {0}")]
    GatewayUnavailable(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<LedgerError> for OrderFlowError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::OrderNotFound(id) => OrderFlowError::OrderNotFound(id),
            LedgerError::ProductNotFound(id) => OrderFlowError::ProductNotFound(id),
            e => OrderFlowError::DatabaseError(e.to_string()),
        }
    }
}

impl From<GatewayError> for OrderFlowError {
    fn from(e: GatewayError) -> Self {
        OrderFlowError::GatewayUnavailable(e.to_string())
    }
}

impl From<SignatureError> for OrderFlowError {
    fn from(_: SignatureError) -> Self {
        OrderFlowError::InvalidSignature
    }
}
