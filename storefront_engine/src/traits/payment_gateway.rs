use thiserror::Error;

use crate::traits::data_objects::{MintOrderRequest, RefundRequest, RemoteOrder, RemotePayment, RemoteRefund};

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Could not reach the payment gateway: {0}")]
    Unreachable(String),
    #[error("The payment gateway rejected the request. {0}")]
    Rejected(String),
    #[error("The payment gateway returned a response we could not understand. {0}")]
    InvalidResponse(String),
}

/// The remote payment processor.
///
/// Calls to the gateway are never made while a database transaction is open.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    /// Creates the gateway's counterpart of one of our orders.
    async fn mint_order(&self, request: MintOrderRequest) -> Result<RemoteOrder, GatewayError>;

    /// Fetches the authoritative state of a payment.
    async fn fetch_payment(&self, remote_payment_id: &str) -> Result<RemotePayment, GatewayError>;

    /// Returns money against a captured payment.
    async fn refund(&self, request: RefundRequest) -> Result<RemoteRefund, GatewayError>;
}
