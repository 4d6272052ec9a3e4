//! Connects the order flow engine to Razorpay.
//!
//! [`RazorpayGateway`] adapts the REST client in `razorpay_tools` to the engine's [`PaymentGateway`] contract. It
//! only translates: amounts are already in paise on both sides, and there are no retries. A request that the gateway
//! refused is reported as [`GatewayError::Rejected`]; anything that never got a usable answer is
//! [`GatewayError::Unreachable`].
use log::*;
use razorpay_tools::{
    NewRazorpayOrder,
    NewRazorpayRefund,
    PaymentState,
    RazorpayApi,
    RazorpayApiError,
    RazorpayConfig,
    RazorpayPayment,
};
use storefront_engine::{
    traits::{MintOrderRequest, RefundRequest, RemoteOrder, RemotePayment, RemotePaymentStatus, RemoteRefund},
    GatewayError,
    PaymentGateway,
};

#[derive(Debug, Clone)]
pub struct RazorpayGateway {
    api: RazorpayApi,
}

impl RazorpayGateway {
    pub fn new(config: RazorpayConfig) -> Result<Self, RazorpayApiError> {
        let api = RazorpayApi::new(config)?;
        Ok(Self { api })
    }

    /// The public key id, for the checkout widget.
    pub fn key_id(&self) -> &str {
        self.api.key_id()
    }
}

impl PaymentGateway for RazorpayGateway {
    async fn mint_order(&self, request: MintOrderRequest) -> Result<RemoteOrder, GatewayError> {
        let MintOrderRequest { amount, currency, receipt, notes } = request;
        let order = NewRazorpayOrder { amount, currency, receipt, notes };
        let result = self.api.create_order(&order).await.map_err(gateway_error)?;
        Ok(RemoteOrder { id: result.id, amount: result.amount, currency: result.currency, receipt: result.receipt })
    }

    async fn fetch_payment(&self, remote_payment_id: &str) -> Result<RemotePayment, GatewayError> {
        let payment = self.api.fetch_payment(remote_payment_id).await.map_err(gateway_error)?;
        Ok(remote_payment(payment))
    }

    async fn refund(&self, request: RefundRequest) -> Result<RemoteRefund, GatewayError> {
        let RefundRequest { remote_payment_id, amount, notes } = request;
        let refund = NewRazorpayRefund { amount, receipt: None, notes };
        let result = self.api.refund_payment(&remote_payment_id, &refund).await.map_err(gateway_error)?;
        Ok(RemoteRefund { id: result.id, payment_id: result.payment_id, amount: result.amount, status: result.status })
    }
}

fn remote_payment(payment: RazorpayPayment) -> RemotePayment {
    let status = match payment.status {
        PaymentState::Created => RemotePaymentStatus::Created,
        PaymentState::Authorized => RemotePaymentStatus::Authorized,
        PaymentState::Captured => RemotePaymentStatus::Captured,
        PaymentState::Refunded => RemotePaymentStatus::Refunded,
        PaymentState::Failed => RemotePaymentStatus::Failed,
    };
    RemotePayment { id: payment.id, order_id: payment.order_id, amount: payment.amount, status }
}

fn gateway_error(e: RazorpayApiError) -> GatewayError {
    match e {
        e if e.is_rejection() => {
            warn!("💳️ The gateway rejected the request. {e}");
            GatewayError::Rejected(e.to_string())
        },
        RazorpayApiError::JsonError(msg) => {
            error!("💳️ Could not decode the gateway response. {msg}");
            GatewayError::InvalidResponse(msg)
        },
        e => {
            warn!("💳️ Could not reach the gateway. {e}");
            GatewayError::Unreachable(e.to_string())
        },
    }
}
