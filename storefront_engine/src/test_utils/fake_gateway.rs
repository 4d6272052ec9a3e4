use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use log::debug;
use sf_common::Paise;

use crate::traits::{
    GatewayError,
    MintOrderRequest,
    PaymentGateway,
    RefundRequest,
    RemoteOrder,
    RemotePayment,
    RemotePaymentStatus,
    RemoteRefund,
};

#[derive(Debug, Default)]
struct GatewayState {
    counter: u64,
    unavailable: bool,
    orders: Vec<RemoteOrder>,
    payments: HashMap<String, RemotePayment>,
    refunds: Vec<RemoteRefund>,
    fetch_calls: usize,
}

/// An in-memory payment gateway. Tests script payments against it and can switch it off to simulate outages.
#[derive(Debug, Clone, Default)]
pub struct FakeGateway {
    state: Arc<Mutex<GatewayState>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, GatewayState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// While unavailable, every call fails as if the network were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    /// Simulates a buyer paying for a minted order. Returns the new payment id.
    pub fn pay(&self, remote_order_id: &str, status: RemotePaymentStatus) -> String {
        let mut state = self.state();
        state.counter += 1;
        let id = format!("pay_fake{:06}", state.counter);
        let amount = state.orders.iter().find(|o| o.id == remote_order_id).map(|o| o.amount).unwrap_or_default();
        let payment = RemotePayment { id: id.clone(), order_id: Some(remote_order_id.to_string()), amount, status };
        state.payments.insert(id.clone(), payment);
        id
    }

    pub fn capture(&self, remote_order_id: &str) -> String {
        self.pay(remote_order_id, RemotePaymentStatus::Captured)
    }

    pub fn minted_orders(&self) -> Vec<RemoteOrder> {
        self.state().orders.clone()
    }

    pub fn refunds(&self) -> Vec<RemoteRefund> {
        self.state().refunds.clone()
    }

    pub fn fetch_calls(&self) -> usize {
        self.state().fetch_calls
    }
}

impl PaymentGateway for FakeGateway {
    async fn mint_order(&self, request: MintOrderRequest) -> Result<RemoteOrder, GatewayError> {
        let mut state = self.state();
        if state.unavailable {
            return Err(GatewayError::Unreachable("connection timed out".into()));
        }
        state.counter += 1;
        let order = RemoteOrder {
            id: format!("order_fake{:06}", state.counter),
            amount: request.amount,
            currency: request.currency,
            receipt: Some(request.receipt),
        };
        debug!("💳️ Fake gateway minted {} for {}", order.id, order.amount);
        state.orders.push(order.clone());
        Ok(order)
    }

    async fn fetch_payment(&self, remote_payment_id: &str) -> Result<RemotePayment, GatewayError> {
        let mut state = self.state();
        state.fetch_calls += 1;
        if state.unavailable {
            return Err(GatewayError::Unreachable("connection timed out".into()));
        }
        state
            .payments
            .get(remote_payment_id)
            .cloned()
            .ok_or_else(|| GatewayError::Rejected(format!("The id provided does not exist: {remote_payment_id}")))
    }

    async fn refund(&self, request: RefundRequest) -> Result<RemoteRefund, GatewayError> {
        let mut state = self.state();
        if state.unavailable {
            return Err(GatewayError::Unreachable("connection timed out".into()));
        }
        let refunded: Paise =
            state.refunds.iter().filter(|r| r.payment_id == request.remote_payment_id).map(|r| r.amount).sum();
        let payment = state
            .payments
            .get(&request.remote_payment_id)
            .cloned()
            .ok_or_else(|| GatewayError::Rejected("The payment does not exist".into()))?;
        if refunded + request.amount > payment.amount {
            return Err(GatewayError::Rejected("The total refund amount is greater than the payment amount".into()));
        }
        state.counter += 1;
        let refund = RemoteRefund {
            id: format!("rfnd_fake{:06}", state.counter),
            payment_id: request.remote_payment_id,
            amount: request.amount,
            status: "processed".to_string(),
        };
        state.refunds.push(refund.clone());
        Ok(refund)
    }
}
