use std::{collections::BTreeMap, fmt::Debug};

use log::*;
use sf_common::DEFAULT_CURRENCY_CODE;

use crate::{
    db_types::{NewLineItem, NewOrder, Order, PaymentStatus, RefundRecord},
    events::{EventProducers, OrderAnnulledEvent, OrderPaidEvent, OrderRefundedEvent},
    helpers::SignatureVerifier,
    sf_api::{
        errors::OrderFlowError,
        order_objects::{merge_lines, CreatedOrder, NewOrderRequest, PaymentReceipt, RefundOrderRequest, RefundResult},
        webhook_objects::{WebhookEvent, WebhookOutcome},
    },
    traits::{MintOrderRequest, PaymentGateway, RefundRequest, StorefrontDatabase, TransitionOutcome},
};

const SIGNATURE_FAILURE: &str = "Payment signature verification failed";

/// `OrderFlowApi` is the reconciliation engine. It creates orders, mints their gateway counterparts, and settles them
/// in response to client callbacks, client failure reports, webhooks and admin refunds.
///
/// Callbacks and webhooks race each other and may be repeated. Every transition is delegated to the ledger as a
/// conditional update, so whichever signal arrives first settles the order and the others observe
/// [`TransitionOutcome::AlreadySettled`]. Lifecycle events are only published by the winner.
pub struct OrderFlowApi<B, G> {
    db: B,
    gateway: G,
    verifier: SignatureVerifier,
    producers: EventProducers,
    currency: String,
}

impl<B, G> Debug for OrderFlowApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi ({})", self.currency)
    }
}

impl<B, G> OrderFlowApi<B, G> {
    pub fn new(db: B, gateway: G, verifier: SignatureVerifier, producers: EventProducers) -> Self {
        Self { db, gateway, verifier, producers, currency: DEFAULT_CURRENCY_CODE.to_string() }
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }
}

impl<B, G> OrderFlowApi<B, G>
where
    B: StorefrontDatabase,
    G: PaymentGateway,
{
    /// Prices the requested items against the catalog, stores a `pending` order and mints its counterpart at the
    /// gateway.
    ///
    /// If the gateway cannot be reached, or the gateway order id cannot be saved, the local order is deleted again so
    /// that no orphaned `pending` order is left behind.
    pub async fn create_order(&self, request: NewOrderRequest) -> Result<CreatedOrder, OrderFlowError> {
        let NewOrderRequest { buyer_id, items, billing_address } = request;
        if items.is_empty() {
            return Err(OrderFlowError::EmptyOrder);
        }
        if let Some(line) = items.iter().find(|l| l.quantity < 1) {
            return Err(OrderFlowError::InvalidQuantity(line.product_id));
        }
        if billing_address.name.trim().is_empty() {
            return Err(OrderFlowError::MissingField("billing_address.name".into()));
        }
        if billing_address.email.trim().is_empty() {
            return Err(OrderFlowError::MissingField("billing_address.email".into()));
        }
        let lines = merge_lines(&items);
        let mut line_items = Vec::with_capacity(lines.len());
        for line in lines {
            let product =
                self.db.fetch_product(line.product_id).await?.ok_or(OrderFlowError::ProductNotFound(line.product_id))?;
            if !product.is_active {
                return Err(OrderFlowError::ProductInactive(product.id));
            }
            if line.quantity > product.stock {
                return Err(OrderFlowError::InsufficientStock {
                    product_id: product.id,
                    requested: line.quantity,
                    available: product.stock,
                });
            }
            line_items.push(NewLineItem::from_product(&product, line.quantity));
        }
        let new_order = NewOrder::new(buyer_id, line_items, billing_address).with_currency(self.currency.clone());
        if !new_order.total_amount.is_positive() {
            return Err(OrderFlowError::ZeroTotal);
        }
        let order = self.db.insert_order(new_order).await?;
        debug!("🔄️📦️ Order {} created for buyer #{buyer_id}. Total: {}", order.order_number, order.total_amount);

        let mut notes = BTreeMap::new();
        notes.insert("order_id".to_string(), order.id.to_string());
        notes.insert("buyer_id".to_string(), buyer_id.to_string());
        let mint = MintOrderRequest {
            amount: order.total_amount,
            currency: order.currency.clone(),
            receipt: order.order_number.as_str().to_string(),
            notes,
        };
        let remote_order = match self.gateway.mint_order(mint).await {
            Ok(remote) => remote,
            Err(e) => {
                warn!("🔄️📦️ Could not mint gateway order for {}: {e}. Rolling back.", order.order_number);
                self.discard_order(&order).await;
                return Err(e.into());
            },
        };
        let order = match self.db.set_remote_order_id(order.id, &remote_order.id).await {
            Ok(order) => order,
            Err(e) => {
                error!("🔄️📦️ Could not link {} to gateway order {}: {e}. Rolling back.", order.order_number, remote_order.id);
                self.discard_order(&order).await;
                return Err(e.into());
            },
        };
        info!("🔄️📦️ Order {} is awaiting payment on gateway order {}", order.order_number, remote_order.id);
        Ok(CreatedOrder { order, remote_order })
    }

    async fn discard_order(&self, order: &Order) {
        if let Err(e) = self.db.delete_order(order.id).await {
            error!("🔄️📦️ Could not delete order {} after a failed checkout: {e}", order.order_number);
        }
    }

    /// Handles the signed receipt the client receives from the checkout widget.
    ///
    /// A receipt that fails the signature check (or names a different gateway order) fails the order. Otherwise the
    /// gateway is asked for the authoritative state of the payment, and the order is settled accordingly. A gateway
    /// error leaves the order `pending`, so that the webhook can still settle it.
    pub async fn verify_payment(&self, buyer_id: i64, receipt: PaymentReceipt) -> Result<Order, OrderFlowError> {
        let order = self.db.fetch_order(receipt.order_id).await?.ok_or(OrderFlowError::OrderNotFound(receipt.order_id))?;
        if !order.is_owned_by(buyer_id) {
            warn!("🔄️💰️ Buyer #{buyer_id} tried to verify a payment for {}, which is not theirs", order.order_number);
            return Err(OrderFlowError::NotOrderOwner);
        }
        let for_this_order = order.remote_order_id.as_deref() == Some(receipt.remote_order_id.as_str());
        let signature_ok = for_this_order &&
            self.verifier
                .verify_payment(&receipt.remote_order_id, &receipt.remote_payment_id, &receipt.signature)
                .is_ok();
        if !signature_ok {
            warn!("🔄️💰️ Rejecting payment receipt for {}", order.order_number);
            self.fail(order.id, SIGNATURE_FAILURE).await?;
            return Err(OrderFlowError::InvalidSignature);
        }
        if order.payment_status == PaymentStatus::Paid &&
            order.remote_payment_id.as_deref() == Some(receipt.remote_payment_id.as_str())
        {
            debug!("🔄️💰️ Payment {} for {} was already applied", receipt.remote_payment_id, order.order_number);
            return Ok(order);
        }
        let payment = self.gateway.fetch_payment(&receipt.remote_payment_id).await.map_err(|e| {
            warn!("🔄️💰️ Could not fetch payment {} from the gateway: {e}", receipt.remote_payment_id);
            OrderFlowError::from(e)
        })?;
        if payment.is_captured_for(&receipt.remote_order_id) {
            let outcome = self.db.complete_payment(order.id, &payment.id).await?;
            warn_if_stranded(&outcome, &payment.id);
            return Ok(self.after_payment(outcome).await);
        }
        let status = payment.status.to_string();
        let outcome = self.fail(order.id, &format!("Payment status: {status}")).await?;
        match outcome {
            TransitionOutcome::AlreadySettled(order) if order.payment_status == PaymentStatus::Paid => Ok(order),
            _ => Err(OrderFlowError::PaymentNotCaptured(status)),
        }
    }

    /// Records a payment failure reported by the client, e.g. because the buyer closed the checkout.
    pub async fn report_payment_failure(
        &self,
        buyer_id: i64,
        order_id: i64,
        reason: Option<String>,
    ) -> Result<Order, OrderFlowError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        if !order.is_owned_by(buyer_id) {
            return Err(OrderFlowError::NotOrderOwner);
        }
        let reason = reason.filter(|r| !r.trim().is_empty()).unwrap_or_else(|| "Payment failed".to_string());
        let outcome = self.fail(order.id, &reason).await?;
        Ok(outcome.into_order())
    }

    /// Verifies and applies a gateway webhook.
    ///
    /// The signature is checked against the raw body before anything is decoded. Webhooks for orders we do not know
    /// about, and event types we do not handle, are acknowledged without changing anything.
    pub async fn process_webhook(&self, raw_body: &[u8], signature: &str) -> Result<WebhookOutcome, OrderFlowError> {
        self.verifier.verify_webhook(raw_body, signature)?;
        let event = WebhookEvent::from_slice(raw_body).map_err(|e| OrderFlowError::MalformedWebhook(e.to_string()))?;
        debug!("🪝️ Received {} webhook", event.name());
        match event {
            WebhookEvent::PaymentCaptured { remote_payment_id, remote_order_id } => {
                let Some(order) = self.order_for_remote_order(remote_order_id.as_deref()).await? else {
                    return Ok(ignored(format!("payment.captured for unknown gateway order {remote_order_id:?}")));
                };
                let outcome = self.db.complete_payment(order.id, &remote_payment_id).await?;
                warn_if_stranded(&outcome, &remote_payment_id);
                let applied = outcome.was_applied();
                let order = self.after_payment(outcome).await;
                Ok(webhook_outcome(applied, order))
            },
            WebhookEvent::PaymentFailed { remote_order_id, description, .. } => {
                let Some(order) = self.order_for_remote_order(remote_order_id.as_deref()).await? else {
                    return Ok(ignored(format!("payment.failed for unknown gateway order {remote_order_id:?}")));
                };
                let reason = match description {
                    Some(d) => format!("Payment failed via webhook: {d}"),
                    None => "Payment failed via webhook".to_string(),
                };
                let outcome = self.fail(order.id, &reason).await?;
                Ok(webhook_outcome(outcome.was_applied(), outcome.into_order()))
            },
            WebhookEvent::RefundProcessed { remote_refund_id, remote_payment_id, amount } => {
                if let Some(order) = self.db.fetch_order_by_remote_refund_id(&remote_refund_id).await? {
                    debug!("🪝️ Refund {remote_refund_id} for {} confirmed", order.order_number);
                    return Ok(WebhookOutcome::NoChange(order));
                }
                let Some(order) = self.db.fetch_order_by_remote_payment_id(&remote_payment_id).await? else {
                    return Ok(ignored(format!("refund.processed for unknown payment {remote_payment_id}")));
                };
                let refund = RefundRecord { remote_refund_id, amount, reason: None };
                let outcome = self.db.refund_payment(order.id, refund).await?;
                let applied = outcome.was_applied();
                let order = self.after_refund(outcome).await;
                Ok(webhook_outcome(applied, order))
            },
            WebhookEvent::Unhandled(name) => Ok(ignored(format!("unhandled event type {name}"))),
        }
    }

    /// Refunds a paid order through the gateway and marks it as refunded.
    pub async fn refund_order(&self, order_id: i64, request: RefundOrderRequest) -> Result<RefundResult, OrderFlowError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        if order.payment_status != PaymentStatus::Paid {
            return Err(OrderFlowError::CannotRefund(format!("The order is {}", order.state())));
        }
        let Some(remote_payment_id) = order.remote_payment_id.clone() else {
            return Err(OrderFlowError::CannotRefund("No gateway payment is recorded for the order".into()));
        };
        let amount = request.amount.unwrap_or(order.total_amount);
        if !amount.is_positive() || amount > order.total_amount {
            return Err(OrderFlowError::InvalidRefundAmount(format!(
                "{amount} must be more than zero and at most the order total of {}",
                order.total_amount
            )));
        }
        let reason = request.reason.filter(|r| !r.trim().is_empty()).unwrap_or_else(|| "Refund requested".to_string());
        let mut notes = BTreeMap::new();
        notes.insert("reason".to_string(), reason.clone());
        notes.insert("order_id".to_string(), order.id.to_string());
        let refund_request = RefundRequest { remote_payment_id, amount, notes };
        let refund = self.gateway.refund(refund_request).await.map_err(|e| {
            warn!("🔄️💸️ Gateway refund for {} failed: {e}", order.order_number);
            OrderFlowError::from(e)
        })?;
        info!("🔄️💸️ Gateway issued refund {} of {amount} for {}", refund.id, order.order_number);
        let record = RefundRecord { remote_refund_id: refund.id.clone(), amount, reason: Some(reason) };
        let outcome = self.db.refund_payment(order.id, record).await?;
        if !outcome.was_applied() {
            warn!(
                "🔄️💸️ {} changed state while refund {} was in flight. It is now {}",
                order.order_number,
                refund.id,
                outcome.order().state()
            );
        }
        let order = self.after_refund(outcome).await;
        Ok(RefundResult { refund, order })
    }

    async fn order_for_remote_order(&self, remote_order_id: Option<&str>) -> Result<Option<Order>, OrderFlowError> {
        match remote_order_id {
            Some(id) => Ok(self.db.fetch_order_by_remote_order_id(id).await?),
            None => Ok(None),
        }
    }

    async fn fail(&self, order_id: i64, reason: &str) -> Result<TransitionOutcome, OrderFlowError> {
        let outcome = self.db.fail_payment(order_id, reason).await?;
        if let TransitionOutcome::Applied(order) = &outcome {
            info!("🔄️❌️ Order {} failed: {reason}", order.order_number);
            self.producers.publish_order_annulled(OrderAnnulledEvent::new(order.clone(), reason)).await;
        }
        Ok(outcome)
    }

    async fn after_payment(&self, outcome: TransitionOutcome) -> Order {
        match outcome {
            TransitionOutcome::Applied(order) => {
                info!("🔄️✅️ Order {} has been paid", order.order_number);
                self.producers.publish_order_paid(OrderPaidEvent::new(order.clone())).await;
                order
            },
            TransitionOutcome::AlreadySettled(order) => {
                debug!("🔄️✅️ Order {} was already settled as {}", order.order_number, order.state());
                order
            },
        }
    }

    async fn after_refund(&self, outcome: TransitionOutcome) -> Order {
        match outcome {
            TransitionOutcome::Applied(order) => {
                info!("🔄️💸️ Order {} has been refunded", order.order_number);
                self.producers.publish_order_refunded(OrderRefundedEvent::new(order.clone())).await;
                order
            },
            TransitionOutcome::AlreadySettled(order) => order,
        }
    }
}

/// A capture that lands on an order that was already cancelled or failed leaves money with the gateway that no order
/// accounts for.
fn warn_if_stranded(outcome: &TransitionOutcome, remote_payment_id: &str) {
    if let TransitionOutcome::AlreadySettled(settled) = outcome {
        if settled.payment_status != PaymentStatus::Paid {
            warn!(
                "🔄️💰️ Payment {remote_payment_id} was captured for {}, which is already {}. It must be refunded manually.",
                settled.order_number,
                settled.state()
            );
        }
    }
}

fn ignored(reason: String) -> WebhookOutcome {
    warn!("🪝️ Webhook ignored: {reason}");
    WebhookOutcome::Ignored(reason)
}

fn webhook_outcome(applied: bool, order: Order) -> WebhookOutcome {
    if applied {
        WebhookOutcome::Transitioned(order)
    } else {
        WebhookOutcome::NoChange(order)
    }
}
