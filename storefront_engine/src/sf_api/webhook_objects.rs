//! Gateway webhook payloads.
//!
//! The gateway wraps every notification in an envelope of the form
//!
//! ```json
//! { "event": "payment.captured", "payload": { "payment": { "entity": { "id": "pay_..", "order_id": "order_.." } } } }
//! ```
//!
//! Only the fields the reconciliation engine acts on are decoded; everything else is ignored.
use serde::Deserialize;
use serde_json::Error as JsonError;
use sf_common::Paise;

use crate::db_types::Order;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    PaymentCaptured { remote_payment_id: String, remote_order_id: Option<String> },
    PaymentFailed { remote_payment_id: String, remote_order_id: Option<String>, description: Option<String> },
    RefundProcessed { remote_refund_id: String, remote_payment_id: String, amount: Paise },
    /// Any event type we do not subscribe to.
    Unhandled(String),
}

impl WebhookEvent {
    pub fn name(&self) -> &str {
        match self {
            WebhookEvent::PaymentCaptured { .. } => "payment.captured",
            WebhookEvent::PaymentFailed { .. } => "payment.failed",
            WebhookEvent::RefundProcessed { .. } => "refund.processed",
            WebhookEvent::Unhandled(name) => name.as_str(),
        }
    }

    /// Decodes a webhook body. The signature must have been checked against these exact bytes beforehand.
    pub fn from_slice(raw: &[u8]) -> Result<Self, WebhookParseError> {
        let envelope: WebhookEnvelope = serde_json::from_slice(raw)?;
        let payload = envelope.payload;
        let event = match envelope.event.as_str() {
            "payment.captured" => {
                let p = payload.payment.ok_or(WebhookParseError::MissingEntity("payment"))?.entity;
                WebhookEvent::PaymentCaptured { remote_payment_id: p.id, remote_order_id: p.order_id }
            },
            "payment.failed" => {
                let p = payload.payment.ok_or(WebhookParseError::MissingEntity("payment"))?.entity;
                WebhookEvent::PaymentFailed {
                    remote_payment_id: p.id,
                    remote_order_id: p.order_id,
                    description: p.error_description,
                }
            },
            "refund.processed" => {
                let r = payload.refund.ok_or(WebhookParseError::MissingEntity("refund"))?.entity;
                WebhookEvent::RefundProcessed {
                    remote_refund_id: r.id,
                    remote_payment_id: r.payment_id,
                    amount: Paise::from(r.amount),
                }
            },
            other => WebhookEvent::Unhandled(other.to_string()),
        };
        Ok(event)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookParseError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] JsonError),
    #[error("The payload has no {0} entity")]
    MissingEntity(&'static str),
}

/// What a webhook did to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The webhook drove a transition.
    Transitioned(Order),
    /// The order was already in its final state for this event.
    NoChange(Order),
    /// Nothing to do. The reason is logged and returned for diagnostics.
    Ignored(String),
}

#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    event: String,
    #[serde(default)]
    payload: WebhookPayload,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookPayload {
    payment: Option<Entity<PaymentEntity>>,
    refund: Option<Entity<RefundEntity>>,
}

#[derive(Debug, Deserialize)]
struct Entity<T> {
    entity: T,
}

#[derive(Debug, Deserialize)]
struct PaymentEntity {
    id: String,
    order_id: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefundEntity {
    id: String,
    payment_id: String,
    amount: i64,
}
