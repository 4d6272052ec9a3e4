//! Builders for gateway webhook bodies, with their signatures.
use serde_json::json;
use sf_common::{Paise, Secret};

use crate::helpers::sign;

pub fn payment_captured(remote_payment_id: &str, remote_order_id: &str) -> String {
    json!({
        "entity": "event",
        "event": "payment.captured",
        "payload": { "payment": { "entity": {
            "id": remote_payment_id, "order_id": remote_order_id, "status": "captured"
        } } }
    })
    .to_string()
}

pub fn payment_failed(remote_payment_id: &str, remote_order_id: &str) -> String {
    json!({
        "entity": "event",
        "event": "payment.failed",
        "payload": { "payment": { "entity": {
            "id": remote_payment_id, "order_id": remote_order_id, "status": "failed",
            "error_description": "Payment was declined by the bank"
        } } }
    })
    .to_string()
}

pub fn refund_processed(remote_refund_id: &str, remote_payment_id: &str, amount: Paise) -> String {
    json!({
        "entity": "event",
        "event": "refund.processed",
        "payload": { "refund": { "entity": {
            "id": remote_refund_id, "payment_id": remote_payment_id, "amount": amount.value(), "status": "processed"
        } } }
    })
    .to_string()
}

/// Signs a body with the given webhook secret.
pub fn signed(body: &str, webhook_secret: &str) -> (String, String) {
    let signature = sign(&Secret::new(webhook_secret.to_string()), body.as_bytes()).expect("Could not sign webhook");
    (body.to_string(), signature)
}
