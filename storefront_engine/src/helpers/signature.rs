//! # Gateway signatures
//!
//! The gateway proves the origin of a payment event with a hex-encoded HMAC-SHA256. Two different secrets are in
//! play:
//!
//! * The client callback carries `hex(HMAC(payment_secret, "{remote_order_id}|{remote_payment_id}"))`. The payment
//!   secret is the same as the gateway API key secret.
//! * Webhooks carry `hex(HMAC(webhook_secret, raw_body))` in the `X-Razorpay-Signature` header. The HMAC is computed
//!   over the exact bytes received, so the body must not be parsed (or re-serialised) before it is checked.
//!
//! Comparison is done in constant time by [`Mac::verify_slice`]. A signature that is not valid hex is treated as a
//! mismatch.
use hmac::{Hmac, Mac};
use log::{debug, warn};
use sf_common::Secret;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("The signature does not match the payload")]
    Mismatch,
    #[error("The signature is not valid hex")]
    NotHex,
    #[error("No signing secret has been configured")]
    MissingSecret,
}

#[derive(Debug, Clone, Default)]
pub struct SignatureVerifier {
    payment_secret: Secret<String>,
    webhook_secret: Secret<String>,
}

impl SignatureVerifier {
    pub fn new(payment_secret: Secret<String>, webhook_secret: Secret<String>) -> Self {
        Self { payment_secret, webhook_secret }
    }

    /// Checks the signature the checkout widget hands back to the client after a successful payment.
    pub fn verify_payment(
        &self,
        remote_order_id: &str,
        remote_payment_id: &str,
        signature: &str,
    ) -> Result<(), SignatureError> {
        let message = payment_message(remote_order_id, remote_payment_id);
        verify(&self.payment_secret, message.as_bytes(), signature).map_err(|e| {
            warn!("🔐️ Payment signature for {remote_order_id}/{remote_payment_id} rejected: {e}");
            e
        })
    }

    /// Checks the signature header of a webhook against the raw request body.
    pub fn verify_webhook(&self, raw_body: &[u8], signature: &str) -> Result<(), SignatureError> {
        verify(&self.webhook_secret, raw_body, signature).map_err(|e| {
            warn!("🔐️ Webhook signature rejected: {e}");
            e
        })
    }
}

fn payment_message(remote_order_id: &str, remote_payment_id: &str) -> String {
    format!("{remote_order_id}|{remote_payment_id}")
}

fn verify(secret: &Secret<String>, message: &[u8], signature: &str) -> Result<(), SignatureError> {
    if secret.is_unset() {
        return Err(SignatureError::MissingSecret);
    }
    let expected = hex::decode(signature.trim()).map_err(|_| SignatureError::NotHex)?;
    let mut mac = new_mac(secret)?;
    mac.update(message);
    mac.verify_slice(&expected).map_err(|_| SignatureError::Mismatch)?;
    debug!("🔐️ Signature verified");
    Ok(())
}

fn new_mac(secret: &Secret<String>) -> Result<HmacSha256, SignatureError> {
    HmacSha256::new_from_slice(secret.reveal().as_bytes()).map_err(|_| SignatureError::MissingSecret)
}

/// Computes `hex(HMAC-SHA256(secret, message))`.
pub fn sign(secret: &Secret<String>, message: &[u8]) -> Result<String, SignatureError> {
    let mut mac = new_mac(secret)?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Produces the signature the gateway would attach to a successful checkout.
pub fn sign_payment(
    secret: &Secret<String>,
    remote_order_id: &str,
    remote_payment_id: &str,
) -> Result<String, SignatureError> {
    sign(secret, payment_message(remote_order_id, remote_payment_id).as_bytes())
}
