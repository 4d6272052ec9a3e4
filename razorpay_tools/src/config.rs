use std::time::Duration;

use log::*;
use sf_common::Secret;

pub const DEFAULT_GATEWAY_URL: &str = "https://api.razorpay.com/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub base_url: String,
    /// The public key id. It is handed to the checkout UI as-is.
    pub key_id: String,
    /// Authenticates API calls and signs checkout receipts.
    pub key_secret: Secret<String>,
    pub timeout: Duration,
}

impl Default for RazorpayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GATEWAY_URL.to_string(),
            key_id: String::default(),
            key_secret: Secret::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl RazorpayConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("SF_GATEWAY_URL").unwrap_or_else(|_| {
            info!("🪛️ SF_GATEWAY_URL not set, using {DEFAULT_GATEWAY_URL}");
            DEFAULT_GATEWAY_URL.to_string()
        });
        let key_id = std::env::var("SF_GATEWAY_KEY_ID").unwrap_or_else(|_| {
            warn!("🪛️ SF_GATEWAY_KEY_ID not set. Gateway calls will be rejected.");
            String::default()
        });
        let key_secret = Secret::new(std::env::var("SF_GATEWAY_KEY_SECRET").unwrap_or_else(|_| {
            warn!("🪛️ SF_GATEWAY_KEY_SECRET not set. Gateway calls and payment verification will fail.");
            String::default()
        }));
        let timeout = std::env::var("SF_GATEWAY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid SF_GATEWAY_TIMEOUT_SECS value '{s}': {e}. Using the default."))
                    .ok()
            })
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self { base_url, key_id, key_secret, timeout: Duration::from_secs(timeout) }
    }
}
