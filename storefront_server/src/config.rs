use std::{env, net::IpAddr};

use log::*;
use razorpay_tools::RazorpayConfig;
use sf_common::{
    helpers::{parse_boolean_flag, parse_list},
    Secret,
    DEFAULT_CURRENCY_CODE,
};
use storefront_engine::helpers::SignatureVerifier;

const DEFAULT_SF_HOST: &str = "127.0.0.1";
const DEFAULT_SF_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/storefront.db";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The currency that new orders are priced in.
    pub currency: String,
    pub gateway: RazorpayConfig,
    /// Signs webhook bodies. This is a different secret from the API key secret that signs checkout receipts.
    pub webhook_secret: Secret<String>,
    /// If supplied, requests against /webhooks endpoints will be checked against a whitelist of gateway IP addresses.
    /// To explicitly disable the whitelist, set this to "false", "none", or "0".
    pub webhook_whitelist: Option<Vec<IpAddr>>,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SF_HOST.to_string(),
            port: DEFAULT_SF_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            currency: DEFAULT_CURRENCY_CODE.to_string(),
            gateway: RazorpayConfig::default(),
            webhook_secret: Secret::default(),
            webhook_whitelist: None,
            use_x_forwarded_for: false,
            use_forwarded: false,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SF_HOST").ok().unwrap_or_else(|| DEFAULT_SF_HOST.into());
        let port = env::var("SF_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for SF_PORT. {e} Using the default, {DEFAULT_SF_PORT}, instead.");
                    DEFAULT_SF_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SF_PORT);
        let database_url = env::var("SF_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ SF_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let currency = env::var("SF_CURRENCY")
            .ok()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| s.len() == 3)
            .unwrap_or_else(|| {
                info!("🪛️ SF_CURRENCY is not set or invalid. Pricing orders in {DEFAULT_CURRENCY_CODE}.");
                DEFAULT_CURRENCY_CODE.to_string()
            });
        let gateway = RazorpayConfig::new_from_env_or_default();
        let webhook_secret = env::var("SF_GATEWAY_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ SF_GATEWAY_WEBHOOK_SECRET is not set. Please set it to the webhook secret configured in the gateway \
                 dashboard. Every webhook will be rejected until you do."
            );
            String::default()
        });
        let webhook_whitelist = env::var("SF_GATEWAY_IP_WHITELIST").ok().and_then(|s| parse_whitelist(&s));
        log_whitelist(&webhook_whitelist);
        let use_x_forwarded_for = parse_boolean_flag(env::var("SF_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("SF_USE_FORWARDED").ok(), false);
        Self {
            host,
            port,
            database_url,
            currency,
            gateway,
            webhook_secret: Secret::new(webhook_secret),
            webhook_whitelist,
            use_x_forwarded_for,
            use_forwarded,
        }
    }

    /// The checkout widget signs receipts with the API key secret; webhooks are signed with the webhook secret.
    pub fn signature_verifier(&self) -> SignatureVerifier {
        SignatureVerifier::new(self.gateway.key_secret.clone(), self.webhook_secret.clone())
    }

    pub fn proxy_config(&self) -> ProxyConfig {
        ProxyConfig { use_x_forwarded_for: self.use_x_forwarded_for, use_forwarded: self.use_forwarded }
    }
}

fn parse_whitelist(s: &str) -> Option<Vec<IpAddr>> {
    if ["none", "false", "0"].contains(&s.trim().to_lowercase().as_str()) {
        info!(
            "🪛️ Webhook IP whitelist is disabled. If this is not what you want, set SF_GATEWAY_IP_WHITELIST to a \
             comma-separated list of IP addresses to enable it."
        );
        return None;
    }
    let ip_addrs = parse_list(s)
        .into_iter()
        .filter_map(|s| {
            s.parse::<IpAddr>()
                .map_err(|e| warn!("🪛️ Ignoring invalid IP address ({s}) in SF_GATEWAY_IP_WHITELIST: {e}"))
                .ok()
        })
        .collect::<Vec<IpAddr>>();
    Some(ip_addrs)
}

fn log_whitelist(whitelist: &Option<Vec<IpAddr>>) {
    match whitelist {
        Some(whitelist) if whitelist.is_empty() => {
            warn!(
                "🚨️ The webhook IP whitelist was configured, but is empty. The server will run, but won't accept any \
                 gateway webhooks."
            );
        },
        None => {
            info!("🪛️ No webhook IP whitelist is set. Only signature validation will be used.");
        },
        Some(v) => {
            let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
            info!("🪛️ Webhook IP whitelist: {addrs}");
        },
    }
}

//-------------------------------------------------  ProxyConfig  ------------------------------------------------------
/// The subset of the configuration that route handlers need in order to work out who is calling. It carries no
/// secrets.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProxyConfig {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}
