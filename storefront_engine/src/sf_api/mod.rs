//! # Storefront engine public API
//!
//! The `sf_api` module exposes the programmatic API of the storefront engine. Each API is created by supplying the
//! backend (and, for the order flow, the payment gateway) it needs.
//!
//! * [`order_flow_api`] is the reconciliation engine: order creation, payment callbacks, webhooks and refunds.
//! * [`accounts_api`] serves order queries and download entitlements.
//! * [`auth_api`] resolves bearer tokens into sessions.
//!
//! ```rust,ignore
//! use storefront_engine::{events::EventProducers, helpers::SignatureVerifier, OrderFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(url, 25).await?;
//! let api = OrderFlowApi::new(db, gateway, SignatureVerifier::new(key_secret, webhook_secret), EventProducers::default());
//! let created = api.create_order(request).await?;
//! ```
pub mod accounts_api;
pub mod auth_api;
pub mod errors;
pub mod order_flow_api;
pub mod order_objects;
pub mod webhook_objects;
