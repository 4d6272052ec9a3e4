//! Storefront Engine
//!
//! The storefront engine reconciles orders for a digital-goods store with an external payment gateway. The gateway
//! reports on a payment twice, through a signed client callback and through a webhook, in no particular order and
//! possibly more than once. The engine makes sure that each order settles exactly once, and that the side effects of
//! a confirmed payment (stock, download counters, cart clearing) happen exactly once with it.
//!
//! The library is divided into these main sections:
//! 1. Backend contracts ([`mod@traits`]) and the SQLite implementation of them ([`SqliteDatabase`]). The data types
//!    used by the backends are defined in [`mod@db_types`] and are public.
//! 2. The public API ([`OrderFlowApi`], [`AccountApi`], [`AuthApi`]). The API is generic over its backend and over
//!    the [`PaymentGateway`] it talks to, so it can be exercised against a fake gateway.
//! 3. Signature verification and order number generation ([`mod@helpers`]).
//!
//! The engine also publishes lifecycle events (order paid, annulled, refunded) that can be subscribed to via
//! [`events::EventHooks`].
mod db;

pub mod db_types;
pub mod events;
pub mod helpers;
mod sf_api;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use sf_api::{
    accounts_api::AccountApi,
    auth_api::{hash_token, AuthApi},
    errors::OrderFlowError,
    order_flow_api::OrderFlowApi,
    order_objects,
    webhook_objects,
};
pub use traits::{
    AuthApiError,
    AuthManagement,
    CartManagement,
    CatalogManagement,
    GatewayError,
    LedgerError,
    OrderLedger,
    PaymentGateway,
    StorefrontDatabase,
};
