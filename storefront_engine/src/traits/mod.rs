//! # Backend contracts
//!
//! This module defines the interfaces that storage backends and payment gateways must expose in order to be used by
//! the storefront engine.
//!
//! * [`OrderLedger`] is the durable record of orders. It owns the lifecycle transitions and guarantees that each one
//!   (along with its side effects) happens at most once.
//! * [`CatalogManagement`] provides product lookups used when pricing an order.
//! * [`CartManagement`] manages the buyer's pending cart, which is emptied when an order is paid.
//! * [`AuthManagement`] resolves bearer tokens to buyer sessions.
//! * [`PaymentGateway`] is the remote payment processor.
mod auth_management;
mod cart_management;
mod catalog_management;
mod data_objects;
mod order_ledger;
mod payment_gateway;

pub use auth_management::{AuthApiError, AuthManagement};
pub use cart_management::CartManagement;
pub use catalog_management::CatalogManagement;
pub use data_objects::{
    DownloadClaim,
    MintOrderRequest,
    OrderPage,
    Pagination,
    RefundRequest,
    RemoteOrder,
    RemotePayment,
    RemotePaymentStatus,
    RemoteRefund,
    TransitionOutcome,
};
pub use order_ledger::{LedgerError, OrderLedger};
pub use payment_gateway::{GatewayError, PaymentGateway};

/// Everything the order flow needs from a storage backend.
pub trait StorefrontDatabase: OrderLedger + CatalogManagement + CartManagement {}

impl<T> StorefrontDatabase for T where T: OrderLedger + CatalogManagement + CartManagement {}
