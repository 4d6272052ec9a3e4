//! A minimal client for the Razorpay REST API.
//!
//! Only the three calls the storefront needs are covered: minting an order, fetching a payment and refunding a
//! payment. Every call is authenticated with HTTP basic auth (`key_id:key_secret`) and bounded by the configured
//! timeout. Nothing is retried.
mod api;
mod config;
mod error;

mod data_objects;

pub use api::RazorpayApi;
pub use config::RazorpayConfig;
pub use data_objects::{NewRazorpayOrder, NewRazorpayRefund, PaymentState, RazorpayOrder, RazorpayPayment, RazorpayRefund};
pub use error::RazorpayApiError;
