//! # Storefront server
//! This crate hosts the HTTP surface of the storefront's order and payment engine. It is responsible for:
//! * Creating orders on behalf of authenticated buyers and minting their counterparts at the payment gateway.
//! * Accepting the signed payment receipts that the checkout widget hands to the client.
//! * Receiving payment gateway webhooks, verifying their signatures and passing them to the reconciliation engine.
//! * Order queries, download entitlements and admin refunds.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/webhooks/gateway`: Gateway webhooks. Authenticated by HMAC signature and, optionally, an IP whitelist.
//! * `/api/...`: Buyer and admin routes. These require a bearer token. See [routes](routes/index.html).

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;

pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
