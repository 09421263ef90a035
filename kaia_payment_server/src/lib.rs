//! # Kaia payment server
//! This crate hosts the HTTP face of the Kaia commerce payment gateway. It is responsible for:
//! * The order ledger API, used by merchants to create invoices and by the payment page to look up orders and report
//!   confirmed transfers.
//! * Receiving order webhooks from Shopify and WooCommerce, verifying their signatures, and recording the orders.
//! * Telling the storefronts when one of their orders has been paid.
//! * Expiring overdue invoices in the background.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `GET /health`: A health check route that returns a 200 OK response.
//! * `POST /api/merchants/auth`: Sign in (and register) with a wallet address.
//! * `POST /api/merchants/profile`, `POST /api/merchants/api-key`: Manage the merchant identified by its API key.
//! * `GET /api/merchants/invoices?wallet=`, `POST /api/merchants/invoices`: List a merchant's orders, or create a
//!   direct invoice.
//! * `GET /api/orders/{id}`: Fetch an order.
//! * `POST /api/orders/update-status`: Move an order to a new status.
//! * `POST /webhooks/shopify`, `POST /webhooks/woocommerce`: Order webhooks from the commerce platforms.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod webhook_routes;

#[cfg(test)]
mod endpoint_tests;
