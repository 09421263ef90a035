//! Shopify integration for the Kaia commerce payment gateway.
//!
//! * [`ShopifyOrder`] is the payload Shopify sends to the `orders/create` and `orders/paid` webhooks.
//! * [`ShopifyApi`] is a thin Admin API client. The gateway uses it to mark an order as paid on the storefront once
//!   the customer's stablecoin transfer has been confirmed.
mod api;
mod config;
mod error;
pub mod helpers;
mod shopify_order;

pub use api::{MarkAsPaidResult, Money, MoneyBag, OrderTransaction, ShopifyApi};
pub use config::ShopifyConfig;
pub use error::ShopifyApiError;
pub use shopify_order::{Customer, LineItem, OrderBuilder, ShopifyOrder};
