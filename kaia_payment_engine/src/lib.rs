//! Kaia Payment Engine
//!
//! The Kaia Payment Engine lets merchants accept a USD-pegged stablecoin on the Kaia network as a payment method for
//! goods and services. This library contains the core logic of the payment gateway. It knows nothing about HTTP or
//! about any particular commerce platform.
//!
//! The library is divided into three main sections:
//! 1. The ledger backend contracts ([`mod@traits`]) and the SQLite implementation of them ([`SqliteDatabase`]). You
//!    should never need to access the database directly. Instead, use the public API provided by the payment engine.
//!    The exception is the data types stored in the ledger. These are defined in the [`mod@db_types`] module and are
//!    public.
//! 2. The payment engine public API ([`OrderFlowApi`] and [`MerchantApi`]). The order flow API is the order ledger:
//!    it ingests orders, enforces the status state machine, expires stale orders and accepts payment and refund
//!    confirmations. The merchant API is the merchant directory.
//! 3. Payment and refund orchestration ([`mod@payments`]). These drive the on-chain side of a payment (`approve`, then
//!    `transfer`) or of a refund through a [`TokenContract`] and report the outcome to the ledger through a
//!    [`ReconciliationNotifier`].
//!
//! The engine also emits events after order status changes are committed, for example an `OrderPaid` event when an
//! order is marked as paid. A simple actor framework ([`mod@events`]) lets you hook into these events and perform
//! custom actions, such as telling the upstream store that the order has been paid.
pub mod db_types;
pub mod events;
pub mod helpers;
mod kpe_api;
pub mod payments;
#[cfg(feature = "sqlite")]
mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use kpe_api::{
    errors::MerchantApiError,
    merchant_api::MerchantApi,
    order_flow_api::OrderFlowApi,
    order_objects,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    MerchantManagement,
    OrderManagement,
    PaymentGatewayDatabase,
    PaymentGatewayError,
    ReconciliationError,
    ReconciliationNotifier,
    TokenContract,
    TokenError,
    TxHash,
    TxOutcome,
    TxReceipt,
};
