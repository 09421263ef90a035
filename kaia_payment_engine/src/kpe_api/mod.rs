//! # Kaia payment engine public API
//!
//! The `kpe_api` module exposes the programmatic API for the Kaia payment engine.
//!
//! * [`order_flow_api`] is the order ledger: ingestion of orders, the status state machine, lazy expiry and the
//!   reconciliation entry points used after a confirmed on-chain transfer.
//! * [`merchant_api`] is the merchant directory: sign-in by wallet, API keys, profiles and direct invoices.
//!
//! # API usage
//!
//! An API instance is created by supplying a database backend that implements the backend traits required by the API.
//!
//! ```rust,ignore
//! use kaia_payment_engine::{MerchantApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = MerchantApi::new(db);
//! let (merchant, created) = api.authenticate("0x742d35cc6634c0532925a3b844bc9e7595f0beb7").await?;
//! ```

pub mod errors;
pub mod merchant_api;
pub mod order_flow_api;
pub mod order_objects;
