//! #  Ledger backends and chain collaborators
//!
//! This module defines the interface contracts that the payment engine relies on. Nothing in here knows about HTTP,
//! SQL or JSON-RPC; concrete backends live elsewhere (see [`crate::SqliteDatabase`] for the ledger).
//!
//! * [`PaymentGatewayDatabase`] is the highest level of behaviour for ledger backends. It owns every mutation of an
//!   order, so that status transitions are checked and applied atomically in one place.
//! * [`OrderManagement`] provides read-only queries over orders.
//! * [`MerchantManagement`] is the merchant directory.
//! * [`TokenContract`] is the view of a single stablecoin contract as seen from one wallet: the balance/allowance
//!   oracle plus transaction submission and confirmation.
//! * [`ReconciliationNotifier`] is how a payment or refund run reports a confirmed transfer back to the ledger.
mod merchant_management;
mod order_management;
mod payment_gateway_database;
mod reconciliation;
mod token_contract;

pub use merchant_management::MerchantManagement;
pub use order_management::OrderManagement;
pub use payment_gateway_database::{PaymentGatewayDatabase, PaymentGatewayError};
pub use reconciliation::{ReconciliationError, ReconciliationNotifier};
pub use token_contract::{TokenContract, TokenError, TxHash, TxOutcome, TxReceipt};
