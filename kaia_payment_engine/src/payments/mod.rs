//! # Payment and refund orchestration
//!
//! [`PaymentOrchestrator`] runs the customer side of a payment: it reads the balance and allowance oracle, submits
//! `approve` (only if the current allowance is short) and then `transfer`, waits for each to be confirmed, and reports
//! the confirmed transfer through a [`crate::traits::ReconciliationNotifier`].
//!
//! [`RefundOrchestrator`] runs a merchant refund: a direct transfer back to the customer, then `REFUNDED` in the
//! ledger.
//!
//! Both keep per-order session state, publish it on a `watch` channel, and refuse to start a second run for an order
//! that already has one in progress.
mod errors;
mod in_flight;
#[cfg(test)]
mod mocks;
mod payment_orchestrator;
mod refund_orchestrator;
mod state;

pub use errors::{PaymentError, RefundError};
pub use in_flight::{InFlightGuard, InFlightRegistry};
pub use payment_orchestrator::{PaymentOrchestrator, DEFAULT_CONFIRMATION_TIMEOUT, WALLET_PAYMENT_METHOD};
pub use refund_orchestrator::RefundOrchestrator;
pub use state::{PaymentContext, PaymentState, PaymentStep, PendingTx, RefundState, RefundStep, TxKind};
