use thiserror::Error;

use crate::{
    db_types::{Order, OrderId},
    order_objects::{PaymentConfirmation, RefundConfirmation},
    traits::PaymentGatewayError,
};

/// The channel through which on-chain outcomes are reported back to the order ledger.
///
/// The payment server implements this directly on top of the ledger ([`crate::OrderFlowApi`]); remote clients (such
/// as a customer wallet running the payment flow) implement it over HTTP. The orchestrators do not care which.
#[allow(async_fn_in_trait)]
pub trait ReconciliationNotifier {
    /// Fetch the current view of the order from the ledger.
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Order, ReconciliationError>;

    /// Report a confirmed payment transfer. The ledger marks the order as `PAID`.
    async fn order_paid(&self, payment: PaymentConfirmation) -> Result<Order, ReconciliationError>;

    /// Report a confirmed refund transfer. The ledger marks the order as `REFUNDED`.
    async fn order_refunded(&self, refund: RefundConfirmation) -> Result<Order, ReconciliationError>;
}

#[derive(Debug, Clone, Error)]
pub enum ReconciliationError {
    #[error("Order {0} does not exist")]
    NotFound(OrderId),
    #[error("The ledger rejected the update: {0}")]
    Rejected(String),
    #[error("The ledger could not be reached: {0}")]
    Unavailable(String),
}

impl From<PaymentGatewayError> for ReconciliationError {
    fn from(e: PaymentGatewayError) -> Self {
        match e {
            PaymentGatewayError::OrderNotFound(id) => ReconciliationError::NotFound(id),
            PaymentGatewayError::DatabaseError(s) => ReconciliationError::Unavailable(s),
            e => ReconciliationError::Rejected(e.to_string()),
        }
    }
}
