use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType},
    order_objects::{PaymentConfirmation, RefundConfirmation},
    traits::{MerchantManagement, OrderManagement},
};

/// This trait defines the highest level of behaviour for backends supporting the payment engine.
///
/// Every write to an order goes through this trait. Implementations must guarantee that:
/// * Inserts are idempotent on the order id.
/// * Each status transition is validated against the order lifecycle
///   (see [`OrderStatusType::can_transition_to`]) and applied as a compare-and-set on the current status, so that
///   two concurrent updates of the same order cannot both succeed.
/// * The fields that accompany a transition (e.g. `transfer_hash` and `paid_at` for `PAID`) are written in the same
///   atomic step as the status itself.
#[allow(async_fn_in_trait)]
pub trait PaymentGatewayDatabase: Clone + OrderManagement + MerchantManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Takes a new order, and in a single atomic transaction, stores the order in the database.
    /// This call is idempotent: if an order with the same id already exists, it is returned unchanged.
    ///
    /// Returns the stored order, and true if the order was inserted, or false if it already existed.
    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), PaymentGatewayError>;

    /// Moves an order from `PENDING` to `PAID`.
    ///
    /// The transfer hash, `paid_at` timestamp, and any supplied payment metadata (customer wallet, block number, gas
    /// used, token address) are stored together with the status change.
    ///
    /// ## Failure modes:
    /// - `OrderNotFound` if the order does not exist.
    /// - `InvalidTransition` if the order is not `PENDING`.
    /// - `TransitionConflict` if the order status changed while the update was in progress.
    async fn mark_order_paid(&self, payment: &PaymentConfirmation) -> Result<Order, PaymentGatewayError>;

    /// Moves an order from `PAID` to `REFUNDED`, storing the refund transfer hash and `refunded_at` timestamp.
    ///
    /// A refund can be recorded at most once per order. Attempting to record a second refund results in
    /// `RefundAlreadyIssued`.
    async fn mark_order_refunded(&self, refund: &RefundConfirmation) -> Result<Order, PaymentGatewayError>;

    /// Moves a `PENDING` order into one of the terminal non-payment states: `FAILED`, `EXPIRED` or `CANCELLED`.
    async fn annul_order(&self, order_id: &OrderId, status: OrderStatusType) -> Result<Order, PaymentGatewayError>;

    /// Marks every `PENDING` order whose `expires_at` lies before `now` as `EXPIRED`.
    ///
    /// The result is the list of orders that were expired by this call.
    async fn expire_orders(&self, now: DateTime<Utc>) -> Result<Vec<Order>, PaymentGatewayError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), PaymentGatewayError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum PaymentGatewayError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("No merchant is registered for {0}")]
    MerchantNotFound(String),
    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidTransition { order_id: OrderId, from: OrderStatusType, to: OrderStatusType },
    #[error("Order {0} was modified by another request. Fetch the order and try again.")]
    TransitionConflict(OrderId),
    #[error("Order {0} has already been refunded")]
    RefundAlreadyIssued(OrderId),
    #[error("{0}")]
    ValidationError(String),
}

impl From<sqlx::Error> for PaymentGatewayError {
    fn from(e: sqlx::Error) -> Self {
        PaymentGatewayError::DatabaseError(e.to_string())
    }
}
