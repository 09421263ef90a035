use kaia_common::FiatAmountError;
use thiserror::Error;

use crate::{
    db_types::{OrderId, OrderStatusType},
    payments::{PaymentStep, RefundStep},
    traits::{ReconciliationError, TokenError, TxHash},
};

#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    #[error("Payment rejected: {0}")]
    Validation(String),
    #[error("Insufficient balance. The payment requires {required} token units, but the wallet holds {available}")]
    InsufficientBalance { required: u128, available: u128 },
    #[error("A payment for order {0} is already in progress")]
    AlreadyInFlight(OrderId),
    #[error("The order total cannot be expressed in token units. {0}")]
    Amount(#[from] FiatAmountError),
    #[error("Token contract error during {step}: {source}")]
    Token { step: PaymentStep, source: TokenError },
    #[error("The {step} transaction failed: {reason}")]
    TransactionFailed { step: PaymentStep, reason: String },
    #[error("Could not load the order from the ledger. {0}")]
    Ledger(ReconciliationError),
    #[error("Transfer {transfer_tx} was confirmed, but the ledger was not updated: {reason}. Retry to report it again.")]
    ReconciliationFailed { transfer_tx: TxHash, reason: String },
}

#[derive(Debug, Clone, Error)]
pub enum RefundError {
    #[error("Refund rejected: {0}")]
    Validation(String),
    #[error("Only paid orders can be refunded. Order {order_id} is {status}")]
    NotRefundable { order_id: OrderId, status: OrderStatusType },
    #[error("Order {0} has already been refunded")]
    AlreadyRefunded(OrderId),
    #[error("Order {0} has no customer wallet on record to refund to")]
    MissingCustomerWallet(OrderId),
    #[error("Insufficient balance. The refund requires {required} token units, but the merchant wallet holds {available}")]
    InsufficientBalance { required: u128, available: u128 },
    #[error("A refund for order {0} is already in progress")]
    AlreadyInFlight(OrderId),
    #[error("The order total cannot be expressed in token units. {0}")]
    Amount(#[from] FiatAmountError),
    #[error("Token contract error during {step}: {source}")]
    Token { step: RefundStep, source: TokenError },
    #[error("The refund transaction failed: {0}")]
    TransactionFailed(String),
    #[error("Could not load the order from the ledger. {0}")]
    Ledger(ReconciliationError),
    #[error("Refund {refund_tx} was confirmed, but the ledger was not updated: {reason}. Retry to report it again.")]
    ReconciliationFailed { refund_tx: TxHash, reason: String },
}
