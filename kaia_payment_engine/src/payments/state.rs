use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{
    db_types::{OrderId, WalletAddress},
    traits::{TxHash, TxReceipt},
};

/// Everything a payment run needs to know about the world, supplied per invocation.
#[derive(Debug, Clone)]
pub struct PaymentContext<T> {
    /// The wallet that pays (and signs via `token`)
    pub customer_address: WalletAddress,
    pub chain_id: u64,
    /// The wallet that receives the payment. This must be the order's merchant wallet.
    pub collector_address: WalletAddress,
    pub token: T,
}

impl<T> PaymentContext<T> {
    pub fn new(customer_address: WalletAddress, chain_id: u64, collector_address: WalletAddress, token: T) -> Self {
        Self { customer_address, chain_id, collector_address, token }
    }
}

/// ```text
/// idle ──► approving ──► approved ──► transferring ──► completed
///              │                           │
///              └──────────► error ◄────────┘
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStep {
    #[default]
    Idle,
    Approving,
    Approved,
    Transferring,
    Completed,
    Error,
}

impl Display for PaymentStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStep::Idle => "idle",
            PaymentStep::Approving => "approving",
            PaymentStep::Approved => "approved",
            PaymentStep::Transferring => "transferring",
            PaymentStep::Completed => "completed",
            PaymentStep::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Approve,
    Transfer,
}

/// A submitted transaction whose outcome has not been observed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTx {
    pub kind: TxKind,
    pub hash: TxHash,
}

/// The observable progress of a payment for one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentState {
    pub order_id: OrderId,
    pub step: PaymentStep,
    /// The order total in token base units
    pub required_amount: u128,
    pub approve_tx: Option<TxHash>,
    pub transfer_tx: Option<TxHash>,
    /// Receipt of the confirmed transfer
    pub receipt: Option<TxReceipt>,
    /// The step that was being attempted when the run entered `error`
    pub failed_step: Option<PaymentStep>,
    pub error: Option<String>,
    /// Set while a submitted transaction is unconfirmed. A later run waits for it rather than submitting again.
    pub awaiting: Option<PendingTx>,
    /// True once the ledger has recorded the transfer
    pub reconciled: bool,
}

impl PaymentState {
    pub fn new(order_id: OrderId) -> Self {
        Self {
            order_id,
            step: PaymentStep::Idle,
            required_amount: 0,
            approve_tx: None,
            transfer_tx: None,
            receipt: None,
            failed_step: None,
            error: None,
            awaiting: None,
            reconciled: false,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.step == PaymentStep::Completed
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefundStep {
    #[default]
    Idle,
    Transferring,
    Completed,
    Error,
}

impl Display for RefundStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RefundStep::Idle => "idle",
            RefundStep::Transferring => "transferring",
            RefundStep::Completed => "completed",
            RefundStep::Error => "error",
        };
        f.write_str(s)
    }
}

/// The observable progress of a refund for one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundState {
    pub order_id: OrderId,
    pub step: RefundStep,
    pub amount: u128,
    pub refund_tx: Option<TxHash>,
    pub receipt: Option<TxReceipt>,
    pub error: Option<String>,
    /// A submitted refund transfer whose outcome has not been observed yet
    pub awaiting: Option<TxHash>,
    pub reconciled: bool,
}

impl RefundState {
    pub fn new(order_id: OrderId) -> Self {
        Self {
            order_id,
            step: RefundStep::Idle,
            amount: 0,
            refund_tx: None,
            receipt: None,
            error: None,
            awaiting: None,
            reconciled: false,
        }
    }
}
