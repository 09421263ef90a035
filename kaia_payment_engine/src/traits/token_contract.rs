use std::{fmt::Display, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::WalletAddress;

/// A transaction hash, in `0x`-prefixed hex form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(pub String);

impl TxHash {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TxHash {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub block_number: u64,
    pub gas_used: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    /// The transaction was mined and executed successfully.
    Confirmed(TxReceipt),
    /// The transaction was mined, but reverted.
    Failed { reason: String },
}

/// A connection to an ERC-20 style stablecoin contract, bound to a single signing account (the `owner`).
///
/// All amounts are in the token's base units. Submission methods return as soon as the network has accepted the
/// transaction; call [`TokenContract::wait_for_confirmation`] to learn its outcome.
#[allow(async_fn_in_trait)]
pub trait TokenContract {
    /// The address of the token contract.
    fn address(&self) -> &WalletAddress;
    fn chain_id(&self) -> u64;
    /// The account that signs approvals and transfers.
    fn owner(&self) -> &WalletAddress;

    async fn decimals(&self) -> Result<u8, TokenError>;
    async fn balance_of(&self, account: &WalletAddress) -> Result<u128, TokenError>;
    async fn allowance(&self, owner: &WalletAddress, spender: &WalletAddress) -> Result<u128, TokenError>;
    /// Grants `spender` the right to move up to `amount` of the owner's tokens.
    async fn approve(&self, spender: &WalletAddress, amount: u128) -> Result<TxHash, TokenError>;
    /// Transfers `amount` from the owner to `to`.
    async fn transfer(&self, to: &WalletAddress, amount: u128) -> Result<TxHash, TokenError>;
    /// Waits until the transaction is mined, or until `timeout` elapses, in which case
    /// [`TokenError::ConfirmationTimeout`] is returned. A timeout does not mean the transaction failed.
    async fn wait_for_confirmation(&self, tx: &TxHash, timeout: Duration) -> Result<TxOutcome, TokenError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("The transaction was rejected before submission: {0}")]
    SubmissionRejected(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Timed out waiting for transaction {0} to be confirmed")]
    ConfirmationTimeout(TxHash),
    #[error("Invalid contract input: {0}")]
    InvalidInput(String),
}
