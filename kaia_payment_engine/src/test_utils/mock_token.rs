//! An in-memory ERC-20 style token for exercising the payment and refund orchestrators.
//!
//! Submitted transactions take effect only when they are confirmed through
//! [`TokenContract::wait_for_confirmation`]. The outcome of each wait can be scripted to simulate reverts and
//! timeouts.
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use crate::{
    db_types::WalletAddress,
    traits::{TokenContract, TokenError, TxHash, TxOutcome, TxReceipt},
};

pub const MOCK_TOKEN_ADDRESS: &str = "0x00000000000000000000000000000000000000c0";
/// Kaia Kairos testnet
pub const MOCK_CHAIN_ID: u64 = 1001;

/// What the next call to `wait_for_confirmation` observes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedOutcome {
    Confirm,
    Revert(String),
    Timeout,
}

#[derive(Debug, Clone)]
enum Effect {
    Approve { owner: WalletAddress, spender: WalletAddress, amount: u128 },
    Transfer { from: WalletAddress, to: WalletAddress, amount: u128 },
}

#[derive(Debug, Default)]
struct ChainState {
    decimals: u8,
    balances: HashMap<WalletAddress, u128>,
    allowances: HashMap<(WalletAddress, WalletAddress), u128>,
    pending: HashMap<TxHash, Effect>,
    outcomes: VecDeque<ScriptedOutcome>,
    rejection: Option<String>,
    confirmation_delay: Duration,
    approvals: usize,
    transfers: usize,
    tx_count: u64,
    block: u64,
}

impl ChainState {
    fn submit(&mut self, effect: Effect) -> Result<TxHash, TokenError> {
        if let Some(reason) = self.rejection.take() {
            return Err(TokenError::SubmissionRejected(reason));
        }
        match &effect {
            Effect::Approve { .. } => self.approvals += 1,
            Effect::Transfer { .. } => self.transfers += 1,
        }
        self.tx_count += 1;
        let hash = TxHash(format!("0x{:064x}", self.tx_count));
        self.pending.insert(hash.clone(), effect);
        Ok(hash)
    }

    fn apply(&mut self, effect: Effect) -> Result<(), String> {
        match effect {
            Effect::Approve { owner, spender, amount } => {
                self.allowances.insert((owner, spender), amount);
            },
            Effect::Transfer { from, to, amount } => {
                let available = self.balances.get(&from).copied().unwrap_or_default();
                if available < amount {
                    return Err("ERC20: transfer amount exceeds balance".into());
                }
                self.balances.insert(from, available - amount);
                *self.balances.entry(to).or_default() += amount;
            },
        }
        Ok(())
    }
}

/// A view of the mock token from one signing account. Views created with [`MockTokenContract::for_owner`] share the
/// same chain state.
#[derive(Debug, Clone)]
pub struct MockTokenContract {
    address: WalletAddress,
    chain_id: u64,
    owner: WalletAddress,
    chain: Arc<Mutex<ChainState>>,
}

impl MockTokenContract {
    pub fn new(owner: WalletAddress, decimals: u8) -> Self {
        let address = WalletAddress::parse(MOCK_TOKEN_ADDRESS).expect("Mock token address is valid");
        let chain = ChainState { decimals, block: 100, ..Default::default() };
        Self { address, chain_id: MOCK_CHAIN_ID, owner, chain: Arc::new(Mutex::new(chain)) }
    }

    pub fn for_owner(&self, owner: WalletAddress) -> Self {
        Self { owner, ..self.clone() }
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    fn chain(&self) -> MutexGuard<'_, ChainState> {
        self.chain.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn mint(&self, account: &WalletAddress, amount: u128) {
        *self.chain().balances.entry(account.clone()).or_default() += amount;
    }

    pub fn set_allowance(&self, owner: &WalletAddress, spender: &WalletAddress, amount: u128) {
        self.chain().allowances.insert((owner.clone(), spender.clone()), amount);
    }

    pub fn balance(&self, account: &WalletAddress) -> u128 {
        self.chain().balances.get(account).copied().unwrap_or_default()
    }

    /// Queues the outcome for the next confirmation wait. Unscripted waits confirm.
    pub fn script_outcome(&self, outcome: ScriptedOutcome) {
        self.chain().outcomes.push_back(outcome);
    }

    /// The next approve or transfer is rejected at submission.
    pub fn reject_next_submission(&self, reason: &str) {
        self.chain().rejection = Some(reason.to_string());
    }

    /// Every confirmation wait sleeps for `delay` first.
    pub fn set_confirmation_delay(&self, delay: Duration) {
        self.chain().confirmation_delay = delay;
    }

    pub fn approvals_submitted(&self) -> usize {
        self.chain().approvals
    }

    pub fn transfers_submitted(&self) -> usize {
        self.chain().transfers
    }
}

impl TokenContract for MockTokenContract {
    fn address(&self) -> &WalletAddress {
        &self.address
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn owner(&self) -> &WalletAddress {
        &self.owner
    }

    async fn decimals(&self) -> Result<u8, TokenError> {
        Ok(self.chain().decimals)
    }

    async fn balance_of(&self, account: &WalletAddress) -> Result<u128, TokenError> {
        Ok(self.balance(account))
    }

    async fn allowance(&self, owner: &WalletAddress, spender: &WalletAddress) -> Result<u128, TokenError> {
        Ok(self.chain().allowances.get(&(owner.clone(), spender.clone())).copied().unwrap_or_default())
    }

    async fn approve(&self, spender: &WalletAddress, amount: u128) -> Result<TxHash, TokenError> {
        let effect = Effect::Approve { owner: self.owner.clone(), spender: spender.clone(), amount };
        self.chain().submit(effect)
    }

    async fn transfer(&self, to: &WalletAddress, amount: u128) -> Result<TxHash, TokenError> {
        let effect = Effect::Transfer { from: self.owner.clone(), to: to.clone(), amount };
        self.chain().submit(effect)
    }

    async fn wait_for_confirmation(&self, tx: &TxHash, _timeout: Duration) -> Result<TxOutcome, TokenError> {
        let delay = self.chain().confirmation_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let mut chain = self.chain();
        let outcome = chain.outcomes.pop_front().unwrap_or(ScriptedOutcome::Confirm);
        if outcome == ScriptedOutcome::Timeout {
            return Err(TokenError::ConfirmationTimeout(tx.clone()));
        }
        let effect = chain
            .pending
            .remove(tx)
            .ok_or_else(|| TokenError::InvalidInput(format!("Unknown transaction {tx}")))?;
        chain.block += 1;
        let block_number = chain.block;
        let result = match outcome {
            ScriptedOutcome::Revert(reason) => Err(reason),
            _ => chain.apply(effect),
        };
        match result {
            Ok(()) => Ok(TxOutcome::Confirmed(TxReceipt { block_number, gas_used: 46_000 })),
            Err(reason) => Ok(TxOutcome::Failed { reason }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn wallet(n: u8) -> WalletAddress {
        WalletAddress::parse(&format!("0x{n:040x}")).unwrap()
    }

    #[tokio::test]
    async fn effects_apply_on_confirmation() {
        let token = MockTokenContract::new(wallet(1), 6);
        token.mint(&wallet(1), 500);
        let tx = token.transfer(&wallet(2), 200).await.unwrap();
        assert_eq!(token.balance(&wallet(2)), 0);
        let outcome = token.wait_for_confirmation(&tx, Duration::from_secs(1)).await.unwrap();
        assert!(matches!(outcome, TxOutcome::Confirmed(_)));
        assert_eq!(token.balance(&wallet(1)), 300);
        assert_eq!(token.balance(&wallet(2)), 200);

        let merchant_view = token.for_owner(wallet(2));
        let tx = merchant_view.transfer(&wallet(1), 500).await.unwrap();
        let outcome = merchant_view.wait_for_confirmation(&tx, Duration::from_secs(1)).await.unwrap();
        assert!(matches!(outcome, TxOutcome::Failed { .. }));
        assert_eq!(token.balance(&wallet(2)), 200);
    }

    #[tokio::test]
    async fn scripted_outcomes() {
        let token = MockTokenContract::new(wallet(1), 18);
        let tx = token.approve(&wallet(2), 10).await.unwrap();
        token.script_outcome(ScriptedOutcome::Timeout);
        let err = token.wait_for_confirmation(&tx, Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err, TokenError::ConfirmationTimeout(tx.clone()));
        // Still pending after the timeout
        let outcome = token.wait_for_confirmation(&tx, Duration::from_secs(1)).await.unwrap();
        assert!(matches!(outcome, TxOutcome::Confirmed(_)));
        assert_eq!(token.allowance(&wallet(1), &wallet(2)).await.unwrap(), 10);

        token.reject_next_submission("user denied transaction signature");
        assert!(matches!(token.approve(&wallet(2), 1).await, Err(TokenError::SubmissionRejected(_))));
        assert_eq!(token.approvals_submitted(), 1);
    }
}
