//! An ethers-backed [`TokenContract`] for ERC-20 stablecoins on Kaia (or any EVM chain).
use std::{sync::Arc, time::Duration};

use ethers::{
    prelude::*,
    providers::{Http, Provider},
    types::{Address, TransactionReceipt, H256, U256},
};
use kaia_payment_engine::{
    db_types::WalletAddress,
    traits::{TokenContract, TokenError, TxHash, TxOutcome, TxReceipt},
};
use log::*;

abigen!(
    IERC20,
    r#"[
        function approve(address spender, uint256 amount) external returns (bool)
        function transfer(address to, uint256 amount) external returns (bool)
        function allowance(address owner, address spender) external view returns (uint256)
        function balanceOf(address account) external view returns (uint256)
        function decimals() external view returns (uint8)
    ]"#
);

type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// A stablecoin contract, with approvals and transfers signed by a local private key.
pub struct Erc20Token {
    client: Arc<SignerClient>,
    contract: IERC20<SignerClient>,
    address: WalletAddress,
    owner: WalletAddress,
    chain_id: u64,
}

impl Erc20Token {
    pub fn new(rpc_url: &str, private_key: &str, chain_id: u64, token: &WalletAddress) -> Result<Self, TokenError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| TokenError::InvalidInput(format!("Invalid RPC URL {rpc_url}. {e}")))?
            .interval(RECEIPT_POLL_INTERVAL);
        let wallet = private_key
            .trim()
            .parse::<LocalWallet>()
            .map_err(|e| TokenError::InvalidInput(format!("Invalid private key. {e}")))?
            .with_chain_id(chain_id);
        let owner = wallet_address(wallet.address())?;
        let client = Arc::new(SignerMiddleware::new(provider, wallet));
        let contract = IERC20::new(evm_address(token)?, client.clone());
        debug!("🪙️ Connected to token {token} on chain {chain_id} at {rpc_url} as {owner}");
        Ok(Self { client, contract, address: token.clone(), owner, chain_id })
    }
}

impl TokenContract for Erc20Token {
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
        self.contract.decimals().call().await.map_err(read_error)
    }

    async fn balance_of(&self, account: &WalletAddress) -> Result<u128, TokenError> {
        let balance = self.contract.balance_of(evm_address(account)?).call().await.map_err(read_error)?;
        token_units(balance)
    }

    async fn allowance(&self, owner: &WalletAddress, spender: &WalletAddress) -> Result<u128, TokenError> {
        let allowance =
            self.contract.allowance(evm_address(owner)?, evm_address(spender)?).call().await.map_err(read_error)?;
        token_units(allowance)
    }

    async fn approve(&self, spender: &WalletAddress, amount: u128) -> Result<TxHash, TokenError> {
        let call = self.contract.approve(evm_address(spender)?, U256::from(amount));
        let pending = call.send().await.map_err(submission_error)?;
        Ok(tx_hash(pending.tx_hash()))
    }

    async fn transfer(&self, to: &WalletAddress, amount: u128) -> Result<TxHash, TokenError> {
        let call = self.contract.transfer(evm_address(to)?, U256::from(amount));
        let pending = call.send().await.map_err(submission_error)?;
        Ok(tx_hash(pending.tx_hash()))
    }

    /// Polls for the receipt until it appears or `timeout` elapses. RPC errors while polling are not fatal; the
    /// transaction may still be mined.
    async fn wait_for_confirmation(&self, tx: &TxHash, timeout: Duration) -> Result<TxOutcome, TokenError> {
        let hash = tx
            .as_str()
            .parse::<H256>()
            .map_err(|e| TokenError::InvalidInput(format!("{tx} is not a transaction hash. {e}")))?;
        let poll = async {
            loop {
                match self.client.get_transaction_receipt(hash).await {
                    Ok(Some(receipt)) => return receipt,
                    Ok(None) => trace!("🪙️ {tx} is not mined yet"),
                    Err(e) => warn!("🪙️ Could not fetch the receipt for {tx}. {e}"),
                }
                tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
            }
        };
        let receipt = tokio::time::timeout(timeout, poll).await.map_err(|_| TokenError::ConfirmationTimeout(tx.clone()))?;
        Ok(tx_outcome(&receipt))
    }
}

pub fn tx_outcome(receipt: &TransactionReceipt) -> TxOutcome {
    if receipt.status == Some(1u64.into()) {
        TxOutcome::Confirmed(TxReceipt {
            block_number: receipt.block_number.map(|n| n.as_u64()).unwrap_or_default(),
            gas_used: receipt.gas_used.map(|g| g.low_u64()).unwrap_or_default(),
        })
    } else {
        TxOutcome::Failed { reason: "the transaction reverted".into() }
    }
}

pub fn evm_address(address: &WalletAddress) -> Result<Address, TokenError> {
    address.as_str().parse::<Address>().map_err(|e| TokenError::InvalidInput(format!("{address}: {e}")))
}

pub fn wallet_address(address: Address) -> Result<WalletAddress, TokenError> {
    WalletAddress::parse(&format!("{address:#x}")).map_err(|e| TokenError::InvalidInput(e.to_string()))
}

fn tx_hash(hash: H256) -> TxHash {
    TxHash(format!("{hash:#x}"))
}

fn token_units(value: U256) -> Result<u128, TokenError> {
    u128::try_from(value).map_err(|_| TokenError::InvalidInput(format!("{value} does not fit in 128 bits")))
}

fn read_error(e: ContractError<SignerClient>) -> TokenError {
    TokenError::Network(e.to_string())
}

fn submission_error(e: ContractError<SignerClient>) -> TokenError {
    match e {
        ContractError::ProviderError { e } => TokenError::Network(e.to_string()),
        e => TokenError::SubmissionRejected(e.to_string()),
    }
}
