use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use kaia_common::FiatAmount;
use kaia_payment_engine::db_types::WalletAddress;
use url::Url;

use crate::erc20::Erc20Token;

/// The public Kairos testnet endpoint
pub const DEFAULT_RPC_URL: &str = "https://public-en-kairos.node.kaia.io";
pub const DEFAULT_CHAIN_ID: u64 = 1001;

#[derive(Parser, Debug)]
#[command(version, about = "Command-line tools for the Kaia stablecoin payment gateway")]
pub struct Arguments {
    /// The base URL of the payment server
    #[arg(short = 'u', long = "server", env = "KAIA_SERVER_URL", default_value = "http://127.0.0.1:8360")]
    pub server: Url,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check that the payment server is up
    Health,
    /// Sign in as a merchant, registering the wallet if it is new, and print the merchant's API key
    Merchant {
        /// The merchant's payout wallet
        #[arg(short, long)]
        wallet: String,
    },
    #[command(subcommand)]
    /// Create or list direct invoices
    Invoice(InvoiceCommand),
    /// Print an order
    Order {
        #[arg(required = true, index = 1)]
        id: String,
    },
    /// Pay an order from the wallet of KAIA_PRIVATE_KEY: approve the merchant (if the allowance is short), then
    /// transfer the order total.
    Pay(PayParams),
    /// Refund a paid order in full from the merchant wallet of KAIA_PRIVATE_KEY back to the customer.
    Refund(RefundParams),
}

#[derive(Debug, Subcommand)]
pub enum InvoiceCommand {
    /// Create a direct invoice and print its payment link
    Create(InvoiceParams),
    /// List every order paying into a merchant wallet, newest first
    List {
        #[arg(short, long)]
        wallet: String,
    },
}

#[derive(Debug, Args)]
pub struct InvoiceParams {
    /// The merchant wallet that receives the payment
    #[arg(short, long)]
    pub wallet: String,
    #[arg(short, long)]
    pub product: String,
    /// The invoice total, e.g. `5500` or `12.50`
    #[arg(short, long, value_parser = parse_amount)]
    pub amount: FiatAmount,
    /// Defaults to KRW on the server
    #[arg(short, long)]
    pub currency: Option<String>,
    #[arg(short, long)]
    pub email: Option<String>,
    #[arg(short, long)]
    pub description: Option<String>,
    /// Minutes until the invoice expires. The server default applies if omitted.
    #[arg(short = 'x', long = "expires-in")]
    pub expires_in_minutes: Option<i64>,
}

#[derive(Debug, Args)]
pub struct ChainParams {
    #[arg(long = "rpc", env = "KAIA_RPC_URL", default_value = DEFAULT_RPC_URL)]
    pub rpc_url: String,
    /// The signing key of the paying (or refunding) wallet
    #[arg(long = "key", env = "KAIA_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,
    #[arg(long = "chain-id", env = "KAIA_CHAIN_ID", default_value_t = DEFAULT_CHAIN_ID)]
    pub chain_id: u64,
    /// The stablecoin contract address
    #[arg(long = "token", env = "KAIA_TOKEN_ADDRESS")]
    pub token_address: WalletAddress,
    /// Seconds to wait for each transaction to be mined
    #[arg(long = "timeout", env = "KAIA_CONFIRMATION_TIMEOUT", default_value_t = 120)]
    pub confirmation_timeout: u64,
    /// How many more times to wait for a transaction that was not confirmed in time. Nothing is resubmitted.
    #[arg(long, default_value_t = 2)]
    pub retries: u32,
}

impl ChainParams {
    pub fn token(&self) -> Result<Erc20Token> {
        Erc20Token::new(&self.rpc_url, &self.private_key, self.chain_id, &self.token_address)
            .map_err(|e| anyhow!("Could not connect to the token contract. {e}"))
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout)
    }
}

#[derive(Debug, Args)]
pub struct PayParams {
    #[arg(short, long = "order")]
    pub order_id: String,
    /// The wallet to pay. Defaults to the order's merchant wallet, and must match it.
    #[arg(long)]
    pub collector: Option<WalletAddress>,
    #[command(flatten)]
    pub chain: ChainParams,
}

#[derive(Debug, Args)]
pub struct RefundParams {
    #[arg(short, long = "order")]
    pub order_id: String,
    #[command(flatten)]
    pub chain: ChainParams,
}

fn parse_amount(s: &str) -> Result<FiatAmount> {
    let amount = serde_json::from_value::<FiatAmount>(serde_json::Value::String(s.trim().to_string()))
        .map_err(|e| anyhow!("'{s}' is not a valid amount. {e}"))?;
    if !amount.is_positive() {
        return Err(anyhow!("The amount must be positive"));
    }
    Ok(amount)
}
