//! Helpers for testing code that uses the payment engine: throwaway SQLite ledgers and an in-memory token contract.
pub mod mock_token;
pub mod prepare_env;

pub use mock_token::{MockTokenContract, ScriptedOutcome};

use chrono::Utc;
use kaia_common::FiatAmount;

use crate::db_types::{Order, OrderId, OrderStatusType, OrderType, WalletAddress};

/// A `PENDING` direct order that has not been stored anywhere, for use with mocked ledgers.
pub fn pending_order(id: &str, merchant_wallet: &WalletAddress, total_amount: FiatAmount) -> Order {
    let now = Utc::now();
    Order {
        id: OrderId::from(id),
        order_type: OrderType::Direct,
        status: OrderStatusType::Pending,
        total_amount,
        currency: "USD".to_string(),
        merchant_name: "Test merchant".to_string(),
        merchant_wallet: merchant_wallet.clone(),
        product_name: "Widget".to_string(),
        description: None,
        order_confirmation: None,
        customer_email: None,
        customer_wallet: None,
        transfer_hash: None,
        paid_at: None,
        refund_transfer_hash: None,
        refunded_at: None,
        payment_method: None,
        token_address: None,
        block_number: None,
        gas_used: None,
        admin_graphql_api_id: None,
        shop_domain: None,
        expires_at: None,
        created_at: now,
        updated_at: now,
    }
}
