use chrono::{DateTime, Duration, Utc};
use kaia_common::FiatAmount;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{OrderId, OrderStatusType, WalletAddress},
    traits::{TxHash, TxReceipt},
};

/// Everything the ledger records when an order moves to `PAID`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmation {
    pub order_id: OrderId,
    /// The on-chain identifier of the confirmed transfer.
    pub transfer_hash: String,
    pub customer_wallet: Option<WalletAddress>,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
    pub token_address: Option<String>,
    pub payment_method: Option<String>,
    pub paid_at: DateTime<Utc>,
}

impl PaymentConfirmation {
    pub fn new(order_id: OrderId, transfer_hash: &TxHash) -> Self {
        Self {
            order_id,
            transfer_hash: transfer_hash.to_string(),
            customer_wallet: None,
            block_number: None,
            gas_used: None,
            token_address: None,
            payment_method: None,
            paid_at: Utc::now(),
        }
    }

    pub fn with_customer_wallet(mut self, wallet: WalletAddress) -> Self {
        self.customer_wallet = Some(wallet);
        self
    }

    pub fn with_receipt(mut self, receipt: &TxReceipt) -> Self {
        self.block_number = Some(receipt.block_number);
        self.gas_used = Some(receipt.gas_used);
        self
    }

    pub fn with_token_address(mut self, token: &WalletAddress) -> Self {
        self.token_address = Some(token.to_string());
        self
    }

    pub fn with_payment_method(mut self, method: &str) -> Self {
        self.payment_method = Some(method.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundConfirmation {
    pub order_id: OrderId,
    pub refund_transfer_hash: String,
    pub refunded_at: DateTime<Utc>,
}

impl RefundConfirmation {
    pub fn new(order_id: OrderId, refund_hash: &TxHash) -> Self {
        Self { order_id, refund_transfer_hash: refund_hash.to_string(), refunded_at: Utc::now() }
    }
}

/// A generic request to move an order to a new status, as received over the ledger API.
///
/// Which of the optional fields are required depends on the target status: `PAID` needs a `transfer_hash`, and
/// `REFUNDED` needs a `refund_transfer_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusUpdate {
    pub order_id: OrderId,
    pub status: OrderStatusType,
    #[serde(default)]
    pub transfer_hash: Option<String>,
    #[serde(default)]
    pub customer_wallet: Option<WalletAddress>,
    #[serde(default)]
    pub refund_transfer_hash: Option<String>,
    #[serde(default)]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub gas_used: Option<u64>,
    #[serde(default)]
    pub token_address: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

impl OrderStatusUpdate {
    pub fn new(order_id: OrderId, status: OrderStatusType) -> Self {
        Self {
            order_id,
            status,
            transfer_hash: None,
            customer_wallet: None,
            refund_transfer_hash: None,
            block_number: None,
            gas_used: None,
            token_address: None,
            payment_method: None,
        }
    }

    pub fn with_transfer_hash(mut self, hash: &str) -> Self {
        self.transfer_hash = Some(hash.to_string());
        self
    }

    pub fn with_refund_transfer_hash(mut self, hash: &str) -> Self {
        self.refund_transfer_hash = Some(hash.to_string());
        self
    }

    pub fn with_customer_wallet(mut self, wallet: WalletAddress) -> Self {
        self.customer_wallet = Some(wallet);
        self
    }
}

/// A merchant's request for a new direct invoice.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub merchant_wallet: WalletAddress,
    pub product_name: String,
    pub total_amount: FiatAmount,
    pub currency: String,
    pub customer_email: Option<String>,
    pub description: Option<String>,
    /// Overrides the default invoice lifetime
    pub expires_in: Option<Duration>,
}

impl NewInvoice {
    pub fn new(merchant_wallet: WalletAddress, product_name: &str, total_amount: FiatAmount, currency: &str) -> Self {
        Self {
            merchant_wallet,
            product_name: product_name.to_string(),
            total_amount,
            currency: currency.to_string(),
            customer_email: None,
            description: None,
            expires_in: None,
        }
    }

    pub fn with_customer_email(mut self, email: &str) -> Self {
        self.customer_email = Some(email.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn expires_in(mut self, lifetime: Duration) -> Self {
        self.expires_in = Some(lifetime);
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_update_from_json() {
        let json = r#"{"orderId": "inv_abc", "status": "PAID", "transferHash": "0xdeadbeef",
            "customerWallet": "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"}"#;
        let update: OrderStatusUpdate = serde_json::from_str(json).unwrap();
        assert_eq!(update.order_id.as_str(), "inv_abc");
        assert_eq!(update.status, OrderStatusType::Paid);
        assert_eq!(update.transfer_hash.as_deref(), Some("0xdeadbeef"));
        assert_eq!(update.customer_wallet.unwrap().as_str(), "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
        assert!(update.refund_transfer_hash.is_none());
    }

    #[test]
    fn payment_confirmation_carries_receipt() {
        let receipt = TxReceipt { block_number: 120, gas_used: 51_000 };
        let confirmation = PaymentConfirmation::new(OrderId::from("1"), &TxHash::from("0x01")).with_receipt(&receipt);
        assert_eq!(confirmation.transfer_hash, "0x01");
        assert_eq!(confirmation.block_number, Some(120));
        assert_eq!(confirmation.gas_used, Some(51_000));
    }
}
