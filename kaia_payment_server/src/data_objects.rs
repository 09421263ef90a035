use std::fmt::Display;

use chrono::Duration;
use kaia_common::FiatAmount;
use kaia_payment_engine::{
    db_types::{Merchant, Order, WalletAddress},
    order_objects::NewInvoice,
};
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

/// The default currency of direct invoices.
pub const DEFAULT_INVOICE_CURRENCY: &str = "KRW";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantAuthRequest {
    #[serde(default)]
    pub wallet_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantAuthResponse {
    pub merchant: Merchant,
    pub is_new: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletQuery {
    pub wallet: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeyQuery {
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// A request to create a direct invoice. Required fields are optional here so that a missing field is reported as a
/// validation error naming the field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRequest {
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub total_amount: Option<FiatAmount>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub merchant_wallet: Option<String>,
    #[serde(default)]
    pub expires_in_minutes: Option<i64>,
}

impl TryFrom<InvoiceRequest> for NewInvoice {
    type Error = ServerError;

    fn try_from(req: InvoiceRequest) -> Result<Self, Self::Error> {
        let missing = |field: &str| ServerError::ValidationError(format!("{field} is required"));
        let product_name = req.product_name.filter(|s| !s.trim().is_empty()).ok_or_else(|| missing("productName"))?;
        let total_amount = req.total_amount.ok_or_else(|| missing("totalAmount"))?;
        let wallet = req.merchant_wallet.filter(|s| !s.trim().is_empty()).ok_or_else(|| missing("merchantWallet"))?;
        let merchant_wallet = WalletAddress::parse(wallet.trim())
            .map_err(|e| ServerError::ValidationError(format!("merchantWallet is invalid. {e}")))?;
        let currency = req.currency.filter(|s| !s.trim().is_empty());
        let currency = currency.as_deref().unwrap_or(DEFAULT_INVOICE_CURRENCY);
        let mut invoice = NewInvoice::new(merchant_wallet, &product_name, total_amount, currency);
        if let Some(email) = req.customer_email.as_deref().filter(|s| !s.trim().is_empty()) {
            invoice = invoice.with_customer_email(email.trim());
        }
        if let Some(description) = req.description.as_deref().filter(|s| !s.trim().is_empty()) {
            invoice = invoice.with_description(description);
        }
        if let Some(minutes) = req.expires_in_minutes {
            invoice = invoice.expires_in(Duration::minutes(minutes));
        }
        Ok(invoice)
    }
}

/// A freshly created invoice, with the link that the customer opens to pay it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResponse {
    #[serde(flatten)]
    pub order: Order,
    pub payment_link: String,
}

impl From<Order> for InvoiceResponse {
    fn from(order: Order) -> Self {
        let payment_link = payment_link(&order);
        Self { order, payment_link }
    }
}

pub fn payment_link(order: &Order) -> String {
    format!("/pay?orderId={}", order.id)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateResponse {
    pub success: bool,
    pub order: Order,
}
