use std::{convert::Infallible, fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use kaia_common::FiatAmount;
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------     WalletAddress     ---------------------------------------------------------
/// A 20-byte account address in `0x`-prefixed hex form. Addresses are always held in lowercase, so that two spellings
/// of the same account (e.g. checksummed vs. plain) compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    pub fn parse(s: &str) -> Result<Self, ConversionError> {
        let addr = s.trim().to_ascii_lowercase();
        let valid = addr.len() == 42
            && addr.starts_with("0x")
            && addr.chars().skip(2).all(|c| c.is_ascii_hexdigit());
        if valid {
            Ok(Self(addr))
        } else {
            Err(ConversionError(format!("'{s}' is not a valid wallet address")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `0x1234...abcd`, used for generated display names
    pub fn short_form(&self) -> String {
        format!("{}...{}", &self.0[..6], &self.0[self.0.len() - 4..])
    }
}

impl FromStr for WalletAddress {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = ConversionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.0
    }
}

impl Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//--------------------------------------        OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//--------------------------------------       OrderType       ---------------------------------------------------------
/// Where an order came from. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    /// An invoice created by the merchant through the gateway
    Direct,
    /// Ingested from a Shopify order webhook
    Shopify,
    /// Ingested from the WooCommerce plugin webhook
    WooCommerce,
}

impl Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Direct => write!(f, "DIRECT"),
            OrderType::Shopify => write!(f, "SHOPIFY"),
            OrderType::WooCommerce => write!(f, "WOOCOMMERCE"),
        }
    }
}

impl FromStr for OrderType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DIRECT" => Ok(Self::Direct),
            "SHOPIFY" => Ok(Self::Shopify),
            "WOOCOMMERCE" => Ok(Self::WooCommerce),
            _ => Err(ConversionError(format!("Invalid order type: {s}"))),
        }
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatusType {
    /// The order is newly created, and no payment has been confirmed.
    Pending,
    /// A transfer for the order total has been confirmed on chain (or the platform reported the order as paid).
    Paid,
    /// The payment could not be completed.
    Failed,
    /// The order total has been returned to the customer.
    Refunded,
    /// The invoice passed its expiry time before it was paid.
    Expired,
    /// The order has been cancelled by the merchant or the platform.
    Cancelled,
}

impl OrderStatusType {
    /// Returns true if the order lifecycle permits moving from `self` to `next`.
    ///
    /// ```text
    /// PENDING ──► PAID ──► REFUNDED
    ///    ├──────► FAILED
    ///    ├──────► EXPIRED
    ///    └──────► CANCELLED
    /// ```
    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        use OrderStatusType::*;
        matches!((self, next), (Pending, Paid | Failed | Expired | Cancelled) | (Paid, Refunded))
    }

    /// No transition leaves a terminal status
    pub fn is_terminal(&self) -> bool {
        use OrderStatusType::*;
        matches!(self, Failed | Refunded | Expired | Cancelled)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "PENDING"),
            OrderStatusType::Paid => write!(f, "PAID"),
            OrderStatusType::Failed => write!(f, "FAILED"),
            OrderStatusType::Refunded => write!(f, "REFUNDED"),
            OrderStatusType::Expired => write!(f, "EXPIRED"),
            OrderStatusType::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            "FAILED" => Ok(Self::Failed),
            "REFUNDED" => Ok(Self::Refunded),
            "EXPIRED" => Ok(Self::Expired),
            "CANCELLED" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to PENDING");
            OrderStatusType::Pending
        })
    }
}

//--------------------------------------        Order       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub status: OrderStatusType,
    pub total_amount: FiatAmount,
    pub currency: String,
    /// Merchant name at the time the order was created
    pub merchant_name: String,
    /// The collector address for this order's payment
    pub merchant_wallet: WalletAddress,
    pub product_name: String,
    pub description: Option<String>,
    /// The platform's human-facing order reference, e.g. `#1001`
    pub order_confirmation: Option<String>,
    pub customer_email: Option<String>,
    pub customer_wallet: Option<WalletAddress>,
    pub transfer_hash: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub refund_transfer_hash: Option<String>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub payment_method: Option<String>,
    pub token_address: Option<String>,
    pub block_number: Option<i64>,
    pub gas_used: Option<i64>,
    pub admin_graphql_api_id: Option<String>,
    pub shop_domain: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// True if the order is still awaiting payment but its expiry time has passed.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == OrderStatusType::Pending && self.expires_at.map(|t| t < now).unwrap_or(false)
    }
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// Generated for direct invoices; the platform's order identifier for webhook orders
    pub id: OrderId,
    pub order_type: OrderType,
    /// Either `Pending`, or `Paid` for platform orders that were settled before we saw them
    pub status: OrderStatusType,
    pub total_amount: FiatAmount,
    pub currency: String,
    pub merchant_name: String,
    pub merchant_wallet: WalletAddress,
    pub product_name: String,
    pub description: Option<String>,
    pub order_confirmation: Option<String>,
    pub customer_email: Option<String>,
    pub payment_method: Option<String>,
    pub admin_graphql_api_id: Option<String>,
    pub shop_domain: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new(
        id: OrderId,
        order_type: OrderType,
        merchant: &Merchant,
        product_name: &str,
        total_amount: FiatAmount,
        currency: &str,
    ) -> Self {
        Self {
            id,
            order_type,
            status: OrderStatusType::Pending,
            total_amount,
            currency: currency.to_ascii_uppercase(),
            merchant_name: merchant.name.clone(),
            merchant_wallet: merchant.wallet_address.clone(),
            product_name: product_name.to_string(),
            description: None,
            order_confirmation: None,
            customer_email: None,
            payment_method: None,
            admin_graphql_api_id: None,
            shop_domain: None,
            expires_at: None,
            paid_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_customer_email(mut self, email: Option<String>) -> Self {
        self.customer_email = email;
        self
    }

    pub fn with_order_confirmation(mut self, confirmation: Option<String>) -> Self {
        self.order_confirmation = confirmation;
        self
    }

    pub fn with_payment_method(mut self, method: &str) -> Self {
        self.payment_method = Some(method.to_string());
        self
    }

    pub fn with_expiry(mut self, expires_at: Option<DateTime<Utc>>) -> Self {
        self.expires_at = expires_at;
        self
    }

    pub fn with_merchant_name(mut self, name: &str) -> Self {
        self.merchant_name = name.to_string();
        self
    }

    pub fn with_shopify_details(mut self, admin_graphql_api_id: Option<String>, shop_domain: Option<String>) -> Self {
        self.admin_graphql_api_id = admin_graphql_api_id;
        self.shop_domain = shop_domain;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Marks an incoming platform order as already settled on the platform side.
    pub fn settled_at(mut self, paid_at: DateTime<Utc>) -> Self {
        self.status = OrderStatusType::Paid;
        self.paid_at = Some(paid_at);
        self
    }
}

//--------------------------------------        Merchant       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Merchant {
    pub id: i64,
    pub wallet_address: WalletAddress,
    pub name: String,
    pub email: Option<String>,
    /// Authenticates the merchant's storefront plugins and webhooks
    pub api_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
