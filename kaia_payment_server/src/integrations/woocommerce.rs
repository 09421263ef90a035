use std::{sync::Arc, time::Duration};

use kaia_common::FiatAmount;
use kaia_payment_engine::{
    db_types::{Merchant, NewOrder, Order, OrderId, OrderType},
    events::{EventHandlers, EventHooks},
};
use log::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{errors::WebhookConversionError, integrations::no_op};

pub const WOOCOMMERCE_EVENT_BUFFER_SIZE: usize = 25;
pub const WOOCOMMERCE_PAYMENT_METHOD: &str = "woocommerce";
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(30);

/// The order payload the WooCommerce plugin posts when a customer chooses to pay with stablecoin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WooCommerceOrder {
    /// The store's own (numeric) order number. Some plugin versions send it as a string.
    #[serde(default)]
    pub order_id: Option<Value>,
    /// Unique per order, e.g. `wc_order_a1b2c3`. This becomes the ledger order id.
    pub order_key: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub store_name: Option<String>,
    pub total: FiatAmount,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
}

impl WooCommerceOrder {
    /// The store order number as text, whichever way it was sent.
    pub fn order_number(&self) -> Option<String> {
        match &self.order_id {
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        }
    }
}

/// Turns a WooCommerce plugin payload into a `PENDING` ledger order for `merchant`.
pub fn new_order_from_woocommerce_order(
    value: WooCommerceOrder,
    merchant: &Merchant,
) -> Result<NewOrder, WebhookConversionError> {
    trace!("🛒️ Converting WooCommerceOrder to NewOrder: {value:?}");
    let order_key = value.order_key.trim();
    if order_key.is_empty() {
        return Err(WebhookConversionError::MissingField("order_key"));
    }
    if !value.total.is_positive() {
        return Err(WebhookConversionError::FormatError(format!("total must be positive, got {}", value.total)));
    }
    let currency = value.currency_code.as_deref().map(str::trim).unwrap_or_default();
    if currency.is_empty() {
        return Err(WebhookConversionError::MissingField("currency_code"));
    }
    let order_number = value.order_number();
    let product_name = value
        .product_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .unwrap_or_else(|| format!("WooCommerce order {}", order_number.as_deref().unwrap_or(order_key)));
    let mut order =
        NewOrder::new(OrderId::new(order_key), OrderType::WooCommerce, merchant, &product_name, value.total, currency)
            .with_order_confirmation(order_number)
            .with_customer_email(value.email.clone().filter(|s| !s.trim().is_empty()))
            .with_payment_method(WOOCOMMERCE_PAYMENT_METHOD);
    if let Some(store_name) = value.store_name.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        order = order.with_merchant_name(store_name);
    }
    Ok(order)
}

/// What the plugin's confirmation endpoint expects once a payment has been confirmed on chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WooPaymentNotification {
    pub order_key: String,
    pub transaction_id: String,
}

/// Builds the confirmation for a paid WooCommerce order. Other orders, and orders that were not paid by a transfer,
/// are not reported.
pub fn woo_payment_notification(order: &Order) -> Option<WooPaymentNotification> {
    if order.order_type != OrderType::WooCommerce {
        return None;
    }
    let transaction_id = order.transfer_hash.clone()?;
    Some(WooPaymentNotification { order_key: order.id.to_string(), transaction_id })
}

#[derive(Debug, Clone, Error)]
pub enum WooCommerceError {
    #[error("Could not create the HTTP client. {0}")]
    Initialization(String),
    #[error("The confirmation request failed. {0}")]
    RequestError(String),
    #[error("The store rejected the confirmation with status {status}. {message}")]
    Rejected { status: u16, message: String },
}

/// Tells the WooCommerce plugin that an order has been paid.
#[derive(Clone)]
pub struct WooCommerceNotifier {
    confirm_url: String,
    client: Arc<Client>,
}

impl WooCommerceNotifier {
    pub fn new(confirm_url: &str) -> Result<Self, WooCommerceError> {
        let client =
            Client::builder().timeout(NOTIFY_TIMEOUT).build().map_err(|e| WooCommerceError::Initialization(e.to_string()))?;
        Ok(Self { confirm_url: confirm_url.to_string(), client: Arc::new(client) })
    }

    pub fn confirm_url(&self) -> &str {
        &self.confirm_url
    }

    pub async fn notify_payment(&self, notification: &WooPaymentNotification) -> Result<(), WooCommerceError> {
        debug!("🛒️ Sending payment confirmation for [{}] to {}", notification.order_key, self.confirm_url);
        let response = self
            .client
            .post(&self.confirm_url)
            .json(notification)
            .send()
            .await
            .map_err(|e| WooCommerceError::RequestError(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(WooCommerceError::Rejected { status: status.as_u16(), message })
        }
    }
}

/// Once a WooCommerce order is marked as paid in the ledger, the plugin is told about it. This is best-effort.
/// Failures are logged and do not affect the ledger.
pub fn create_woocommerce_event_handlers(notifier: WooCommerceNotifier) -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_order_paid(move |ev| {
        let Some(notification) = woo_payment_notification(&ev.order) else {
            return no_op();
        };
        let notifier = notifier.clone();
        Box::pin(async move {
            match notifier.notify_payment(&notification).await {
                Ok(()) => info!(
                    "🛒️ WooCommerce store confirmed payment of [{}] with tx {}",
                    notification.order_key, notification.transaction_id
                ),
                Err(e) => warn!("🛒️ Could not confirm payment of [{}] with the store. {e}", notification.order_key),
            }
        })
    });
    EventHandlers::new(WOOCOMMERCE_EVENT_BUFFER_SIZE, hooks)
}
