use chrono::{DateTime, Utc};
use kaia_payment_engine::{
    db_types::{Merchant, NewOrder, Order, OrderId, OrderType},
    events::{EventHandlers, EventHooks},
};
use log::*;
use shopify_tools::{
    helpers::{order_gid, parse_shopify_price},
    ShopifyApi,
    ShopifyApiError,
    ShopifyConfig as ShopifyApiConfig,
    ShopifyOrder,
};

use crate::{errors::WebhookConversionError, integrations::no_op};

pub const SHOPIFY_EVENT_BUFFER_SIZE: usize = 25;
pub const SHOPIFY_PAYMENT_METHOD: &str = "shopify";

/// Turns a Shopify order webhook payload into a ledger order for `merchant`.
///
/// Orders that Shopify already reports as paid are recorded as `PAID` at the time the order was created. They carry
/// no transfer hash, because the payment was settled on the storefront.
pub fn new_order_from_shopify_order(
    value: ShopifyOrder,
    merchant: &Merchant,
    shop_domain: Option<String>,
) -> Result<NewOrder, WebhookConversionError> {
    trace!("🛍️ Converting ShopifyOrder to NewOrder: {value:?}");
    if value.id <= 0 {
        return Err(WebhookConversionError::MissingField("id"));
    }
    let total_price =
        parse_shopify_price(&value.total_price).map_err(|e| WebhookConversionError::FormatError(e.to_string()))?;
    if !total_price.is_positive() {
        return Err(WebhookConversionError::FormatError(format!("total must be positive, got {total_price}")));
    }
    let created_at =
        value.created_at.parse::<DateTime<Utc>>().map_err(|e| WebhookConversionError::FormatError(e.to_string()))?;
    let currency = value.currency.trim();
    if currency.is_empty() {
        return Err(WebhookConversionError::MissingField("currency"));
    }
    let product_name = match value.product_summary() {
        s if s.is_empty() => value.name.clone(),
        s => s,
    };
    let shop_domain = shop_domain.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let confirmation = Some(value.name.clone()).filter(|s| !s.is_empty());
    let order = NewOrder::new(
        OrderId::new(value.id.to_string()),
        OrderType::Shopify,
        merchant,
        &product_name,
        total_price,
        currency,
    )
    .with_order_confirmation(confirmation)
    .with_customer_email(value.contact_email())
    .with_description(value.note.clone().filter(|s| !s.is_empty()))
    .with_payment_method(SHOPIFY_PAYMENT_METHOD)
    .with_shopify_details(Some(value.global_id()), shop_domain)
    .with_created_at(created_at);
    if value.is_paid() {
        Ok(order.settled_at(created_at))
    } else {
        Ok(order)
    }
}

/// Where a Shopify order lives on the storefront.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopifyOrderRef {
    /// The storefront domain the order came from. `None` means the configured shop.
    pub shop: Option<String>,
    pub gid: String,
}

/// Finds the storefront reference for a ledger order. Orders that did not come from Shopify have none.
pub fn shopify_order_ref(order: &Order) -> Option<ShopifyOrderRef> {
    if order.order_type != OrderType::Shopify {
        return None;
    }
    let gid = match &order.admin_graphql_api_id {
        Some(gid) if !gid.is_empty() => gid.clone(),
        _ => match order.id.as_str().parse::<i64>() {
            Ok(id) => order_gid(id),
            Err(e) => {
                warn!("🛍️ Shopify order [{}] has no admin id and its id is not numeric. {e}", order.id);
                return None;
            },
        },
    };
    Some(ShopifyOrderRef { shop: order.shop_domain.clone(), gid })
}

/// Assigns event handlers to the Shopify API.
///
/// Only the `OrderPaidEvent` is relevant: once a Shopify order is marked as paid in the ledger, the order is marked as
/// paid on the storefront too. This is best-effort. Failures are logged and do not affect the ledger.
pub fn create_shopify_event_handlers(config: ShopifyApiConfig) -> Result<EventHandlers, ShopifyApiError> {
    let mut hooks = EventHooks::default();
    let api = ShopifyApi::new(config)?;
    hooks.on_order_paid(move |ev| {
        let order = ev.order;
        let Some(order_ref) = shopify_order_ref(&order) else {
            return no_op();
        };
        let api = api.clone();
        Box::pin(async move {
            let ShopifyOrderRef { shop, gid } = order_ref;
            debug!(
                "🛍️ Marking order [{}] ({gid}) as paid on Shopify. {} {} settled by {}",
                order.id,
                order.total_amount,
                order.currency,
                order.transfer_hash.as_deref().unwrap_or("the storefront")
            );
            match api.mark_order_as_paid(shop.as_deref(), &gid).await {
                Ok(result) => info!(
                    "🛍️ Order [{}] marked as paid on Shopify as {}. Status: {}. Paid {} {} by transfer {}. Outstanding: {}",
                    order.id,
                    result.name,
                    result.display_financial_status.as_deref().unwrap_or("unknown"),
                    order.total_amount,
                    order.currency,
                    order.transfer_hash.as_deref().unwrap_or("none"),
                    result.outstanding().unwrap_or_else(|| "unknown".to_string())
                ),
                Err(e) => error!("🛍️ Error marking order [{}] ({gid}) as paid on Shopify. {e}", order.id),
            }
        })
    });
    Ok(EventHandlers::new(SHOPIFY_EVENT_BUFFER_SIZE, hooks))
}

#[cfg(test)]
mod test {
    use kaia_common::FiatAmount;
    use kaia_payment_engine::{
        db_types::{OrderStatusType, WalletAddress},
        test_utils::pending_order,
    };
    use shopify_tools::{Customer, OrderBuilder};

    use super::*;

    fn merchant() -> Merchant {
        let now = Utc::now();
        Merchant {
            id: 1,
            wallet_address: WalletAddress::parse("0x742d35cc6634c0532925a3b844bc9e7595f0beb7").unwrap(),
            name: "Coffee Lab".to_string(),
            email: None,
            api_key: "0123456789abcdef01234567".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn paid_shopify_orders_are_settled() {
        let order = OrderBuilder::new()
            .id(12345)
            .name("#1001")
            .financial_status("paid")
            .total_price("398.00")
            .currency("usd")
            .line_item("Aviator sunglasses", 1, "89.99")
            .line_item("Mid-century lounger", 1, "308.01")
            .email("bob.norman@mail.example.com")
            .build();
        let created_at = order.created_at.parse::<DateTime<Utc>>().unwrap();
        let new_order =
            new_order_from_shopify_order(order, &merchant(), Some("kaia-demo.myshopify.com".into())).unwrap();
        assert_eq!(new_order.id.as_str(), "12345");
        assert_eq!(new_order.order_type, OrderType::Shopify);
        assert_eq!(new_order.status, OrderStatusType::Paid);
        assert_eq!(new_order.paid_at, Some(created_at));
        assert_eq!(new_order.total_amount, FiatAmount::from_minor_units(39_800));
        assert_eq!(new_order.currency, "USD");
        assert_eq!(new_order.product_name, "Aviator sunglasses, Mid-century lounger");
        assert_eq!(new_order.order_confirmation.as_deref(), Some("#1001"));
        assert_eq!(new_order.customer_email.as_deref(), Some("bob.norman@mail.example.com"));
        assert_eq!(new_order.merchant_name, "Coffee Lab");
        assert_eq!(new_order.payment_method.as_deref(), Some("shopify"));
        assert_eq!(new_order.admin_graphql_api_id.as_deref(), Some("gid://shopify/Order/12345"));
        assert_eq!(new_order.shop_domain.as_deref(), Some("kaia-demo.myshopify.com"));
    }

    #[test]
    fn unpaid_shopify_orders_are_pending() {
        let customer = Customer { id: 7, email: Some("alice@mail.example.com".into()), ..Default::default() };
        let order = OrderBuilder::new()
            .id(777)
            .name("#1002")
            .financial_status("pending")
            .total_price("25.50")
            .line_item("Hoodie", 1, "25.50")
            .customer(customer)
            .build();
        let new_order = new_order_from_shopify_order(order, &merchant(), None).unwrap();
        assert_eq!(new_order.status, OrderStatusType::Pending);
        assert!(new_order.paid_at.is_none());
        assert_eq!(new_order.customer_email.as_deref(), Some("alice@mail.example.com"));
        assert!(new_order.shop_domain.is_none());
    }

    #[test]
    fn bad_shopify_payloads_are_rejected() {
        let order = OrderBuilder::new().id(1).total_price("ten dollars").build();
        assert!(matches!(
            new_order_from_shopify_order(order, &merchant(), None),
            Err(WebhookConversionError::FormatError(_))
        ));
        let mut order = OrderBuilder::new().id(1).total_price("10.00").build();
        order.created_at = "yesterday".into();
        assert!(matches!(
            new_order_from_shopify_order(order, &merchant(), None),
            Err(WebhookConversionError::FormatError(_))
        ));
    }

    #[test]
    fn shopify_orders_need_a_positive_total() {
        for total in ["0.00", "-5.00"] {
            let order = OrderBuilder::new().id(1).financial_status("paid").total_price(total).build();
            let err = new_order_from_shopify_order(order, &merchant(), None).unwrap_err();
            assert!(matches!(err, WebhookConversionError::FormatError(ref m) if m.contains("total must be positive")));
        }
    }

    #[test]
    fn only_shopify_orders_have_storefront_refs() {
        let wallet = merchant().wallet_address;
        let mut order = pending_order("5551234567890", &wallet, FiatAmount::from_minor_units(1000));
        assert!(shopify_order_ref(&order).is_none());
        order.order_type = OrderType::Shopify;
        let order_ref = shopify_order_ref(&order).unwrap();
        assert_eq!(order_ref, ShopifyOrderRef { shop: None, gid: "gid://shopify/Order/5551234567890".into() });
        order.admin_graphql_api_id = Some("gid://shopify/Order/42".into());
        order.shop_domain = Some("other.myshopify.com".into());
        let order_ref = shopify_order_ref(&order).unwrap();
        assert_eq!(order_ref.gid, "gid://shopify/Order/42");
        assert_eq!(order_ref.shop.as_deref(), Some("other.myshopify.com"));
    }
}
