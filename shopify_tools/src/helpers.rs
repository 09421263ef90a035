use kaia_common::FiatAmount;

use crate::ShopifyApiError;

/// Shopify sends prices as decimal strings, e.g. `"398.00"`.
pub fn parse_shopify_price(price: &str) -> Result<FiatAmount, ShopifyApiError> {
    price.parse::<FiatAmount>().map_err(|e| ShopifyApiError::InvalidCurrencyAmount(format!("{price}. {e}")))
}

/// Builds the Admin API global id for an order, e.g. `gid://shopify/Order/450789469`.
pub fn order_gid(order_id: i64) -> String {
    format!("gid://shopify/Order/{order_id}")
}

/// The inverse of [`order_gid`].
pub fn order_id_from_gid(gid: &str) -> Result<i64, ShopifyApiError> {
    gid.strip_prefix("gid://shopify/Order/")
        .and_then(|id| id.parse::<i64>().ok())
        .ok_or_else(|| ShopifyApiError::InvalidGlobalId(gid.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn prices() {
        assert_eq!(parse_shopify_price("398.00").unwrap(), FiatAmount::from_minor_units(39_800));
        assert_eq!(parse_shopify_price("12.5").unwrap(), FiatAmount::from_minor_units(1_250));
        assert!(parse_shopify_price("1.999").is_err());
        assert!(parse_shopify_price("ten").is_err());
    }

    #[test]
    fn global_ids() {
        let gid = order_gid(450789469);
        assert_eq!(gid, "gid://shopify/Order/450789469");
        assert_eq!(order_id_from_gid(&gid).unwrap(), 450789469);
        assert!(order_id_from_gid("gid://shopify/Customer/1").is_err());
    }
}
