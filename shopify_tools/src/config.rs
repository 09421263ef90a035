use kaia_common::Secret;
use log::*;

pub const DEFAULT_SHOPIFY_API_VERSION: &str = "2025-07";

#[derive(Debug, Clone, Default)]
pub struct ShopifyConfig {
    /// The storefront domain, e.g. `my-shop.myshopify.com`. Orders that carry their own shop domain override this.
    pub shop: String,
    pub admin_access_token: Secret<String>,
    pub api_version: String,
}

impl ShopifyConfig {
    pub fn new_from_env_or_default() -> Self {
        let shop = std::env::var("KPG_SHOPIFY_SHOP").unwrap_or_else(|_| {
            warn!("🪛️ KPG_SHOPIFY_SHOP not set. Only orders that carry their own shop domain can be reported back");
            String::default()
        });
        let api_version = std::env::var("KPG_SHOPIFY_API_VERSION").unwrap_or_else(|_| {
            info!("🪛️ KPG_SHOPIFY_API_VERSION not set, using {DEFAULT_SHOPIFY_API_VERSION} as default");
            DEFAULT_SHOPIFY_API_VERSION.to_string()
        });
        let admin_access_token = Secret::new(std::env::var("KPG_SHOPIFY_ADMIN_ACCESS_TOKEN").unwrap_or_else(|_| {
            warn!("🪛️ KPG_SHOPIFY_ADMIN_ACCESS_TOKEN not set. Shopify orders will not be marked as paid upstream");
            String::default()
        }));
        Self { shop, admin_access_token, api_version }
    }
}
