use std::{env, time::Duration as StdDuration};

use chrono::Duration;
use kaia_common::{parse_boolean_flag, Secret};
use log::*;
use shopify_tools::ShopifyConfig as ShopifyApiConfig;

use crate::errors::ServerError;

const DEFAULT_KPG_HOST: &str = "127.0.0.1";
const DEFAULT_KPG_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/kaia_store.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_EXPIRY_SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(60);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    /// The default lifetime of a direct invoice. Invoices never expire when this is `None` and the request doesn't
    /// ask for a lifetime.
    pub invoice_expiry: Option<Duration>,
    /// How often the background job expires overdue orders. `None` disables the job; expiry is then applied only
    /// when orders are read.
    pub expiry_sweep_interval: Option<StdDuration>,
    pub shopify_config: ShopifyConfig,
    pub woocommerce_config: WooCommerceConfig,
}

#[derive(Clone, Debug, Default)]
pub struct ShopifyConfig {
    /// Fallback storefront domain, e.g. "my-shop.myshopify.com", for orders that did not record their own.
    pub shop: String,
    pub api_version: String,
    pub admin_access_token: Secret<String>,
    pub hmac_secret: Secret<String>,
    pub hmac_checks: bool,
}

#[derive(Clone, Debug, Default)]
pub struct WooCommerceConfig {
    /// The plugin endpoint that is told about confirmed payments. Nothing is sent upstream when this is not set.
    pub confirm_url: Option<String>,
    pub hmac_secret: Secret<String>,
    pub hmac_checks: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_KPG_HOST.to_string(),
            port: DEFAULT_KPG_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            invoice_expiry: None,
            expiry_sweep_interval: Some(DEFAULT_EXPIRY_SWEEP_INTERVAL),
            shopify_config: ShopifyConfig::default(),
            woocommerce_config: WooCommerceConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("KPG_HOST").ok().unwrap_or_else(|| DEFAULT_KPG_HOST.into());
        let port = env::var("KPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for KPG_PORT. {e} Using the default, {DEFAULT_KPG_PORT}, instead."
                    );
                    DEFAULT_KPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_KPG_PORT);
        let database_url = env::var("KPG_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ KPG_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let max_connections = env::var("KPG_DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| {
                s.parse::<u32>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for KPG_DATABASE_MAX_CONNECTIONS. {e}"))
                    .ok()
            })
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        let invoice_expiry = configure_invoice_expiry();
        let expiry_sweep_interval = configure_sweep_interval();
        let shopify_config = ShopifyConfig::from_env_or_defaults();
        let woocommerce_config = WooCommerceConfig::from_env_or_defaults();
        Self {
            host,
            port,
            database_url,
            max_connections,
            invoice_expiry,
            expiry_sweep_interval,
            shopify_config,
            woocommerce_config,
        }
    }

    /// Webhook signatures are worthless with an empty key, so a scope that checks them must have a secret.
    pub fn check_webhook_secrets(&self) -> Result<(), ServerError> {
        let scopes = [
            ("KPG_SHOPIFY_HMAC_SECRET", &self.shopify_config.hmac_secret, self.shopify_config.hmac_checks),
            ("KPG_WOOCOMMERCE_HMAC_SECRET", &self.woocommerce_config.hmac_secret, self.woocommerce_config.hmac_checks),
        ];
        match scopes.iter().find(|(_, secret, checks)| *checks && secret.reveal().trim().is_empty()) {
            Some((var, _, _)) => Err(ServerError::ConfigurationError(format!(
                "{var} is empty, but webhook signature checks are enabled. Set the secret, or disable the checks."
            ))),
            None => Ok(()),
        }
    }
}

impl ShopifyConfig {
    pub fn from_env_or_defaults() -> Self {
        let api_config = ShopifyApiConfig::new_from_env_or_default();
        let hmac_secret = env::var("KPG_SHOPIFY_HMAC_SECRET").ok().unwrap_or_else(|| {
            error!("🪛️ KPG_SHOPIFY_HMAC_SECRET is not set. Please set it to the webhook signing key of your Shopify app.");
            String::default()
        });
        let hmac_checks = parse_boolean_flag(env::var("KPG_SHOPIFY_HMAC_CHECKS").ok(), true);
        if !hmac_checks {
            warn!("🚨️ Shopify webhook signatures are NOT being checked. Do not run a production server like this.");
        }
        Self {
            shop: api_config.shop,
            api_version: api_config.api_version,
            admin_access_token: api_config.admin_access_token,
            hmac_secret: Secret::new(hmac_secret),
            hmac_checks,
        }
    }

    pub fn shopify_api_config(&self) -> ShopifyApiConfig {
        ShopifyApiConfig {
            shop: self.shop.clone(),
            api_version: self.api_version.clone(),
            admin_access_token: self.admin_access_token.clone(),
        }
    }
}

impl WooCommerceConfig {
    pub fn from_env_or_defaults() -> Self {
        let confirm_url = env::var("KPG_WOOCOMMERCE_CONFIRM_URL").ok().filter(|s| !s.trim().is_empty());
        if confirm_url.is_none() {
            info!("🪛️ KPG_WOOCOMMERCE_CONFIRM_URL is not set. WooCommerce stores will not be told about payments.");
        }
        let hmac_secret = env::var("KPG_WOOCOMMERCE_HMAC_SECRET").ok().unwrap_or_else(|| {
            error!("🪛️ KPG_WOOCOMMERCE_HMAC_SECRET is not set. Please set it to the secret of your WooCommerce webhook.");
            String::default()
        });
        let hmac_checks = parse_boolean_flag(env::var("KPG_WOOCOMMERCE_HMAC_CHECKS").ok(), true);
        if !hmac_checks {
            warn!("🚨️ WooCommerce webhook signatures are NOT being checked. Do not run a production server like this.");
        }
        Self { confirm_url, hmac_secret: Secret::new(hmac_secret), hmac_checks }
    }
}

fn configure_invoice_expiry() -> Option<Duration> {
    let value = env::var("KPG_INVOICE_EXPIRY").ok()?;
    match value.trim().parse::<i64>() {
        Ok(minutes) if minutes > 0 => {
            info!("🪛️ Direct invoices expire after {minutes} minutes by default");
            Some(Duration::minutes(minutes))
        },
        Ok(_) => {
            info!("🪛️ KPG_INVOICE_EXPIRY is not positive. Direct invoices do not expire by default.");
            None
        },
        Err(e) => {
            warn!("🪛️ Invalid configuration value for KPG_INVOICE_EXPIRY. {e}. Direct invoices do not expire by default.");
            None
        },
    }
}

fn configure_sweep_interval() -> Option<StdDuration> {
    let seconds = env::var("KPG_EXPIRY_SWEEP_INTERVAL")
        .map_err(|_| {
            info!(
                "🪛️ KPG_EXPIRY_SWEEP_INTERVAL is not set. Using the default value of {} s.",
                DEFAULT_EXPIRY_SWEEP_INTERVAL.as_secs()
            )
        })
        .and_then(|s| {
            s.trim()
                .parse::<u64>()
                .map_err(|e| warn!("🪛️ Invalid configuration value for KPG_EXPIRY_SWEEP_INTERVAL. {e}"))
        })
        .ok()
        .unwrap_or(DEFAULT_EXPIRY_SWEEP_INTERVAL.as_secs());
    if seconds == 0 {
        info!("🪛️ The background expiry sweep is disabled. Orders will expire when they are read.");
        None
    } else {
        Some(StdDuration::from_secs(seconds))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8360);
        assert_eq!(config.max_connections, 25);
        assert!(config.invoice_expiry.is_none());
        assert_eq!(config.expiry_sweep_interval, Some(StdDuration::from_secs(60)));
        assert!(config.woocommerce_config.confirm_url.is_none());
    }

    #[test]
    fn secrets_are_not_printed() {
        let mut config = ServerConfig::new("0.0.0.0", 8080);
        config.shopify_config.hmac_secret = Secret::new("shpss_0123456789".to_string());
        config.woocommerce_config.hmac_secret = Secret::new("wc_secret".to_string());
        let printed = format!("{config:?}");
        assert!(!printed.contains("shpss_0123456789"));
        assert!(!printed.contains("wc_secret"));
        assert!(printed.contains("8080"));
    }

    #[test]
    fn checked_webhooks_need_a_secret() {
        let mut config = ServerConfig::default();
        assert!(config.check_webhook_secrets().is_ok());
        config.shopify_config.hmac_checks = true;
        let err = config.check_webhook_secrets().unwrap_err();
        assert!(matches!(err, ServerError::ConfigurationError(ref m) if m.starts_with("KPG_SHOPIFY_HMAC_SECRET")));
        config.shopify_config.hmac_secret = Secret::new("shpss_0123456789".to_string());
        assert!(config.check_webhook_secrets().is_ok());
        config.woocommerce_config.hmac_checks = true;
        config.woocommerce_config.hmac_secret = Secret::new("  ".to_string());
        let err = config.check_webhook_secrets().unwrap_err();
        assert!(matches!(err, ServerError::ConfigurationError(ref m) if m.starts_with("KPG_WOOCOMMERCE_HMAC_SECRET")));
    }
}
