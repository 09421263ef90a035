use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use kaia_payment_engine::{events::EventProducers, MerchantApi, OrderFlowApi, SqliteDatabase};
use log::*;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    integrations::{
        shopify::create_shopify_event_handlers,
        woocommerce::{create_woocommerce_event_handlers, WooCommerceNotifier},
    },
    middleware::HmacMiddlewareFactory,
    routes::{
        health,
        CreateInvoiceRoute,
        MerchantAuthRoute,
        MerchantInvoicesRoute,
        MerchantProfileRoute,
        OrderByIdRoute,
        RotateApiKeyRoute,
        UpdateOrderStatusRoute,
    },
    webhook_routes::{ShopifyWebhookRoute, WoocommerceWebhookRoute, SHOPIFY_HMAC_HEADER, WOOCOMMERCE_HMAC_HEADER},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    config.check_webhook_secrets()?;
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Could not migrate the database. {e}")))?;
    let producers = start_upstream_handlers(&config).await?;
    if let Some(interval) = config.expiry_sweep_interval {
        let _handle = start_expiry_worker(db.clone(), producers.clone(), interval);
    }
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Starts the handlers that report paid orders back to the storefronts, and returns the producers that feed them.
pub async fn start_upstream_handlers(config: &ServerConfig) -> Result<EventProducers, ServerError> {
    let shopify_handlers = create_shopify_event_handlers(config.shopify_config.shopify_api_config())
        .map_err(|e| ServerError::InitializeError(format!("Could not create the Shopify API client. {e}")))?;
    let mut producers = shopify_handlers.producers();
    shopify_handlers.start_handlers().await;
    if let Some(url) = &config.woocommerce_config.confirm_url {
        let notifier = WooCommerceNotifier::new(url)
            .map_err(|e| ServerError::InitializeError(format!("Could not create the WooCommerce notifier. {e}")))?;
        let woo_handlers = create_woocommerce_event_handlers(notifier);
        producers = producers.merge(woo_handlers.producers());
        woo_handlers.start_handlers().await;
        info!("🚀️ WooCommerce payment confirmations will be sent to {url}");
    }
    Ok(producers)
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let merchant_api = MerchantApi::new(db.clone()).with_invoice_expiry(config.invoice_expiry);
        let shopify = &config.shopify_config;
        let woocommerce = &config.woocommerce_config;
        let shopify_scope = web::scope("/webhooks/shopify")
            .wrap(HmacMiddlewareFactory::new(SHOPIFY_HMAC_HEADER, shopify.hmac_secret.clone(), shopify.hmac_checks))
            .service(ShopifyWebhookRoute::<SqliteDatabase>::new());
        let woocommerce_scope = web::scope("/webhooks/woocommerce")
            .wrap(HmacMiddlewareFactory::new(
                WOOCOMMERCE_HMAC_HEADER,
                woocommerce.hmac_secret.clone(),
                woocommerce.hmac_checks,
            ))
            .service(WoocommerceWebhookRoute::<SqliteDatabase>::new());
        let api_scope = web::scope("/api")
            .service(MerchantAuthRoute::<SqliteDatabase>::new())
            .service(MerchantProfileRoute::<SqliteDatabase>::new())
            .service(RotateApiKeyRoute::<SqliteDatabase>::new())
            .service(MerchantInvoicesRoute::<SqliteDatabase>::new())
            .service(CreateInvoiceRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("kpg::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(merchant_api))
            .service(health)
            .service(api_scope)
            .service(shopify_scope)
            .service(woocommerce_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
