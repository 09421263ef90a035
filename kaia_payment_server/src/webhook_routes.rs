//! Commerce-platform webhooks.
//!
//! Both platforms retry deliveries that do not get a 2xx response, so business-level failures (an order that cannot
//! be converted, a ledger hiccup) are answered with `200 OK` and a [`JsonResponse`] with `success: false`. Only a
//! request that cannot be attributed to a merchant is refused.
use actix_web::{web, HttpRequest, HttpResponse};
use kaia_payment_engine::{db_types::NewOrder, traits::PaymentGatewayDatabase, MerchantApi, OrderFlowApi};
use log::*;
use shopify_tools::ShopifyOrder;

use crate::{
    data_objects::JsonResponse,
    errors::{ServerError, WebhookConversionError},
    integrations::{
        shopify::new_order_from_shopify_order,
        woocommerce::{new_order_from_woocommerce_order, WooCommerceOrder},
    },
    route,
    routes::merchant_from_request,
};

pub const SHOPIFY_SHOP_DOMAIN_HEADER: &str = "X-Shopify-Shop-Domain";
pub const SHOPIFY_HMAC_HEADER: &str = "X-Shopify-Hmac-Sha256";
pub const WOOCOMMERCE_HMAC_HEADER: &str = "X-WC-Webhook-Signature";

route!(shopify_webhook => Post "" impl PaymentGatewayDatabase);
pub async fn shopify_webhook<B: PaymentGatewayDatabase>(
    req: HttpRequest,
    body: web::Json<ShopifyOrder>,
    orders: web::Data<OrderFlowApi<B>>,
    merchants: web::Data<MerchantApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("🛍️️ Received webhook request: {}", req.uri());
    let merchant = merchant_from_request(&req, merchants.as_ref()).await?;
    let shop_domain =
        req.headers().get(SHOPIFY_SHOP_DOMAIN_HEADER).and_then(|v| v.to_str().ok()).map(|s| s.to_string());
    let order = body.into_inner();
    let result = match new_order_from_shopify_order(order, &merchant, shop_domain) {
        Ok(new_order) => ingest(new_order, orders.as_ref()).await,
        Err(e) => conversion_failure(e),
    };
    Ok(HttpResponse::Ok().json(result))
}

route!(woocommerce_webhook => Post "" impl PaymentGatewayDatabase);
pub async fn woocommerce_webhook<B: PaymentGatewayDatabase>(
    req: HttpRequest,
    body: web::Json<WooCommerceOrder>,
    orders: web::Data<OrderFlowApi<B>>,
    merchants: web::Data<MerchantApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("🛒️ Received webhook request: {}", req.uri());
    let merchant = merchant_from_request(&req, merchants.as_ref()).await?;
    let order = body.into_inner();
    let result = match new_order_from_woocommerce_order(order, &merchant) {
        Ok(new_order) => ingest(new_order, orders.as_ref()).await,
        Err(e) => conversion_failure(e),
    };
    Ok(HttpResponse::Ok().json(result))
}

async fn ingest<B: PaymentGatewayDatabase>(new_order: NewOrder, api: &OrderFlowApi<B>) -> JsonResponse {
    let order_id = new_order.id.clone();
    let order_type = new_order.order_type;
    match api.ingest_order(new_order).await {
        Ok((order, true)) => {
            info!("📬️ {order_type} order [{order_id}] recorded as {}.", order.status);
            JsonResponse::success(format!("Order {order_id} recorded."))
        },
        Ok((_, false)) => {
            info!("📬️ {order_type} order [{order_id}] already exists.");
            JsonResponse::success("Order already exists.")
        },
        Err(e) => {
            warn!("📬️ Could not record {order_type} order [{order_id}]. {e}");
            JsonResponse::failure(format!("Could not record order {order_id}."))
        },
    }
}

fn conversion_failure(e: WebhookConversionError) -> JsonResponse {
    warn!("📬️ Could not convert incoming order. {e}");
    JsonResponse::failure(e)
}
