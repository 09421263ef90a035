use actix_web::{http::StatusCode, web, web::ServiceConfig};
use kaia_common::{FiatAmount, Secret};
use kaia_payment_engine::{
    db_types::{OrderId, OrderStatusType, OrderType, WalletAddress},
    events::EventProducers,
    test_utils::prepare_env::test_database,
    traits::{MerchantManagement, OrderManagement},
    MerchantApi,
    OrderFlowApi,
    SqliteDatabase,
};
use serde_json::Value;
use shopify_tools::OrderBuilder;

use super::helpers::{post_request, WALLET};
use crate::{
    helpers::{calculate_hmac, API_KEY_HEADER},
    middleware::HmacMiddlewareFactory,
    webhook_routes::{
        ShopifyWebhookRoute,
        WoocommerceWebhookRoute,
        SHOPIFY_HMAC_HEADER,
        SHOPIFY_SHOP_DOMAIN_HEADER,
        WOOCOMMERCE_HMAC_HEADER,
    },
};

const SHOPIFY_SECRET: &str = "shopify-hush";
const WOO_SECRET: &str = "woo-hush";

fn configure_webhooks(db: SqliteDatabase) -> impl FnOnce(&mut ServiceConfig) {
    configure_webhooks_with_secret(db, SHOPIFY_SECRET)
}

fn configure_webhooks_with_secret(db: SqliteDatabase, shopify_secret: &'static str) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(OrderFlowApi::new(db.clone(), EventProducers::default())))
            .app_data(web::Data::new(MerchantApi::new(db)))
            .service(
                web::scope("/webhooks/shopify")
                    .wrap(HmacMiddlewareFactory::new(SHOPIFY_HMAC_HEADER, Secret::new(shopify_secret.into()), true))
                    .service(ShopifyWebhookRoute::<SqliteDatabase>::new()),
            )
            .service(
                web::scope("/webhooks/woocommerce")
                    .wrap(HmacMiddlewareFactory::new(WOOCOMMERCE_HMAC_HEADER, Secret::new(WOO_SECRET.into()), true))
                    .service(WoocommerceWebhookRoute::<SqliteDatabase>::new()),
            );
    }
}

async fn merchant_ledger() -> (SqliteDatabase, String) {
    let db = test_database().await;
    let wallet = WalletAddress::parse(WALLET).unwrap();
    let (merchant, _) = db.fetch_or_create_merchant(&wallet).await.unwrap();
    (db, merchant.api_key)
}

fn shopify_payload(id: i64, financial_status: &str) -> String {
    let order = OrderBuilder::new()
        .id(id)
        .name("#1001")
        .financial_status(financial_status)
        .total_price("398.00")
        .currency("USD")
        .line_item("Aviator sunglasses", 1, "398.00")
        .email("bob.norman@mail.example.com")
        .build();
    serde_json::to_string(&order).unwrap()
}

#[actix_web::test]
async fn shopify_orders_are_recorded_once() {
    let (db, api_key) = merchant_ledger().await;
    let body = shopify_payload(820982911946154508, "paid");
    let signature = calculate_hmac(SHOPIFY_SECRET, body.as_bytes());
    let headers = [
        (SHOPIFY_HMAC_HEADER, signature.as_str()),
        (SHOPIFY_SHOP_DOMAIN_HEADER, "kaia-demo.myshopify.com"),
        (API_KEY_HEADER, api_key.as_str()),
    ];
    let (status, body_text) =
        post_request("/webhooks/shopify", &body, &headers, configure_webhooks(db.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body_text, r#"{"success":true,"message":"Order 820982911946154508 recorded."}"#);

    let order = db.fetch_order(&OrderId::from("820982911946154508")).await.unwrap().unwrap();
    assert_eq!(order.order_type, OrderType::Shopify);
    assert_eq!(order.status, OrderStatusType::Paid);
    assert_eq!(order.total_amount, FiatAmount::from_minor_units(39_800));
    assert_eq!(order.shop_domain.as_deref(), Some("kaia-demo.myshopify.com"));
    assert!(order.transfer_hash.is_none());

    // Shopify redelivers until it sees a 2xx. Redeliveries leave the ledger alone.
    let (status, body_text) = post_request("/webhooks/shopify", &body, &headers, configure_webhooks(db.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body_text, r#"{"success":true,"message":"Order already exists."}"#);
    let orders = db.fetch_orders_for_merchant(&order.merchant_wallet).await.unwrap();
    assert_eq!(orders.len(), 1);
}

#[actix_web::test]
async fn webhooks_need_a_merchant_api_key() {
    let (db, _) = merchant_ledger().await;
    let body = shopify_payload(1001, "pending");
    let signature = calculate_hmac(SHOPIFY_SECRET, body.as_bytes());
    let headers = [(SHOPIFY_HMAC_HEADER, signature.as_str())];
    let (status, _) = post_request("/webhooks/shopify", &body, &headers, configure_webhooks(db.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let headers = [(SHOPIFY_HMAC_HEADER, signature.as_str()), (API_KEY_HEADER, "not-a-key")];
    let (status, _) = post_request("/webhooks/shopify", &body, &headers, configure_webhooks(db.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(db.fetch_order(&OrderId::from("1001")).await.unwrap().is_none());
}

#[actix_web::test]
async fn webhook_signatures_are_checked() {
    let (db, api_key) = merchant_ledger().await;
    let body = shopify_payload(1002, "pending");

    let headers = [(API_KEY_HEADER, api_key.as_str())];
    let (status, _) = post_request("/webhooks/shopify", &body, &headers, configure_webhooks(db.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = calculate_hmac("wrong secret", body.as_bytes());
    let headers = [(SHOPIFY_HMAC_HEADER, forged.as_str()), (API_KEY_HEADER, api_key.as_str())];
    let (status, _) = post_request("/webhooks/shopify", &body, &headers, configure_webhooks(db.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A Shopify signature does not open the WooCommerce endpoint
    let signature = calculate_hmac(SHOPIFY_SECRET, body.as_bytes());
    let headers = [(WOOCOMMERCE_HMAC_HEADER, signature.as_str()), (API_KEY_HEADER, api_key.as_str())];
    let (status, _) = post_request("/webhooks/woocommerce", &body, &headers, configure_webhooks(db.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(db.fetch_order(&OrderId::from("1002")).await.unwrap().is_none());
}

#[actix_web::test]
async fn webhooks_are_refused_without_a_signing_secret() {
    let (db, api_key) = merchant_ledger().await;
    let body = shopify_payload(1003, "paid");
    // Anyone can sign with an empty key
    let signature = calculate_hmac("", body.as_bytes());
    let headers = [(SHOPIFY_HMAC_HEADER, signature.as_str()), (API_KEY_HEADER, api_key.as_str())];
    let configure = configure_webhooks_with_secret(db.clone(), "");
    let (status, _) = post_request("/webhooks/shopify", &body, &headers, configure).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(db.fetch_order(&OrderId::from("1003")).await.unwrap().is_none());
}

#[actix_web::test]
async fn woocommerce_orders_are_pending() {
    let (db, api_key) = merchant_ledger().await;
    let body = r#"{
        "order_id": 1234,
        "order_key": "wc_order_a1b2c3",
        "email": "bob@mail.example.com",
        "store_name": "Seoul Coffee",
        "total": "45000",
        "currency_code": "KRW"
    }"#;
    let signature = calculate_hmac(WOO_SECRET, body.as_bytes());
    let headers = [(WOOCOMMERCE_HMAC_HEADER, signature.as_str()), (API_KEY_HEADER, api_key.as_str())];
    let (status, body_text) = post_request("/webhooks/woocommerce", body, &headers, configure_webhooks(db.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body_text).unwrap();
    assert_eq!(json["success"], true);

    let order = db.fetch_order(&OrderId::from("wc_order_a1b2c3")).await.unwrap().unwrap();
    assert_eq!(order.order_type, OrderType::WooCommerce);
    assert_eq!(order.status, OrderStatusType::Pending);
    assert_eq!(order.merchant_name, "Seoul Coffee");
    assert_eq!(order.product_name, "WooCommerce order 1234");
    assert_eq!(order.total_amount, FiatAmount::from_major_units(45_000).unwrap());
    assert_eq!(order.currency, "KRW");
}

#[actix_web::test]
async fn unusable_orders_are_acknowledged() {
    let (db, api_key) = merchant_ledger().await;
    let body = r#"{"order_id": 7, "order_key": "wc_order_zero", "total": "0", "currency_code": "KRW"}"#;
    let signature = calculate_hmac(WOO_SECRET, body.as_bytes());
    let headers = [(WOOCOMMERCE_HMAC_HEADER, signature.as_str()), (API_KEY_HEADER, api_key.as_str())];
    let (status, body_text) = post_request("/webhooks/woocommerce", body, &headers, configure_webhooks(db.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body_text).unwrap();
    assert_eq!(json["success"], false);
    assert!(json["message"].as_str().unwrap().contains("total must be positive"));
    assert!(db.fetch_order(&OrderId::from("wc_order_zero")).await.unwrap().is_none());
}
