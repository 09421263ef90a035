use actix_web::http::StatusCode;
use kaia_payment_engine::{
    db_types::{Merchant, Order, OrderStatusType, OrderType},
    test_utils::prepare_env::test_database,
};
use serde_json::Value;

use super::helpers::{configure_api, get_request, post_request, WALLET};
use crate::data_objects::{InvoiceResponse, MerchantAuthResponse};

fn auth_body(wallet: &str) -> String {
    format!(r#"{{"walletAddress": "{wallet}"}}"#)
}

#[actix_web::test]
async fn health_check() {
    let db = test_database().await;
    let (status, body) = get_request("/health", configure_api(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn merchant_sign_in() {
    let db = test_database().await;
    let (status, body) = post_request("/api/merchants/auth", &auth_body(WALLET), &[], configure_api(db.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let first: MerchantAuthResponse = serde_json::from_str(&body).unwrap();
    assert!(first.is_new);
    assert_eq!(first.merchant.wallet_address.as_str(), WALLET.to_lowercase());
    assert_eq!(first.merchant.name, "Merchant 0x742d...beb7");
    assert_eq!(first.merchant.api_key.len(), 24);

    let (status, body) =
        post_request("/api/merchants/auth", &auth_body(&WALLET.to_lowercase()), &[], configure_api(db)).await;
    assert_eq!(status, StatusCode::OK);
    let second: MerchantAuthResponse = serde_json::from_str(&body).unwrap();
    assert!(!second.is_new);
    assert_eq!(second.merchant.api_key, first.merchant.api_key);
}

#[actix_web::test]
async fn merchant_sign_in_needs_a_wallet() {
    let db = test_database().await;
    let (status, body) = post_request("/api/merchants/auth", "{}", &[], configure_api(db.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"walletAddress is required"}"#);
    let (status, _) = post_request("/api/merchants/auth", &auth_body("0x1234"), &[], configure_api(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn create_and_list_invoices() {
    let db = test_database().await;
    post_request("/api/merchants/auth", &auth_body(WALLET), &[], configure_api(db.clone())).await;
    let invoice = format!(
        r#"{{"productName": "Hand drip coffee", "totalAmount": 5500, "merchantWallet": "{WALLET}",
            "customerEmail": "bob@mail.example.com"}}"#
    );
    let (status, body) = post_request("/api/merchants/invoices", &invoice, &[], configure_api(db.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let created: InvoiceResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(created.payment_link, format!("/pay?orderId={}", created.order.id));
    assert_eq!(created.order.order_type, OrderType::Direct);
    assert_eq!(created.order.status, OrderStatusType::Pending);
    assert_eq!(created.order.currency, "KRW");
    assert_eq!(created.order.total_amount.to_string(), "5500.00");
    assert_eq!(created.order.merchant_name, "Merchant 0x742d...beb7");
    assert!(created.order.expires_at.is_none());
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["type"], "DIRECT");
    assert_eq!(json["productName"], "Hand drip coffee");

    let second = format!(
        r#"{{"productName": "Cold brew", "totalAmount": "4.50", "currency": "usd", "merchantWallet": "{WALLET}",
            "expiresInMinutes": 15}}"#
    );
    let (status, body) = post_request("/api/merchants/invoices", &second, &[], configure_api(db.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let second: InvoiceResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(second.order.currency, "USD");
    assert!(second.order.expires_at.is_some());

    let path = format!("/api/merchants/invoices?wallet={}", WALLET.to_lowercase());
    let (status, body) = get_request(&path, configure_api(db)).await;
    assert_eq!(status, StatusCode::OK);
    let orders: Vec<Order> = serde_json::from_str(&body).unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].id, second.order.id);
    assert_eq!(orders[1].id, created.order.id);
}

#[actix_web::test]
async fn invalid_invoices() {
    let db = test_database().await;
    let no_product = format!(r#"{{"totalAmount": 100, "merchantWallet": "{WALLET}"}}"#);
    let (status, body) = post_request("/api/merchants/invoices", &no_product, &[], configure_api(db.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"productName is required"}"#);

    let no_wallet = r#"{"productName": "Tea", "totalAmount": 100}"#;
    let (status, _) = post_request("/api/merchants/invoices", no_wallet, &[], configure_api(db.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let free = format!(r#"{{"productName": "Tea", "totalAmount": 0, "merchantWallet": "{WALLET}"}}"#);
    let (status, _) = post_request("/api/merchants/invoices", &free, &[], configure_api(db.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Nobody has signed in with this wallet yet
    let unknown = format!(r#"{{"productName": "Tea", "totalAmount": 100, "merchantWallet": "{WALLET}"}}"#);
    let (status, _) = post_request("/api/merchants/invoices", &unknown, &[], configure_api(db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn api_key_management() {
    let db = test_database().await;
    let (_, body) = post_request("/api/merchants/auth", &auth_body(WALLET), &[], configure_api(db.clone())).await;
    let merchant = serde_json::from_str::<MerchantAuthResponse>(&body).unwrap().merchant;

    let (status, _) = post_request("/api/merchants/api-key", "{}", &[], configure_api(db.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let headers = [("X-Kaia-Api-Key", merchant.api_key.as_str())];
    let profile = r#"{"name": "Seoul Coffee", "email": "owner@seoul.example.com"}"#;
    let (status, body) = post_request("/api/merchants/profile", profile, &headers, configure_api(db.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let updated: Merchant = serde_json::from_str(&body).unwrap();
    assert_eq!(updated.name, "Seoul Coffee");
    assert_eq!(updated.email.as_deref(), Some("owner@seoul.example.com"));

    let (status, body) = post_request("/api/merchants/api-key", "{}", &headers, configure_api(db.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let rotated: Merchant = serde_json::from_str(&body).unwrap();
    assert_ne!(rotated.api_key, merchant.api_key);

    // The old key no longer works
    let (status, _) = post_request("/api/merchants/api-key", "{}", &headers, configure_api(db)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
