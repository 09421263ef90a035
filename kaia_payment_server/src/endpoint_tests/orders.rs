use actix_web::http::StatusCode;
use chrono::{Duration, Utc};
use kaia_common::FiatAmount;
use kaia_payment_engine::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType, OrderType, WalletAddress},
    test_utils::{pending_order, prepare_env::test_database},
    traits::{MerchantManagement, PaymentGatewayDatabase, PaymentGatewayError},
    SqliteDatabase,
};
use serde_json::Value;

use super::{
    helpers::{configure_api, get_request, post_request, WALLET},
    mocks::MockLedger,
};

async fn ledger_with_order(id: &str, expires_in: Option<Duration>) -> SqliteDatabase {
    let db = test_database().await;
    let wallet = WalletAddress::parse(WALLET).unwrap();
    let (merchant, _) = db.fetch_or_create_merchant(&wallet).await.unwrap();
    let order = NewOrder::new(
        OrderId::from(id),
        OrderType::Direct,
        &merchant,
        "Hand drip coffee",
        FiatAmount::from_major_units(5500).unwrap(),
        "KRW",
    )
    .with_expiry(expires_in.map(|d| Utc::now() + d));
    db.insert_order(order).await.unwrap();
    db
}

fn status_update(id: &str, status: &str, extra: &str) -> String {
    format!(r#"{{"orderId": "{id}", "status": "{status}"{extra}}}"#)
}

#[actix_web::test]
async fn fetch_order() {
    let db = ledger_with_order("inv-1", None).await;
    let (status, body) = get_request("/api/orders/inv-1", configure_api(db.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let order: Order = serde_json::from_str(&body).unwrap();
    assert_eq!(order.id.as_str(), "inv-1");
    assert_eq!(order.status, OrderStatusType::Pending);
    assert_eq!(order.merchant_wallet.as_str(), WALLET.to_lowercase());

    let (status, body) = get_request("/api/orders/nope", configure_api(db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"The data was not found. Order nope"}"#);
}

#[actix_web::test]
async fn overdue_orders_expire_when_read() {
    let db = ledger_with_order("inv-late", Some(Duration::minutes(-1))).await;
    let (status, body) = get_request("/api/orders/inv-late", configure_api(db.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let order: Order = serde_json::from_str(&body).unwrap();
    assert_eq!(order.status, OrderStatusType::Expired);

    let paid = status_update("inv-late", "PAID", r#", "transferHash": "0xabc""#);
    let (status, _) = post_request("/api/orders/update-status", &paid, &[], configure_api(db)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn pay_then_refund() {
    let db = ledger_with_order("inv-2", None).await;
    let customer = "0x1111111111111111111111111111111111111111";
    let paid = status_update(
        "inv-2",
        "PAID",
        &format!(r#", "transferHash": "0xabc", "customerWallet": "{customer}", "blockNumber": 1200, "gasUsed": 52000"#),
    );
    let (status, body) = post_request("/api/orders/update-status", &paid, &[], configure_api(db.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["order"]["status"], "PAID");
    assert_eq!(json["order"]["transferHash"], "0xabc");
    assert_eq!(json["order"]["customerWallet"], customer);
    assert_eq!(json["order"]["blockNumber"], 1200);
    assert!(json["order"]["paidAt"].is_string());

    // A replayed report of the same transfer is harmless
    let (status, _) = post_request("/api/orders/update-status", &paid, &[], configure_api(db.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let no_hash = status_update("inv-2", "REFUNDED", "");
    let (status, body) = post_request("/api/orders/update-status", &no_hash, &[], configure_api(db.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"refundTransferHash is required for REFUNDED"}"#);

    let refund = status_update("inv-2", "REFUNDED", r#", "refundTransferHash": "0xdef""#);
    let (status, body) = post_request("/api/orders/update-status", &refund, &[], configure_api(db.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["order"]["status"], "REFUNDED");
    assert_eq!(json["order"]["refundTransferHash"], "0xdef");

    let cancel = status_update("inv-2", "CANCELLED", "");
    let (status, body) = post_request("/api/orders/update-status", &cancel, &[], configure_api(db)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, r#"{"error":"Order inv-2 cannot move from REFUNDED to CANCELLED"}"#);
}

#[actix_web::test]
async fn malformed_status_updates() {
    let db = ledger_with_order("inv-3", None).await;
    let bogus = status_update("inv-3", "SHIPPED", "");
    let (status, _) = post_request("/api/orders/update-status", &bogus, &[], configure_api(db.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let no_hash = status_update("inv-3", "PAID", "");
    let (status, _) = post_request("/api/orders/update-status", &no_hash, &[], configure_api(db.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let missing = status_update("nope", "CANCELLED", "");
    let (status, _) = post_request("/api/orders/update-status", &missing, &[], configure_api(db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn backend_failures_are_server_errors() {
    let mut ledger = MockLedger::new();
    ledger.expect_fetch_order().returning(|_| Err(PaymentGatewayError::DatabaseError("connection reset".into())));
    ledger.expect_clone().returning(|| {
        let mut clone = MockLedger::new();
        clone.expect_fetch_order().returning(|_| Err(PaymentGatewayError::DatabaseError("connection reset".into())));
        clone
    });
    let (status, body) = get_request("/api/orders/inv-1", configure_api(ledger)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, r#"{"error":"An error occurred on the backend of the server. Database error: connection reset"}"#);
}

#[actix_web::test]
async fn lost_races_are_conflicts() {
    let ledger_for = || {
        let mut ledger = MockLedger::new();
        ledger.expect_fetch_order().returning(|id| {
            let wallet = WalletAddress::parse(WALLET).unwrap();
            Ok(Some(pending_order(id.as_str(), &wallet, FiatAmount::from_major_units(10).unwrap())))
        });
        ledger.expect_mark_order_paid().returning(|p| Err(PaymentGatewayError::TransitionConflict(p.order_id.clone())));
        ledger
    };
    let mut ledger = ledger_for();
    ledger.expect_clone().returning(ledger_for);
    let paid = status_update("inv-9", "PAID", r#", "transferHash": "0xabc""#);
    let (status, body) = post_request("/api/orders/update-status", &paid, &[], configure_api(ledger)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("was modified by another request"));
}
