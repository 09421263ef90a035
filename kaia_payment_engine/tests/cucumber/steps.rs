use cucumber::{then, when};
use kaia_common::FiatAmount;
use kaia_payment_engine::{
    db_types::{NewOrder, OrderId, OrderStatusType, OrderType, WalletAddress},
    order_objects::{OrderStatusUpdate, PaymentConfirmation, RefundConfirmation},
};

use crate::cucumber::LedgerWorld;

#[when(expr = "I receive a {word} order with id {word} from merchant {word} for {int} {word}")]
async fn receive_order(
    world: &mut LedgerWorld,
    order_type: String,
    order_id: OrderId,
    wallet: String,
    amount: i64,
    currency: String,
) {
    let merchant = world.merchant(&wallet).await;
    let order_type = order_type.parse::<OrderType>().expect("Unknown order type");
    let amount = FiatAmount::from_major_units(amount).expect("Invalid amount");
    let order = NewOrder::new(order_id, order_type, &merchant, "Test product", amount, &currency);
    let _res = world.api().ingest_order(order).await.expect("Error processing order");
}

#[when(expr = "order {word} is paid by transfer [{word}] from {word}")]
async fn order_paid(world: &mut LedgerWorld, order_id: OrderId, transfer: String, customer: String) {
    let customer = WalletAddress::parse(&customer).expect("Not a valid wallet address");
    let payment = PaymentConfirmation::new(order_id, &transfer.as_str().into()).with_customer_wallet(customer);
    let result = world.api().mark_order_paid(payment).await;
    world.last_error = result.err().map(|e| e.to_string());
}

#[when(expr = "order {word} is refunded by transfer [{word}]")]
async fn order_refunded(world: &mut LedgerWorld, order_id: OrderId, transfer: String) {
    let refund = RefundConfirmation::new(order_id, &transfer.as_str().into());
    let result = world.api().mark_order_refunded(refund).await;
    world.last_error = result.err().map(|e| e.to_string());
}

#[when(expr = "order {word} is updated to status {word}")]
async fn update_status(world: &mut LedgerWorld, order_id: OrderId, status: String) {
    let status = status.parse::<OrderStatusType>().expect("Unknown status");
    let result = world.api().update_order_status(OrderStatusUpdate::new(order_id, status)).await;
    world.last_error = result.err().map(|e| e.to_string());
}

#[then("the last update succeeded")]
async fn update_succeeded(world: &mut LedgerWorld) {
    assert!(world.last_error.is_none(), "Unexpected error: {:?}", world.last_error);
}

#[then(expr = "the last update was rejected with {string}")]
async fn update_rejected(world: &mut LedgerWorld, fragment: String) {
    let err = world.last_error.as_deref().expect("The last update should have failed");
    assert!(err.contains(&fragment), "Error '{err}' does not mention '{fragment}'");
}

#[then(expr = "the order with id {word} has {word} of '{word}'")]
async fn order_field(world: &mut LedgerWorld, order_id: OrderId, field: String, value: String) {
    let order = world
        .api()
        .fetch_order(&order_id)
        .await
        .expect("Error fetching order")
        .unwrap_or_else(|| panic!("Order {order_id} does not exist"));
    let optional = |v: Option<String>| v.unwrap_or_else(|| "none".into());
    match field.as_str() {
        "status" => assert_eq!(order.status.to_string(), value, "Status is incorrect"),
        "order_type" => assert_eq!(order.order_type.to_string(), value, "Order type is incorrect"),
        "currency" => assert_eq!(order.currency, value, "Currency is incorrect"),
        "total_amount" => assert_eq!(order.total_amount.to_string(), value, "Total amount is incorrect"),
        "transfer_hash" => assert_eq!(optional(order.transfer_hash), value, "Transfer hash is incorrect"),
        "refund_transfer_hash" => {
            assert_eq!(optional(order.refund_transfer_hash), value, "Refund hash is incorrect")
        },
        "customer_wallet" => {
            assert_eq!(optional(order.customer_wallet.map(String::from)), value, "Customer wallet is incorrect")
        },
        _ => panic!("Unknown field {field}"),
    }
}

#[then(expr = "merchant {word} has {int} order(s)")]
async fn merchant_order_count(world: &mut LedgerWorld, wallet: String, count: usize) {
    let wallet = WalletAddress::parse(&wallet).expect("Not a valid wallet address");
    let orders = world.api().orders_for_merchant(&wallet).await.expect("Error fetching orders");
    assert_eq!(orders.len(), count, "Order count is incorrect");
}
