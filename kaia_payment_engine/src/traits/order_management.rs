use crate::{
    db_types::{Order, OrderId, WalletAddress},
    traits::PaymentGatewayError,
};

/// Read-only queries over the order ledger.
///
/// These calls return orders exactly as they are stored. In particular, an overdue `PENDING` order is returned as
/// `PENDING`; applying expiry on read is the responsibility of [`crate::OrderFlowApi`].
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Fetches the order with the given id. If no order exists, `None` is returned.
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, PaymentGatewayError>;

    /// Fetches all orders (of every type) that pay into the given merchant wallet, newest first.
    async fn fetch_orders_for_merchant(&self, wallet: &WalletAddress) -> Result<Vec<Order>, PaymentGatewayError>;
}
