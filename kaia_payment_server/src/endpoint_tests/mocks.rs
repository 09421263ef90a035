use chrono::{DateTime, Utc};
use kaia_payment_engine::{
    db_types::{Merchant, NewOrder, Order, OrderId, OrderStatusType, WalletAddress},
    order_objects::{PaymentConfirmation, RefundConfirmation},
    traits::{MerchantManagement, OrderManagement, PaymentGatewayDatabase, PaymentGatewayError},
};
use mockall::mock;

mock! {
    pub Ledger {}
    impl Clone for Ledger {
        fn clone(&self) -> Self;
    }
    impl OrderManagement for Ledger {
        async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, PaymentGatewayError>;
        async fn fetch_orders_for_merchant(&self, wallet: &WalletAddress) -> Result<Vec<Order>, PaymentGatewayError>;
    }
    impl MerchantManagement for Ledger {
        async fn fetch_or_create_merchant(&self, wallet: &WalletAddress) -> Result<(Merchant, bool), PaymentGatewayError>;
        async fn fetch_merchant_by_wallet(&self, wallet: &WalletAddress) -> Result<Option<Merchant>, PaymentGatewayError>;
        async fn fetch_merchant_by_api_key(&self, api_key: &str) -> Result<Option<Merchant>, PaymentGatewayError>;
        async fn update_merchant_profile(&self, wallet: &WalletAddress, name: Option<String>, email: Option<String>) -> Result<Merchant, PaymentGatewayError>;
        async fn rotate_api_key(&self, wallet: &WalletAddress) -> Result<Merchant, PaymentGatewayError>;
    }
    impl PaymentGatewayDatabase for Ledger {
        fn url(&self) -> &str;
        async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), PaymentGatewayError>;
        async fn mark_order_paid(&self, payment: &PaymentConfirmation) -> Result<Order, PaymentGatewayError>;
        async fn mark_order_refunded(&self, refund: &RefundConfirmation) -> Result<Order, PaymentGatewayError>;
        async fn annul_order(&self, order_id: &OrderId, status: OrderStatusType) -> Result<Order, PaymentGatewayError>;
        async fn expire_orders(&self, now: DateTime<Utc>) -> Result<Vec<Order>, PaymentGatewayError>;
    }
}
