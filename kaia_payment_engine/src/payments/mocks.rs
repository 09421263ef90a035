use mockall::mock;

use crate::{
    db_types::{Order, OrderId},
    order_objects::{PaymentConfirmation, RefundConfirmation},
    traits::{ReconciliationError, ReconciliationNotifier},
};

mock! {
    pub Notifier {}
    impl ReconciliationNotifier for Notifier {
        async fn fetch_order(&self, order_id: &OrderId) -> Result<Order, ReconciliationError>;
        async fn order_paid(&self, payment: PaymentConfirmation) -> Result<Order, ReconciliationError>;
        async fn order_refunded(&self, refund: RefundConfirmation) -> Result<Order, ReconciliationError>;
    }
}
