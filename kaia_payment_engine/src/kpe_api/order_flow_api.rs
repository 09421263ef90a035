use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType, WalletAddress},
    events::{EventProducers, OrderAnnulledEvent, OrderPaidEvent, OrderRefundedEvent},
    order_objects::{OrderStatusUpdate, PaymentConfirmation, RefundConfirmation},
    traits::{PaymentGatewayDatabase, PaymentGatewayError, ReconciliationError, ReconciliationNotifier},
};

/// `OrderFlowApi` is the order ledger. It is the primary API for handling orders and their status changes, whether
/// they come from merchants, commerce-platform webhooks, or confirmed on-chain payments.
///
/// Every status change goes through the backend's compare-and-set transitions. Events are published only after the
/// transition has been committed.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B: Clone> Clone for OrderFlowApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), producers: self.producers.clone() }
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}

impl<B> OrderFlowApi<B>
where B: PaymentGatewayDatabase
{
    /// Submit a new order to the ledger.
    ///
    /// Ingestion is idempotent on the order id: if the order already exists, the stored order is returned unchanged
    /// and the second element of the result is `false`.
    ///
    /// Orders that arrive already settled on the commerce platform are stored as `PAID`. No order-paid event is
    /// published for them, since the platform is the party that told us about the payment.
    pub async fn ingest_order(&self, order: NewOrder) -> Result<(Order, bool), PaymentGatewayError> {
        let order_id = order.id.clone();
        let (order, inserted) = self.db.insert_order(order).await?;
        if inserted {
            info!("🔄️📦️ {} order [{order_id}] for {} recorded as {}", order.order_type, order.total_amount, order.status);
        } else {
            debug!("🔄️📦️ Order [{order_id}] was already recorded. Returning the existing order");
        }
        Ok((order, inserted))
    }

    /// Fetch an order by id. An overdue `PENDING` order is moved to `EXPIRED` before it is returned.
    pub async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, PaymentGatewayError> {
        match self.db.fetch_order(order_id).await? {
            Some(order) => Ok(Some(self.apply_expiry(order).await?)),
            None => Ok(None),
        }
    }

    /// All orders paying into the given merchant wallet, newest first, with expiry applied.
    pub async fn orders_for_merchant(&self, wallet: &WalletAddress) -> Result<Vec<Order>, PaymentGatewayError> {
        let orders = self.db.fetch_orders_for_merchant(wallet).await?;
        let mut result = Vec::with_capacity(orders.len());
        for order in orders {
            result.push(self.apply_expiry(order).await?);
        }
        Ok(result)
    }

    /// Marks the order as `PAID` and publishes an [`OrderPaidEvent`].
    ///
    /// Reporting the same transfer for an order that is already `PAID` is not an error: the stored order is returned
    /// and no event is published.
    pub async fn mark_order_paid(&self, payment: PaymentConfirmation) -> Result<Order, PaymentGatewayError> {
        let order_id = payment.order_id.clone();
        if let Some(order) = self.fetch_order(&order_id).await? {
            if order.status == OrderStatusType::Paid && order.transfer_hash.as_ref() == Some(&payment.transfer_hash) {
                debug!("🔄️💰️ Order [{order_id}] is already paid by transfer {}", payment.transfer_hash);
                return Ok(order);
            }
        }
        let order = self.db.mark_order_paid(&payment).await?;
        info!("🔄️💰️ Order [{order_id}] is paid. Transfer: {}", payment.transfer_hash);
        self.producers.publish_order_paid(OrderPaidEvent::new(order.clone())).await;
        Ok(order)
    }

    /// Marks the order as `REFUNDED` and publishes an [`OrderRefundedEvent`].
    ///
    /// Reporting the same refund transfer twice returns the stored order. A different refund transfer for an order
    /// that has already been refunded is rejected.
    pub async fn mark_order_refunded(&self, refund: RefundConfirmation) -> Result<Order, PaymentGatewayError> {
        let order_id = refund.order_id.clone();
        if let Some(order) = self.db.fetch_order(&order_id).await? {
            if order.refund_transfer_hash.as_ref() == Some(&refund.refund_transfer_hash) {
                debug!("🔄️↩️ Order [{order_id}] was already refunded by {}", refund.refund_transfer_hash);
                return Ok(order);
            }
        }
        let order = self.db.mark_order_refunded(&refund).await?;
        info!("🔄️↩️ Order [{order_id}] refunded. Transfer: {}", refund.refund_transfer_hash);
        self.producers.publish_order_refunded(OrderRefundedEvent::new(order.clone())).await;
        Ok(order)
    }

    pub async fn cancel_order(&self, order_id: &OrderId) -> Result<Order, PaymentGatewayError> {
        self.annul_order(order_id, OrderStatusType::Cancelled).await
    }

    pub async fn fail_order(&self, order_id: &OrderId) -> Result<Order, PaymentGatewayError> {
        self.annul_order(order_id, OrderStatusType::Failed).await
    }

    /// Applies a generic status update, dispatching on the requested status.
    ///
    /// ## Failure modes:
    /// - `OrderNotFound` if the order does not exist.
    /// - `ValidationError` if a field required by the target status is missing.
    /// - `InvalidTransition` if the order lifecycle does not allow the change.
    pub async fn update_order_status(&self, update: OrderStatusUpdate) -> Result<Order, PaymentGatewayError> {
        use OrderStatusType::*;
        let order_id = update.order_id.clone();
        trace!("🔄️ Status update for order [{order_id}] to {}", update.status);
        match update.status {
            Paid => {
                let transfer_hash = update
                    .transfer_hash
                    .filter(|h| !h.trim().is_empty())
                    .ok_or_else(|| PaymentGatewayError::ValidationError("transferHash is required for PAID".into()))?;
                let payment = PaymentConfirmation {
                    order_id,
                    transfer_hash,
                    customer_wallet: update.customer_wallet,
                    block_number: update.block_number,
                    gas_used: update.gas_used,
                    token_address: update.token_address,
                    payment_method: update.payment_method,
                    paid_at: Utc::now(),
                };
                self.mark_order_paid(payment).await
            },
            Refunded => {
                let refund_transfer_hash =
                    update.refund_transfer_hash.filter(|h| !h.trim().is_empty()).ok_or_else(|| {
                        PaymentGatewayError::ValidationError("refundTransferHash is required for REFUNDED".into())
                    })?;
                let refund = RefundConfirmation { order_id, refund_transfer_hash, refunded_at: Utc::now() };
                self.mark_order_refunded(refund).await
            },
            Failed | Expired | Cancelled => self.annul_order(&order_id, update.status).await,
            Pending => {
                let order =
                    self.db.fetch_order(&order_id).await?.ok_or(PaymentGatewayError::OrderNotFound(order_id.clone()))?;
                Err(PaymentGatewayError::InvalidTransition { order_id, from: order.status, to: Pending })
            },
        }
    }

    /// Expires every overdue `PENDING` order in one sweep, and publishes an [`OrderAnnulledEvent`] for each.
    pub async fn expire_old_orders(&self) -> Result<Vec<Order>, PaymentGatewayError> {
        let expired = self.db.expire_orders(Utc::now()).await?;
        for order in &expired {
            info!("🔄️🕰️ Order [{}] has expired", order.id);
            self.producers.publish_order_annulled(OrderAnnulledEvent::new(order.clone())).await;
        }
        Ok(expired)
    }

    async fn annul_order(&self, order_id: &OrderId, status: OrderStatusType) -> Result<Order, PaymentGatewayError> {
        let order = self.db.annul_order(order_id, status).await?;
        info!("🔄️ Order [{order_id}] is now {status}");
        self.producers.publish_order_annulled(OrderAnnulledEvent::new(order.clone())).await;
        Ok(order)
    }

    /// Persists the expiry of an overdue order. If another request changed the order first, the fresh copy wins.
    async fn apply_expiry(&self, order: Order) -> Result<Order, PaymentGatewayError> {
        if !order.is_overdue(Utc::now()) {
            return Ok(order);
        }
        match self.annul_order(&order.id, OrderStatusType::Expired).await {
            Ok(expired) => Ok(expired),
            Err(PaymentGatewayError::TransitionConflict(_)) | Err(PaymentGatewayError::InvalidTransition { .. }) => {
                debug!("🔄️🕰️ Order [{}] changed while expiring it. Returning the current copy", order.id);
                self.db.fetch_order(&order.id).await?.ok_or(PaymentGatewayError::OrderNotFound(order.id))
            },
            Err(e) => Err(e),
        }
    }
}

impl<B> ReconciliationNotifier for OrderFlowApi<B>
where B: PaymentGatewayDatabase
{
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Order, ReconciliationError> {
        OrderFlowApi::fetch_order(self, order_id).await?.ok_or_else(|| ReconciliationError::NotFound(order_id.clone()))
    }

    async fn order_paid(&self, payment: PaymentConfirmation) -> Result<Order, ReconciliationError> {
        Ok(self.mark_order_paid(payment).await?)
    }

    async fn order_refunded(&self, refund: RefundConfirmation) -> Result<Order, ReconciliationError> {
        Ok(self.mark_order_refunded(refund).await?)
    }
}
