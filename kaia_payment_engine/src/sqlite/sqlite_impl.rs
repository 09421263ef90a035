//! `SqliteDatabase` is a concrete implementation of a Kaia Payment engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the ledger traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::db::{db_url, merchants, new_pool, orders};
use crate::{
    db_types::{Merchant, NewOrder, Order, OrderId, OrderStatusType, WalletAddress},
    helpers::new_api_key,
    order_objects::{PaymentConfirmation, RefundConfirmation},
    traits::{MerchantManagement, OrderManagement, PaymentGatewayDatabase, PaymentGatewayError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

/// Rejects the move from the order's current status to `to` if the order lifecycle does not allow it.
fn check_transition(order: &Order, to: OrderStatusType) -> Result<(), PaymentGatewayError> {
    if order.status.can_transition_to(to) {
        Ok(())
    } else {
        Err(PaymentGatewayError::InvalidTransition { order_id: order.id.clone(), from: order.status, to })
    }
}

impl PaymentGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), PaymentGatewayError> {
        if !matches!(order.status, OrderStatusType::Pending | OrderStatusType::Paid) {
            return Err(PaymentGatewayError::ValidationError(format!(
                "New orders must be PENDING or PAID, not {}",
                order.status
            )));
        }
        if !order.total_amount.is_positive() {
            return Err(PaymentGatewayError::ValidationError(format!(
                "Order {} must have a positive total, not {}",
                order.id, order.total_amount
            )));
        }
        let mut conn = self.pool.acquire().await?;
        let result = orders::idempotent_insert(order, &mut conn).await?;
        Ok(result)
    }

    async fn mark_order_paid(&self, payment: &PaymentConfirmation) -> Result<Order, PaymentGatewayError> {
        if payment.transfer_hash.trim().is_empty() {
            return Err(PaymentGatewayError::ValidationError("A transfer hash is required to mark an order as paid".into()));
        }
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order(&payment.order_id, &mut tx)
            .await?
            .ok_or_else(|| PaymentGatewayError::OrderNotFound(payment.order_id.clone()))?;
        check_transition(&order, OrderStatusType::Paid)?;
        let updated = orders::set_paid(payment, order.status, &mut tx)
            .await?
            .ok_or_else(|| PaymentGatewayError::TransitionConflict(payment.order_id.clone()))?;
        tx.commit().await?;
        debug!("🗃️ Order [{}] marked as paid with transfer {}", updated.id, payment.transfer_hash);
        Ok(updated)
    }

    async fn mark_order_refunded(&self, refund: &RefundConfirmation) -> Result<Order, PaymentGatewayError> {
        if refund.refund_transfer_hash.trim().is_empty() {
            return Err(PaymentGatewayError::ValidationError("A refund transfer hash is required".into()));
        }
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order(&refund.order_id, &mut tx)
            .await?
            .ok_or_else(|| PaymentGatewayError::OrderNotFound(refund.order_id.clone()))?;
        if order.refund_transfer_hash.is_some() {
            return Err(PaymentGatewayError::RefundAlreadyIssued(order.id));
        }
        check_transition(&order, OrderStatusType::Refunded)?;
        let updated = orders::set_refunded(refund, &mut tx)
            .await?
            .ok_or_else(|| PaymentGatewayError::TransitionConflict(refund.order_id.clone()))?;
        tx.commit().await?;
        debug!("🗃️ Order [{}] refunded with transfer {}", updated.id, refund.refund_transfer_hash);
        Ok(updated)
    }

    async fn annul_order(&self, order_id: &OrderId, status: OrderStatusType) -> Result<Order, PaymentGatewayError> {
        use OrderStatusType::*;
        if !matches!(status, Failed | Expired | Cancelled) {
            return Err(PaymentGatewayError::ValidationError(format!("{status} is not an annulled status")));
        }
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order(order_id, &mut tx)
            .await?
            .ok_or_else(|| PaymentGatewayError::OrderNotFound(order_id.clone()))?;
        check_transition(&order, status)?;
        let updated = orders::update_order_status(order_id, order.status, status, &mut tx)
            .await?
            .ok_or_else(|| PaymentGatewayError::TransitionConflict(order_id.clone()))?;
        tx.commit().await?;
        debug!("🗃️ Order [{order_id}] moved from {} to {status}", order.status);
        Ok(updated)
    }

    async fn expire_orders(&self, now: DateTime<Utc>) -> Result<Vec<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let expired = orders::expire_orders(now, &mut conn).await?;
        if !expired.is_empty() {
            debug!("🗃️ {} overdue orders marked as expired", expired.len());
        }
        Ok(expired)
    }

    async fn close(&mut self) -> Result<(), PaymentGatewayError> {
        self.pool.close().await;
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_for_merchant(&self, wallet: &WalletAddress) -> Result<Vec<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_merchant(wallet, &mut conn).await?;
        Ok(orders)
    }
}

impl MerchantManagement for SqliteDatabase {
    async fn fetch_or_create_merchant(&self, wallet: &WalletAddress) -> Result<(Merchant, bool), PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let result = match merchants::insert_merchant(wallet, &mut tx).await? {
            Some(merchant) => (merchant, true),
            None => {
                let merchant = merchants::fetch_merchant_by_wallet(wallet, &mut tx)
                    .await?
                    .ok_or_else(|| PaymentGatewayError::MerchantNotFound(wallet.to_string()))?;
                (merchant, false)
            },
        };
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_merchant_by_wallet(&self, wallet: &WalletAddress) -> Result<Option<Merchant>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let merchant = merchants::fetch_merchant_by_wallet(wallet, &mut conn).await?;
        Ok(merchant)
    }

    async fn fetch_merchant_by_api_key(&self, api_key: &str) -> Result<Option<Merchant>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let merchant = merchants::fetch_merchant_by_api_key(api_key, &mut conn).await?;
        Ok(merchant)
    }

    async fn update_merchant_profile(
        &self,
        wallet: &WalletAddress,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<Merchant, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        merchants::update_profile(wallet, name, email, &mut conn)
            .await?
            .ok_or_else(|| PaymentGatewayError::MerchantNotFound(wallet.to_string()))
    }

    async fn rotate_api_key(&self, wallet: &WalletAddress) -> Result<Merchant, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let merchant = merchants::update_api_key(wallet, &new_api_key(), &mut conn)
            .await?
            .ok_or_else(|| PaymentGatewayError::MerchantNotFound(wallet.to_string()))?;
        info!("🗃️ API key rotated for merchant {}", merchant.wallet_address);
        Ok(merchant)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Runs the embedded schema migrations against this database.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
