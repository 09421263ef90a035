use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType, WalletAddress},
    order_objects::{PaymentConfirmation, RefundConfirmation},
};

/// Inserts the order into the database, returning `false` in the second parameter if the order already exists.
/// An existing order is returned as-is; none of its fields are touched.
pub async fn idempotent_insert(order: NewOrder, conn: &mut SqliteConnection) -> Result<(Order, bool), sqlx::Error> {
    let order_id = order.id.clone();
    match insert_order(order, conn).await? {
        Some(order) => {
            debug!("🗃️ Order [{}] inserted with status {}", order.id, order.status);
            Ok((order, true))
        },
        None => {
            let existing = fetch_order(&order_id, conn).await?.ok_or(sqlx::Error::RowNotFound)?;
            debug!("🗃️ Order [{order_id}] already exists. Returning the stored order");
            Ok((existing, false))
        },
    }
}

/// Inserts a new order into the database using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
///
/// Returns `None` if an order with the same id already exists.
async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                id,
                order_type,
                status,
                total_amount,
                currency,
                merchant_name,
                merchant_wallet,
                product_name,
                description,
                order_confirmation,
                customer_email,
                payment_method,
                admin_graphql_api_id,
                shop_domain,
                expires_at,
                paid_at,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $17)
            ON CONFLICT (id) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(order.id)
    .bind(order.order_type)
    .bind(order.status)
    .bind(order.total_amount)
    .bind(order.currency)
    .bind(order.merchant_name)
    .bind(order.merchant_wallet)
    .bind(order.product_name)
    .bind(order.description)
    .bind(order.order_confirmation)
    .bind(order.customer_email)
    .bind(order.payment_method)
    .bind(order.admin_graphql_api_id)
    .bind(order.shop_domain)
    .bind(order.expires_at)
    .bind(order.paid_at)
    .bind(order.created_at)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn fetch_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

/// All orders collected by the given wallet, newest first.
pub async fn fetch_orders_for_merchant(
    wallet: &WalletAddress,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders: Vec<Order> = sqlx::query_as(
        "SELECT * FROM orders WHERE merchant_wallet = $1 ORDER BY julianday(created_at) DESC, rowid DESC",
    )
    .bind(wallet)
    .fetch_all(conn)
    .await?;
    trace!("🗃️ {} orders found for merchant {wallet}", orders.len());
    Ok(orders)
}

/// Sets the order to `PAID` along with the payment details, provided that the order is still in the `expected`
/// status. Returns `None` if the status had changed in the meantime.
pub(crate) async fn set_paid(
    payment: &PaymentConfirmation,
    expected: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let block_number = payment.block_number.and_then(|n| i64::try_from(n).ok());
    let gas_used = payment.gas_used.and_then(|n| i64::try_from(n).ok());
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = 'PAID',
                transfer_hash = $1,
                paid_at = $2,
                customer_wallet = COALESCE($3, customer_wallet),
                block_number = COALESCE($4, block_number),
                gas_used = COALESCE($5, gas_used),
                token_address = COALESCE($6, token_address),
                payment_method = COALESCE($7, payment_method),
                updated_at = $8
            WHERE id = $9 AND status = $10
            RETURNING *;
        "#,
    )
    .bind(payment.transfer_hash.as_str())
    .bind(payment.paid_at)
    .bind(payment.customer_wallet.as_ref())
    .bind(block_number)
    .bind(gas_used)
    .bind(payment.token_address.as_deref())
    .bind(payment.payment_method.as_deref())
    .bind(Utc::now())
    .bind(payment.order_id.as_str())
    .bind(expected)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Sets a `PAID` order to `REFUNDED`. Returns `None` if the order is no longer `PAID`, or already has a refund hash.
pub(crate) async fn set_refunded(
    refund: &RefundConfirmation,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = 'REFUNDED',
                refund_transfer_hash = $1,
                refunded_at = $2,
                updated_at = $3
            WHERE id = $4 AND status = 'PAID' AND refund_transfer_hash IS NULL
            RETURNING *;
        "#,
    )
    .bind(refund.refund_transfer_hash.as_str())
    .bind(refund.refunded_at)
    .bind(Utc::now())
    .bind(refund.order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Compare-and-set on the order status. Returns `None` if the order is not currently in the `expected` status.
pub(crate) async fn update_order_status(
    order_id: &OrderId,
    expected: OrderStatusType,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4 RETURNING *")
        .bind(status)
        .bind(Utc::now())
        .bind(order_id.as_str())
        .bind(expected)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Marks every pending order whose expiry time lies before `now` as expired, and returns them.
pub(crate) async fn expire_orders(now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders: Vec<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET status = 'EXPIRED', updated_at = $1
            WHERE status = 'PENDING' AND expires_at IS NOT NULL AND julianday(expires_at) < julianday($1)
            RETURNING *;
        "#,
    )
    .bind(now)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}
