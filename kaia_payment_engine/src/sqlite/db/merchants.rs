use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Merchant, WalletAddress},
    helpers::{default_merchant_name, new_api_key},
};

/// Inserts a merchant for `wallet` with a generated name and API key, unless one already exists.
///
/// Returns `None` if a merchant for the wallet is already present.
pub async fn insert_merchant(wallet: &WalletAddress, conn: &mut SqliteConnection) -> Result<Option<Merchant>, sqlx::Error> {
    let now = Utc::now();
    let merchant: Option<Merchant> = sqlx::query_as(
        r#"
            INSERT INTO merchants (wallet_address, name, api_key, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT (wallet_address) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(wallet)
    .bind(default_merchant_name(wallet))
    .bind(new_api_key())
    .bind(now)
    .fetch_optional(conn)
    .await?;
    if let Some(m) = &merchant {
        debug!("🗃️ New merchant #{} registered for {}", m.id, m.wallet_address);
    }
    Ok(merchant)
}

pub async fn fetch_merchant_by_wallet(
    wallet: &WalletAddress,
    conn: &mut SqliteConnection,
) -> Result<Option<Merchant>, sqlx::Error> {
    let merchant =
        sqlx::query_as("SELECT * FROM merchants WHERE wallet_address = $1").bind(wallet).fetch_optional(conn).await?;
    Ok(merchant)
}

pub async fn fetch_merchant_by_api_key(
    api_key: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Merchant>, sqlx::Error> {
    let merchant =
        sqlx::query_as("SELECT * FROM merchants WHERE api_key = $1").bind(api_key).fetch_optional(conn).await?;
    Ok(merchant)
}

/// Updates the name and/or email of a merchant. Fields that are `None` are left unchanged.
pub async fn update_profile(
    wallet: &WalletAddress,
    name: Option<String>,
    email: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<Option<Merchant>, sqlx::Error> {
    let merchant = sqlx::query_as(
        r#"
            UPDATE merchants SET
                name = COALESCE($1, name),
                email = COALESCE($2, email),
                updated_at = $3
            WHERE wallet_address = $4
            RETURNING *;
        "#,
    )
    .bind(name)
    .bind(email)
    .bind(Utc::now())
    .bind(wallet)
    .fetch_optional(conn)
    .await?;
    Ok(merchant)
}

pub async fn update_api_key(
    wallet: &WalletAddress,
    api_key: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Merchant>, sqlx::Error> {
    let merchant =
        sqlx::query_as("UPDATE merchants SET api_key = $1, updated_at = $2 WHERE wallet_address = $3 RETURNING *")
            .bind(api_key)
            .bind(Utc::now())
            .bind(wallet)
            .fetch_optional(conn)
            .await?;
    Ok(merchant)
}
