use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;

use crate::{
    db_types::{Merchant, NewOrder, Order, OrderType, WalletAddress},
    helpers::new_invoice_id,
    kpe_api::errors::MerchantApiError,
    order_objects::NewInvoice,
    traits::PaymentGatewayDatabase,
};

/// The merchant directory and direct-invoice API.
///
/// Merchants sign in with their wallet. The first sign-in registers the merchant with a generated name and API key.
pub struct MerchantApi<B> {
    db: B,
    invoice_expiry: Option<Duration>,
}

impl<B> Debug for MerchantApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MerchantApi")
    }
}

impl<B: Clone> Clone for MerchantApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), invoice_expiry: self.invoice_expiry }
    }
}

impl<B> MerchantApi<B> {
    pub fn new(db: B) -> Self {
        Self { db, invoice_expiry: None }
    }

    /// Sets the lifetime given to direct invoices that do not ask for one. `None` means invoices never expire.
    pub fn with_invoice_expiry(mut self, expiry: Option<Duration>) -> Self {
        self.invoice_expiry = expiry;
        self
    }
}

impl<B> MerchantApi<B>
where B: PaymentGatewayDatabase
{
    /// Fetches, or registers, the merchant owning `wallet`. The wallet is accepted in any letter case.
    ///
    /// Returns the merchant, and whether it was created by this call.
    pub async fn authenticate(&self, wallet: &str) -> Result<(Merchant, bool), MerchantApiError> {
        let wallet = parse_wallet(wallet)?;
        let (merchant, created) = self.db.fetch_or_create_merchant(&wallet).await?;
        if created {
            info!("🧑‍💼️ New merchant registered: {} ({})", merchant.name, merchant.wallet_address);
        }
        Ok((merchant, created))
    }

    pub async fn merchant_for_wallet(&self, wallet: &WalletAddress) -> Result<Option<Merchant>, MerchantApiError> {
        Ok(self.db.fetch_merchant_by_wallet(wallet).await?)
    }

    pub async fn merchant_for_api_key(&self, api_key: &str) -> Result<Option<Merchant>, MerchantApiError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Ok(None);
        }
        Ok(self.db.fetch_merchant_by_api_key(api_key).await?)
    }

    pub async fn update_profile(
        &self,
        wallet: &WalletAddress,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<Merchant, MerchantApiError> {
        let name = name.map(|n| n.trim().to_string());
        if matches!(&name, Some(n) if n.is_empty()) {
            return Err(MerchantApiError::Validation("Merchant name cannot be empty".into()));
        }
        let email = email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty());
        Ok(self.db.update_merchant_profile(wallet, name, email).await?)
    }

    pub async fn rotate_api_key(&self, wallet: &WalletAddress) -> Result<Merchant, MerchantApiError> {
        Ok(self.db.rotate_api_key(wallet).await?)
    }

    /// Creates a `DIRECT` invoice for a registered merchant.
    ///
    /// ## Failure modes:
    /// - `Validation` if the product name is blank, the amount is not positive, or the requested lifetime is not
    ///   positive.
    /// - `MerchantNotFound` if the wallet has never signed in.
    pub async fn create_invoice(&self, invoice: NewInvoice) -> Result<Order, MerchantApiError> {
        let product_name = invoice.product_name.trim();
        if product_name.is_empty() {
            return Err(MerchantApiError::Validation("productName is required".into()));
        }
        if !invoice.total_amount.is_positive() {
            return Err(MerchantApiError::Validation(format!(
                "totalAmount must be positive, got {}",
                invoice.total_amount
            )));
        }
        let currency = invoice.currency.trim();
        if currency.is_empty() || !currency.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(MerchantApiError::Validation(format!("'{currency}' is not a valid currency code")));
        }
        let lifetime = invoice.expires_in.or(self.invoice_expiry);
        if matches!(lifetime, Some(d) if d <= Duration::zero()) {
            return Err(MerchantApiError::Validation("Invoice lifetime must be positive".into()));
        }
        let merchant = self
            .db
            .fetch_merchant_by_wallet(&invoice.merchant_wallet)
            .await?
            .ok_or_else(|| MerchantApiError::MerchantNotFound(invoice.merchant_wallet.to_string()))?;
        let order = NewOrder::new(
            new_invoice_id(),
            OrderType::Direct,
            &merchant,
            product_name,
            invoice.total_amount,
            currency,
        )
        .with_description(invoice.description)
        .with_customer_email(invoice.customer_email)
        .with_expiry(lifetime.map(|d| Utc::now() + d));
        let (order, _) = self.db.insert_order(order).await?;
        info!("🧑‍💼️ Invoice [{}] for {} {} created by {}", order.id, order.total_amount, order.currency, merchant.name);
        Ok(order)
    }
}

fn parse_wallet(wallet: &str) -> Result<WalletAddress, MerchantApiError> {
    WalletAddress::parse(wallet.trim()).map_err(|_| MerchantApiError::InvalidWallet(wallet.to_string()))
}

#[cfg(test)]
mod test {
    use kaia_common::FiatAmount;

    use super::*;
    use crate::{
        db_types::OrderStatusType,
        test_utils::prepare_env::test_database,
        traits::OrderManagement,
        SqliteDatabase,
    };

    const WALLET: &str = "0x742D35Cc6634C0532925a3b844Bc9e7595f0bEb7";

    async fn api() -> MerchantApi<SqliteDatabase> {
        MerchantApi::new(test_database().await)
    }

    #[tokio::test]
    async fn sign_in_registers_once() {
        let api = api().await;
        let (merchant, created) = api.authenticate(WALLET).await.unwrap();
        assert!(created);
        assert_eq!(merchant.wallet_address.as_str(), WALLET.to_lowercase());
        assert_eq!(merchant.name, "Merchant 0x742d...beb7");
        assert_eq!(merchant.api_key.len(), 24);
        let (again, created) = api.authenticate(&WALLET.to_lowercase()).await.unwrap();
        assert!(!created);
        assert_eq!(again, merchant);
        assert!(matches!(api.authenticate("0x1234").await, Err(MerchantApiError::InvalidWallet(_))));
    }

    #[tokio::test]
    async fn api_keys_identify_merchants() {
        let api = api().await;
        let (merchant, _) = api.authenticate(WALLET).await.unwrap();
        let found = api.merchant_for_api_key(&merchant.api_key).await.unwrap().unwrap();
        assert_eq!(found.id, merchant.id);
        assert!(api.merchant_for_api_key("").await.unwrap().is_none());

        let rotated = api.rotate_api_key(&merchant.wallet_address).await.unwrap();
        assert_ne!(rotated.api_key, merchant.api_key);
        assert!(api.merchant_for_api_key(&merchant.api_key).await.unwrap().is_none());
        assert!(api.merchant_for_api_key(&rotated.api_key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn profile_changes_do_not_touch_orders() {
        let api = api().await;
        let (merchant, _) = api.authenticate(WALLET).await.unwrap();
        let amount = FiatAmount::from_major_units(50).unwrap();
        let order = api
            .create_invoice(NewInvoice::new(merchant.wallet_address.clone(), "Widget", amount, "USD"))
            .await
            .unwrap();
        let updated = api
            .update_profile(&merchant.wallet_address, Some("Coffee Lab".into()), Some("hi@coffee.lab".into()))
            .await
            .unwrap();
        assert_eq!(updated.name, "Coffee Lab");
        assert_eq!(updated.email.as_deref(), Some("hi@coffee.lab"));
        assert_eq!(order.merchant_name, merchant.name);
        assert!(matches!(
            api.update_profile(&merchant.wallet_address, Some("  ".into()), None).await,
            Err(MerchantApiError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn direct_invoices() {
        let api = api().await.with_invoice_expiry(Some(Duration::minutes(30)));
        let (merchant, _) = api.authenticate(WALLET).await.unwrap();
        let amount = FiatAmount::from_major_units(50).unwrap();
        let invoice = NewInvoice::new(merchant.wallet_address.clone(), "Widget", amount, "USD")
            .with_customer_email("buyer@example.com");
        let order = api.create_invoice(invoice).await.unwrap();
        assert!(order.id.as_str().starts_with("inv_"));
        assert_eq!(order.order_type, OrderType::Direct);
        assert_eq!(order.status, OrderStatusType::Pending);
        assert_eq!(order.total_amount, amount);
        assert_eq!(order.currency, "USD");
        assert_eq!(order.merchant_wallet, merchant.wallet_address);
        assert_eq!(order.customer_email.as_deref(), Some("buyer@example.com"));
        let expires_at = order.expires_at.unwrap();
        assert!(expires_at > Utc::now() + Duration::minutes(29));

        let invoice = NewInvoice::new(merchant.wallet_address.clone(), "Widget", amount, "USD")
            .expires_in(Duration::minutes(5));
        let order = api.create_invoice(invoice).await.unwrap();
        assert!(order.expires_at.unwrap() < Utc::now() + Duration::minutes(6));
    }

    #[tokio::test]
    async fn invoice_validation() {
        let api = api().await;
        let (merchant, _) = api.authenticate(WALLET).await.unwrap();
        let wallet = merchant.wallet_address.clone();
        let amount = FiatAmount::from_major_units(50).unwrap();
        let blank = NewInvoice::new(wallet.clone(), " ", amount, "USD");
        assert!(matches!(api.create_invoice(blank).await, Err(MerchantApiError::Validation(_))));
        let zero = NewInvoice::new(wallet.clone(), "Widget", FiatAmount::default(), "USD");
        assert!(matches!(api.create_invoice(zero).await, Err(MerchantApiError::Validation(_))));
        let stranger = WalletAddress::parse("0x0000000000000000000000000000000000000001").unwrap();
        let unknown = NewInvoice::new(stranger, "Widget", amount, "USD");
        assert!(matches!(api.create_invoice(unknown).await, Err(MerchantApiError::MerchantNotFound(_))));
        let orders = api.db.fetch_orders_for_merchant(&wallet).await.unwrap();
        assert!(orders.is_empty());
    }
}
