use crate::{
    db_types::{Merchant, WalletAddress},
    traits::PaymentGatewayError,
};

/// The merchant directory.
///
/// Merchants are keyed by their (lowercase) wallet address. Every merchant has an API key, which storefront plugins
/// and webhooks use to identify the merchant an incoming order belongs to.
#[allow(async_fn_in_trait)]
pub trait MerchantManagement {
    /// Fetches the merchant record for `wallet`, creating it if it does not exist yet.
    ///
    /// New merchants are given a display name derived from the wallet (`Merchant 0x1234...abcd`) and a freshly
    /// generated API key. The second element of the result is true if the merchant was created by this call.
    async fn fetch_or_create_merchant(&self, wallet: &WalletAddress) -> Result<(Merchant, bool), PaymentGatewayError>;

    async fn fetch_merchant_by_wallet(&self, wallet: &WalletAddress) -> Result<Option<Merchant>, PaymentGatewayError>;

    async fn fetch_merchant_by_api_key(&self, api_key: &str) -> Result<Option<Merchant>, PaymentGatewayError>;

    /// Changes the merchant's display name and/or contact email. Fields that are `None` are left unchanged.
    ///
    /// Orders keep the merchant name they were created with.
    async fn update_merchant_profile(
        &self,
        wallet: &WalletAddress,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<Merchant, PaymentGatewayError>;

    /// Replaces the merchant's API key with a new random one. The old key stops working immediately.
    async fn rotate_api_key(&self, wallet: &WalletAddress) -> Result<Merchant, PaymentGatewayError>;
}
