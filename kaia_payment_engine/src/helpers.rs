//! Identifier and credential generators used by the ledger.
use rand::{distributions::Alphanumeric, thread_rng, Rng, RngCore};

use crate::db_types::{OrderId, WalletAddress};

/// Merchant API keys are 24 lowercase hex characters (96 bits of entropy).
pub const API_KEY_LENGTH: usize = 24;

/// Generates a fresh merchant API key from the thread-local CSPRNG.
pub fn new_api_key() -> String {
    let mut bytes = [0u8; API_KEY_LENGTH / 2];
    thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Generates an identifier for a direct invoice, e.g. `inv_8fj2k1b0x9aq3m4z`.
pub fn new_invoice_id() -> OrderId {
    let suffix: String =
        thread_rng().sample_iter(&Alphanumeric).take(16).map(|c| char::from(c).to_ascii_lowercase()).collect();
    OrderId(format!("inv_{suffix}"))
}

/// The display name given to a merchant that signs in for the first time.
pub fn default_merchant_name(wallet: &WalletAddress) -> String {
    format!("Merchant {}", wallet.short_form())
}
