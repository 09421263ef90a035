use actix_web::{web, HttpRequest};
use hmac::{Hmac, Mac};
use log::trace;
use sha2::Sha256;

use crate::data_objects::ApiKeyQuery;

type HmacSha256 = Hmac<Sha256>;

/// The header that storefront plugins and webhook subscriptions use to present a merchant API key.
pub const API_KEY_HEADER: &str = "X-Kaia-Api-Key";

/// Base64-encoded HMAC-SHA256 of `data`, keyed with `secret`. This is the signature format used by both Shopify and
/// WooCommerce webhooks.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> String {
    keyed_mac(secret, data).map(|mac| base64::encode(mac.finalize().into_bytes())).unwrap_or_default()
}

/// Checks a base64-encoded HMAC-SHA256 signature in constant time.
pub fn verify_hmac(secret: &str, data: &[u8], signature: &str) -> bool {
    let Ok(expected) = base64::decode(signature.trim()) else {
        trace!("🔐️ HMAC signature is not valid base64");
        return false;
    };
    keyed_mac(secret, data).map(|mac| mac.verify_slice(&expected).is_ok()).unwrap_or(false)
}

fn keyed_mac(secret: &str, data: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(data);
    Some(mac)
}

/// Extracts the merchant API key from the `X-Kaia-Api-Key` header, falling back to the `api_key` query parameter.
pub fn api_key_from_request(req: &HttpRequest) -> Option<String> {
    let from_header = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    from_header.or_else(|| {
        web::Query::<ApiKeyQuery>::from_query(req.query_string())
            .ok()
            .and_then(|q| q.into_inner().api_key)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}
