//! Commerce-platform integrations.
//!
//! Each platform module knows how to turn its webhook payload into a ledger order, and how to tell the storefront
//! that an order has been paid. The latter is wired up as an `OrderPaidEvent` handler that only acts on orders of its
//! own type.
use kaia_payment_engine::events::HookFuture;

pub mod shopify;
pub mod woocommerce;

pub(crate) fn no_op() -> HookFuture {
    Box::pin(async {})
}
