//! Value types shared by every crate in the Kaia commerce payment gateway.
mod fiat_amount;
mod helpers;
mod secret;

pub mod op;

pub use fiat_amount::{FiatAmount, FiatAmountError};
pub use helpers::parse_boolean_flag;
pub use secret::Secret;
