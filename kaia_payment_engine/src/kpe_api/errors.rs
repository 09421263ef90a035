use thiserror::Error;

use crate::traits::PaymentGatewayError;

#[derive(Debug, Clone, Error)]
pub enum MerchantApiError {
    #[error("Invalid wallet address: {0}")]
    InvalidWallet(String),
    #[error("No merchant is registered for {0}")]
    MerchantNotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<PaymentGatewayError> for MerchantApiError {
    fn from(e: PaymentGatewayError) -> Self {
        match e {
            PaymentGatewayError::MerchantNotFound(w) => MerchantApiError::MerchantNotFound(w),
            PaymentGatewayError::ValidationError(s) => MerchantApiError::Validation(s),
            e => MerchantApiError::DatabaseError(e.to_string()),
        }
    }
}
