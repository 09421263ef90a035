use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use kaia_payment_engine::{MerchantApiError, PaymentGatewayError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("A valid API key is required. Supply it in the X-Kaia-Api-Key header or the api_key query parameter.")]
    InvalidApiKey,
    #[error("{0}")]
    InvalidTransition(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::InvalidApiKey => StatusCode::UNAUTHORIZED,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidTransition(_) => StatusCode::CONFLICT,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<PaymentGatewayError> for ServerError {
    fn from(e: PaymentGatewayError) -> Self {
        match e {
            PaymentGatewayError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            PaymentGatewayError::OrderNotFound(_) | PaymentGatewayError::MerchantNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            PaymentGatewayError::InvalidTransition { .. } |
            PaymentGatewayError::TransitionConflict(_) |
            PaymentGatewayError::RefundAlreadyIssued(_) => Self::InvalidTransition(e.to_string()),
            PaymentGatewayError::ValidationError(s) => Self::ValidationError(s),
        }
    }
}

impl From<MerchantApiError> for ServerError {
    fn from(e: MerchantApiError) -> Self {
        match e {
            MerchantApiError::InvalidWallet(_) | MerchantApiError::Validation(_) => Self::ValidationError(e.to_string()),
            MerchantApiError::MerchantNotFound(_) => Self::NoRecordFound(e.to_string()),
            MerchantApiError::DatabaseError(s) => Self::BackendError(s),
        }
    }
}

/// A webhook payload could not be turned into a ledger order.
#[derive(Debug, Clone, Error)]
pub enum WebhookConversionError {
    #[error("The order contained invalid data. {0}")]
    FormatError(String),
    #[error("The order is missing the {0} field.")]
    MissingField(&'static str),
}
