use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use log::error;
use lsk_payment_engine::{ApplierError, PaymentFlowError};
use thiserror::Error;

use crate::{
    data_objects::JsonResponse,
    integrations::payhere::{NotificationConversionError, SignatureError},
};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Could not read the notification body. {0}")]
    InvalidRequestBody(String),
    #[error("Notification signature verification failed. {0}")]
    InvalidSignature(#[from] SignatureError),
    #[error("Malformed notification. {0}")]
    MalformedNotification(#[from] NotificationConversionError),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            // Adversarial or malformed input: reject outright, the gateway must not retry these.
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidSignature(_) => StatusCode::BAD_REQUEST,
            Self::MalformedNotification(_) => StatusCode::BAD_REQUEST,
            // Anything that failed after verification is retryable; downstream is replay-tolerant.
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(JsonResponse::failure(self))
    }
}

impl From<PaymentFlowError> for ServerError {
    fn from(e: PaymentFlowError) -> Self {
        match &e {
            // Invariant violations need a human; log them loudly before surfacing the retryable status.
            PaymentFlowError::ApplierError(ApplierError::CurrencyMismatch { .. })
            | PaymentFlowError::ApplierError(ApplierError::IllegalListingState { .. }) => {
                error!("💥️ Invariant violation while applying payment side effects: {e}");
            },
            _ => {},
        }
        Self::BackendError(e.to_string())
    }
}
