//! HTTP error mapping: DomainError -> status code + JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::foundation::{DomainError, ErrorCode};

/// JSON error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

/// Wrapper that renders a DomainError as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0.code);
        if status.is_server_error() {
            tracing::error!(code = %self.0.code, message = %self.0.message, "Request failed");
        }
        let body = ErrorResponse::new(self.0.code.to_string(), self.0.message);
        (status, Json(body)).into_response()
    }
}

fn status_for(code: &ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest
        | ErrorCode::ValidationFailed
        | ErrorCode::InvalidRefundAmount
        | ErrorCode::MissingPaymentToken
        | ErrorCode::InvalidRetryStatus => StatusCode::BAD_REQUEST,

        ErrorCode::PaymentMethodNotFound
        | ErrorCode::SubscriptionNotFound
        | ErrorCode::TransactionNotFound
        | ErrorCode::JobNotFound
        | ErrorCode::RetryNotFound
        | ErrorCode::RuleNotFound => StatusCode::NOT_FOUND,

        ErrorCode::MissingProcessorTransactionId => StatusCode::UNPROCESSABLE_ENTITY,

        ErrorCode::ProcessorsUnavailable => StatusCode::SERVICE_UNAVAILABLE,

        ErrorCode::UnknownProcessor
        | ErrorCode::DatabaseError
        | ErrorCode::CacheError
        | ErrorCode::ConfigError
        | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
