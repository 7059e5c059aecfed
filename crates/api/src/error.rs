//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use document_store::StoreError;
use domain::DomainError;
use saga::SagaError;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Saga participant error.
    Saga(SagaError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Saga(err) => saga_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn saga_error_to_response(err: SagaError) -> (StatusCode, String) {
    match &err {
        e if e.is_validation_error() => (StatusCode::BAD_REQUEST, err.to_string()),
        SagaError::OrderNotFound(_) | SagaError::SiteNotFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        SagaError::Timeout { .. } => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        _ => {
            tracing::error!(error = %err, "internal server error");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Saga(err)
    }
}

/// Errors that prevent the service from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] DomainError),

    #[error("Database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Saga error: {0}")]
    Saga(#[from] SagaError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CustomerRef, OrderId, PartId};
    use std::time::Duration;

    fn status_of(err: SagaError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_validation_errors_are_bad_requests() {
        assert_eq!(
            status_of(SagaError::Validation("items must not be empty".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(SagaError::CustomerNotFound(CustomerRef::from("ghost"))),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_missing_order_is_not_found() {
        assert_eq!(
            status_of(SagaError::OrderNotFound(OrderId::new())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_timeouts_are_unavailable() {
        let err = SagaError::Timeout {
            operation: "insert order",
            after: Duration::from_secs(5),
        };
        assert_eq!(status_of(err), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_mid_saga_failures_are_internal() {
        assert_eq!(
            status_of(SagaError::PartNotFound(PartId::new(9))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
