//! Error types for the booking core and the HTTP edge
//!
//! [`CoreError`] is what every lifecycle operation returns. [`ApiError`] is
//! the HTTP rendering of it, with status code mapping and a JSON body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

/// Failure of a core booking/tour/review operation
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid transition from '{from}' to '{to}'")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Booking already paid")]
    AlreadyPaid,

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Payment declined - {0}")]
    Declined(String),

    #[error("Payment failed - {0}")]
    PaymentFailed(String),

    #[error("Not available: {0}")]
    Inactive(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Concurrent modification: {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;

impl From<validator::ValidationErrors> for CoreError {
    fn from(err: validator::ValidationErrors) -> Self {
        CoreError::Validation(err.to_string())
    }
}

/// API error type with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payment required: {0}")]
    PaymentRequired(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Error details in the response
#[derive(Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl ApiError {
    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::PaymentRequired(_) => "PAYMENT_REQUIRED",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        match &self {
            ApiError::InternalError(_) | ApiError::DatabaseError(_) => {
                tracing::error!(error = %message, code = %error_code, "Server error occurred");
            }
            _ => {
                tracing::debug!(error = %message, code = %error_code, "Client error occurred");
            }
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code: error_code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::NotFound(_) => ApiError::NotFound(message),
            CoreError::Forbidden(_) => ApiError::Forbidden(message),
            CoreError::InvalidTransition { .. }
            | CoreError::InvalidState(_)
            | CoreError::AlreadyPaid
            | CoreError::Duplicate(_)
            | CoreError::Conflict(_) => ApiError::Conflict(message),
            CoreError::Declined(_) | CoreError::PaymentFailed(_) => {
                ApiError::PaymentRequired(message)
            }
            CoreError::Inactive(_) => ApiError::BadRequest(message),
            CoreError::Validation(_) => ApiError::ValidationError(message),
            CoreError::Store(_) => ApiError::DatabaseError(message),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

/// Result type alias using ApiError
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ApiError::NotFound("test".to_string()).error_code(),
            "NOT_FOUND"
        );
        assert_eq!(
            ApiError::PaymentRequired("test".to_string()).error_code(),
            "PAYMENT_REQUIRED"
        );
        assert_eq!(
            ApiError::Unauthorized("test".to_string()).error_code(),
            "UNAUTHORIZED"
        );
    }

    #[test]
    fn test_core_error_status_mapping() {
        let cases = [
            (CoreError::NotFound("Booking".into()), StatusCode::NOT_FOUND),
            (CoreError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (
                CoreError::InvalidTransition {
                    from: "cancelled",
                    to: "confirmed",
                },
                StatusCode::CONFLICT,
            ),
            (CoreError::AlreadyPaid, StatusCode::CONFLICT),
            (CoreError::Duplicate("review".into()), StatusCode::CONFLICT),
            (
                CoreError::Declined("Insufficient funds".into()),
                StatusCode::PAYMENT_REQUIRED,
            ),
            (CoreError::Inactive("tour".into()), StatusCode::BAD_REQUEST),
            (CoreError::Validation("x".into()), StatusCode::BAD_REQUEST),
        ];

        for (core, status) in cases {
            assert_eq!(ApiError::from(core).status_code(), status);
        }
    }

    #[test]
    fn test_declined_message_is_descriptive() {
        let err = CoreError::Declined("Insufficient funds".to_string());
        assert_eq!(err.to_string(), "Payment declined - Insufficient funds");
    }
}
