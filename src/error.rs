//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//!
//! Webhook routes only ever surface three of these to a provider:
//! [`GatewayError::Unauthorized`] (bad signature), [`GatewayError::VerificationFailed`]
//! (bad subscription challenge) and the 5xx family. Malformed payloads and
//! downstream failures are logged and acknowledged with 200 so providers do
//! not start a redelivery storm.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1101,
///     "message": "invalid webhook signature"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see the table on [`GatewayError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category             | HTTP Status                 |
/// |-----------|----------------------|-----------------------------|
/// | 1000–1099 | Validation           | 400 Bad Request             |
/// | 1100–1199 | Authentication       | 401 Unauthorized / 403      |
/// | 2000–2999 | Not Found / State    | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server               | 500 Internal Server Error   |
/// | 5000–5999 | Downstream providers | 502 Bad Gateway             |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Webhook signature missing or not matching the shared secret.
    #[error("invalid webhook signature")]
    Unauthorized,

    /// Subscription challenge (`hub.verify_token`) did not match.
    #[error("webhook verification failed")]
    VerificationFailed,

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Webhook body was syntactically valid but missing a required field.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Order with the given ID was not found.
    #[error("order not found: {0}")]
    OrderNotFound(String),

    /// Customer with the given ID was not found.
    #[error("customer not found: {0}")]
    CustomerNotFound(uuid::Uuid),

    /// The request conflicts with the current state of a record.
    #[error("conflict: {0}")]
    Conflict(String),

    /// AI completion or messaging API call failed.
    #[error("downstream error: {0}")]
    Downstream(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::MalformedPayload(_) => 1002,
            Self::Unauthorized => 1101,
            Self::VerificationFailed => 1102,
            Self::OrderNotFound(_) => 2001,
            Self::CustomerNotFound(_) => 2002,
            Self::Conflict(_) => 2009,
            Self::Internal(_) => 3000,
            Self::PersistenceError(_) => 3001,
            Self::Downstream(_) => 5001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::VerificationFailed => StatusCode::FORBIDDEN,
            Self::OrderNotFound(_) | Self::CustomerNotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Downstream(_) => StatusCode::BAD_GATEWAY,
            Self::PersistenceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        Self::PersistenceError(err.to_string())
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Downstream(err.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_maps_to_401() {
        let err = GatewayError::Unauthorized;
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.error_code(), 1101);
    }

    #[test]
    fn persistence_maps_to_500() {
        let err = GatewayError::PersistenceError("disk full".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn into_response_carries_status() {
        let response = GatewayError::OrderNotFound("ORD-9".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
