//! Error types and HTTP error response handling.
//!
//! This module defines the application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.
//!
//! Business outcomes such as insufficient funds or an unknown order are not
//! errors; they live in [`crate::models::reservation`] as outcome enums.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::storage::StorageError;

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Storage Errors**: the persistence collaborator failed; the whole
///   operation was rolled back
/// - **Resource Errors**: no balance exists for the requested user
/// - **Validation Errors**: invalid request data, rejected before the
///   service is invoked
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Storage operation failed (connection error, query error, aborted unit of work).
    ///
    /// Returns HTTP 500. Details are logged, never sent to the client.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// No balance has been opened for this user yet.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Balance for user {0} not found")]
    BalanceNotFound(i64),

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid request")]
    InvalidRequest(String),
}

/// Convert AppError into an HTTP response.
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `BalanceNotFound` → 404 Not Found
/// - `InvalidRequest` → 400 Bad Request
/// - `Storage` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::BalanceNotFound(_) => {
                (StatusCode::NOT_FOUND, "balance_not_found", self.to_string())
            }
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::Storage(ref err) => {
                tracing::error!(error = %err, "storage failure while handling request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(
            AppError::BalanceNotFound(7).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::InvalidRequest("bad".into())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Storage(StorageError::Unavailable("down".into()))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
