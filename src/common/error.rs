// Error handling types for the API

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::fmt;
use tracing::error;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    BadRequest(String),
    Conflict(String),
    InternalServer(String),
    ServiceUnavailable(String),
    DatabaseError(sqlx::Error),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::InternalServer(msg) => write!(f, "Internal Server Error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service Unavailable: {}", msg),
            ApiError::DatabaseError(e) => write!(f, "Database Error: {}", e),
        }
    }
}

/// JSON error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message, code) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, "UNAUTHORIZED"),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, "BAD_REQUEST"),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg, "CONFLICT"),
            ApiError::InternalServer(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                msg,
                "INTERNAL_SERVER_ERROR",
            ),
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                msg,
                "SERVICE_UNAVAILABLE",
            ),
            ApiError::DatabaseError(e) => {
                error!(error = %e, "Database error occurred");
                match &e {
                    // Racing duplicate creation is expected under concurrent
                    // logins; the unique constraints are the backstop.
                    sqlx::Error::Database(db) if db.is_unique_violation() => (
                        StatusCode::CONFLICT,
                        "resource already exists".to_string(),
                        "CONFLICT",
                    ),
                    sqlx::Error::PoolTimedOut => (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "storage unavailable".to_string(),
                        "SERVICE_UNAVAILABLE",
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Database operation failed".to_string(),
                        "DATABASE_ERROR",
                    ),
                }
            }
        };

        let error_response = ErrorResponse {
            error: error_message,
            code: code.to_string(),
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::DatabaseError(e)
    }
}
