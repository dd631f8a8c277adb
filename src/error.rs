//! Error types for the REST API.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;


/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
    /// Error code.
    pub code: String,
}

/// Rate limit error response body.
#[derive(Debug, Serialize)]
pub struct RateLimitErrorResponse {
    /// Error message.
    pub error: String,
    /// Error code.
    pub code: String,
    /// Maximum requests allowed.
    pub limit: u32,
    /// Remaining requests.
    pub remaining: u32,
    /// Unix timestamp when the rate limit resets.
    pub reset: u64,
    /// Seconds until reset.
    pub retry_after: u64,
}

/// API error types.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Branch not found.
    #[error("Branch not found: {0}")]
    BranchNotFound(i64),

    /// Client not found.
    #[error("Client not found: {0}")]
    ClientNotFound(i64),

    /// User not found.
    #[error("User not found: {0}")]
    UserNotFound(i64),

    /// No snapshot exists for the requested branch and date.
    #[error("Snapshot not found for branch {branch_id} on {date}")]
    SnapshotNotFound {
        /// Branch identifier.
        branch_id: i64,
        /// Business date.
        date: chrono::NaiveDate,
    },

    /// Invalid request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A rollup job for the date is already queued or running.
    #[error("Aggregation already in progress for {0}")]
    AggregationInProgress(chrono::NaiveDate),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimitExceeded {
        /// Maximum requests allowed.
        limit: u32,
        /// Remaining requests (always 0 when exceeded).
        remaining: u32,
        /// Unix timestamp when the rate limit resets.
        reset: u64,
        /// Seconds until reset.
        retry_after: u64,
    },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::RateLimitExceeded {
                limit,
                remaining,
                reset,
                retry_after,
            } => {
                let body = Json(RateLimitErrorResponse {
                    error: "Rate limit exceeded".to_string(),
                    code: "RATE_LIMIT_EXCEEDED".to_string(),
                    limit: *limit,
                    remaining: *remaining,
                    reset: *reset,
                    retry_after: *retry_after,
                });

                (
                    StatusCode::TOO_MANY_REQUESTS,
                    [
                        ("X-RateLimit-Limit", limit.to_string()),
                        ("X-RateLimit-Remaining", remaining.to_string()),
                        ("X-RateLimit-Reset", reset.to_string()),
                        ("Retry-After", retry_after.to_string()),
                    ],
                    body,
                )
                    .into_response()
            }
            _ => {
                let (status, code) = match &self {
                    ApiError::BranchNotFound(_) => (StatusCode::NOT_FOUND, "BRANCH_NOT_FOUND"),
                    ApiError::ClientNotFound(_) => (StatusCode::NOT_FOUND, "CLIENT_NOT_FOUND"),
                    ApiError::UserNotFound(_) => (StatusCode::NOT_FOUND, "USER_NOT_FOUND"),
                    ApiError::SnapshotNotFound { .. } => {
                        (StatusCode::NOT_FOUND, "SNAPSHOT_NOT_FOUND")
                    }
                    ApiError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
                    ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
                    ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
                    ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                    ApiError::AggregationInProgress(_) => {
                        (StatusCode::CONFLICT, "AGGREGATION_IN_PROGRESS")
                    }
                    ApiError::RateLimitExceeded { .. } => unreachable!(),
                };

                let body = Json(ErrorResponse {
                    error: self.to_string(),
                    code: code.to_string(),
                });

                (status, body).into_response()
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("row not found".to_string()),
            other => ApiError::Database(other.to_string()),
        }
    }
}
