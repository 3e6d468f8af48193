//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::services::rate_limiter::{
    RATE_LIMIT_LIMIT_HEADER, RATE_LIMIT_REMAINING_HEADER, RATE_LIMIT_RESET_HEADER,
};

/// Application-wide error type.
///
/// Every failure on the API v1 path resolves to one of these variants, and
/// each variant maps to exactly one HTTP status and machine-readable code.
///
/// # Error Categories
///
/// - **Identity**: missing, malformed, unknown, disabled or expired API keys (401)
/// - **Capability**: missing scope (403) or missing location (400)
/// - **Quota**: per-key hourly limit exhausted (429)
/// - **Internal**: store failures and handler crashes (500, details hidden)
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The credential is missing, malformed, unknown, disabled or expired.
    ///
    /// Malformed and unknown keys share the same message so callers cannot
    /// tell which check rejected them.
    #[error("{0}")]
    Unauthorized(String),

    /// The key is valid but lacks the capability the route requires.
    #[error("{0}")]
    Forbidden(String),

    /// Request parameters are invalid.
    #[error("{0}")]
    BadRequest(String),

    /// Requested resource does not exist within the caller's tenant/location.
    #[error("{0}")]
    NotFound(String),

    /// The key has used up its hourly quota.
    #[error(
        "Rate limit exceeded. Limit: {limit} requests per hour. Resets at {}",
        format_reset(.reset_at_ms)
    )]
    RateLimited { limit: u32, reset_at_ms: i64 },

    /// The rate limit counter store failed while enforcement is fail-closed.
    #[error("Rate limit store error: {0}")]
    RateLimitStore(String),

    /// Anything else that should surface as a generic 500.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Forbidden(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AppError::Internal(message.into())
    }

    /// HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Database(_) | AppError::RateLimitStore(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Machine-readable code placed in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            AppError::Database(_) | AppError::RateLimitStore(_) | AppError::Internal(_) => {
                "INTERNAL_ERROR"
            }
        }
    }
}

fn format_reset(reset_at_ms: &i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(*reset_at_ms)
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| reset_at_ms.to_string())
}

/// JSON body returned on every failure path.
///
/// ```json
/// { "error": "API key is disabled", "code": "UNAUTHORIZED" }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Convert AppError into an HTTP response.
///
/// Internal variants are logged with full detail here and reported to the
/// client as `An internal error occurred`.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let (message, details) = match &self {
            AppError::Database(_) | AppError::RateLimitStore(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "Request failed with internal error");
                ("An internal error occurred".to_string(), None)
            }
            AppError::RateLimited { reset_at_ms, .. } => {
                (self.to_string(), Some(format_reset(reset_at_ms)))
            }
            _ => (self.to_string(), None),
        };

        let mut response = (
            status,
            Json(ErrorBody {
                error: message,
                code,
                details,
            }),
        )
            .into_response();

        if let AppError::RateLimited { limit, reset_at_ms } = self {
            let retry_after_secs = (reset_at_ms - Utc::now().timestamp_millis()).max(0) / 1000 + 1;
            let headers = response.headers_mut();
            headers.insert(RATE_LIMIT_LIMIT_HEADER, HeaderValue::from(limit));
            headers.insert(RATE_LIMIT_REMAINING_HEADER, HeaderValue::from(0u32));
            headers.insert(RATE_LIMIT_RESET_HEADER, HeaderValue::from(reset_at_ms));
            headers.insert("retry-after", HeaderValue::from(retry_after_secs));
        }

        response
    }
}
