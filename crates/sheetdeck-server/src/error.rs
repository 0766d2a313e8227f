use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use sheetdeck_core::error::AnalyticsError;

/// Application-level errors that map directly to HTTP responses.
///
/// Handlers return `Result<impl IntoResponse, AppError>`; the body is always
/// `{"error": {"code", "message", "field"}}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid period: {0:?}")]
    InvalidPeriod(String),

    #[error("rate limited")]
    RateLimited,

    #[error("request timed out")]
    Timeout,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<AnalyticsError> for AppError {
    fn from(err: AnalyticsError) -> Self {
        match err {
            AnalyticsError::InvalidPeriod(raw) => AppError::InvalidPeriod(raw),
            AnalyticsError::NotFound(what) => AppError::NotFound(what),
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, field) = match &self {
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("{what} not found"),
                None,
            ),
            AppError::InvalidPeriod(raw) => (
                StatusCode::BAD_REQUEST,
                "invalid_period",
                format!("unsupported period {raw:?}; expected one of 24h, 7d, 30d, 3m, 6m, 12m"),
                Some("period"),
            ),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "Rate limit exceeded".to_string(),
                None,
            ),
            AppError::Timeout => {
                tracing::warn!("request deadline exceeded");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "timeout",
                    "Request timed out".to_string(),
                    None,
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        (
            status,
            Json(json!({
                "error": {
                    "code": code,
                    "message": message,
                    "field": field
                }
            })),
        )
            .into_response()
    }
}
