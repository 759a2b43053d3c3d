//! Errors surfaced by the HTTP entry point.
//!
//! Individual request failures never appear here; they are recorded in the
//! aggregate response. These are request- and aggregation-level outcomes only.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Aggregation-level error.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request body could not be parsed.
    #[error("invalid request body: {0}")]
    InvalidRequest(String),

    /// More URLs than the configured limit.
    #[error("{count} URLs requested, at most {max} allowed")]
    TooManyUrls { count: usize, max: usize },

    /// The overall deadline elapsed before every request settled.
    #[error("aggregation did not complete within {}s", .0.as_secs())]
    DeadlineExceeded(Duration),

    /// The task was dropped without delivering a result.
    #[error("aggregation was abandoned before completion")]
    Abandoned,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

impl ApiError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidRequest(_) => "INVALID_REQUEST",
            ApiError::TooManyUrls { .. } => "TOO_MANY_URLS",
            ApiError::DeadlineExceeded(_) => "DEADLINE_EXCEEDED",
            ApiError::Abandoned => "ABANDONED",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) | ApiError::TooManyUrls { .. } => StatusCode::BAD_REQUEST,
            ApiError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Abandoned => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message: self.to_string(),
            },
        };
        (self.status(), axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::InvalidRequest("expected a list".to_string())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::TooManyUrls { count: 3, max: 2 }.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::DeadlineExceeded(Duration::from_secs(5))
                .into_response()
                .status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(ApiError::Abandoned.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            ApiError::TooManyUrls { count: 3, max: 2 }.to_string(),
            "3 URLs requested, at most 2 allowed"
        );
        assert_eq!(
            ApiError::DeadlineExceeded(Duration::from_secs(5)).to_string(),
            "aggregation did not complete within 5s"
        );
    }
}
