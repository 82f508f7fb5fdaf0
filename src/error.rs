use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::metrics::STORE_ERRORS;
use crate::store::StoreError;

// Everything a request can fail with, mapped to a status code below
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // malformed body or query, rejected before touching the store
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    // limiter backend down and the failure policy is closed
    #[error("rate limiter unavailable: {0}")]
    LimiterUnavailable(StoreError),

    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "detail": detail })),
            )
                .into_response(),
            AppError::RateLimited { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after_secs.to_string())],
                Json(json!({ "detail": "Too Many Requests" })),
            )
                .into_response(),
            AppError::LimiterUnavailable(e) => {
                error!(error = %e, "rate limiter backend unavailable, rejecting request");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "detail": "Rate limiter unavailable" })),
                )
                    .into_response()
            }
            AppError::Store(e) => {
                STORE_ERRORS.inc();
                error!(error = %e, "store call failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "detail": "Storage unavailable" })),
                )
                    .into_response()
            }
            AppError::Internal(msg) => {
                error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": "Internal Server Error" })),
                )
                    .into_response()
            }
        }
    }
}
