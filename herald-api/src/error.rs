//! Control API error types

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use herald_cache::CacheError;
use herald_delivery::{DeliveryError, SchedulerError};
use herald_store::StoreError;
use serde::Serialize;
use thiserror::Error;

/// Errors that stop the API server itself
#[derive(Debug, Error)]
pub enum ApiError {
    /// Failed to bind to the specified address
    #[error("Failed to bind API server to {address}: {source}")]
    BindError {
        address: String,
        source: std::io::Error,
    },

    /// API server encountered a runtime error
    #[error("API server error: {0}")]
    ServerError(String),
}

/// A failed request, rendered as `{ "error": ..., "details": ... }`.
#[derive(Debug)]
pub struct RequestError {
    status: StatusCode,
    error: &'static str,
    details: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    details: &'a str,
}

impl RequestError {
    #[must_use]
    pub fn new(status: StatusCode, error: &'static str, details: impl Into<String>) -> Self {
        Self {
            status,
            error,
            details: details.into(),
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.error,
            details: &self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<StoreError> for RequestError {
    fn from(error: StoreError) -> Self {
        if error.is_not_found() {
            Self::new(StatusCode::NOT_FOUND, "Message not found", error.to_string())
        } else {
            Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Message store error",
                error.to_string(),
            )
        }
    }
}

impl From<DeliveryError> for RequestError {
    fn from(error: DeliveryError) -> Self {
        let (status, label) = if error.is_rate_limited() {
            (StatusCode::TOO_MANY_REQUESTS, "Rate limited")
        } else if error.is_system() {
            (StatusCode::INTERNAL_SERVER_ERROR, "Delivery failed")
        } else {
            (StatusCode::BAD_GATEWAY, "Delivery failed")
        };
        Self::new(status, label, error.to_string())
    }
}

impl From<SchedulerError> for RequestError {
    fn from(error: SchedulerError) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Scheduler error",
            error.to_string(),
        )
    }
}

impl From<CacheError> for RequestError {
    fn from(error: CacheError) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Cache unavailable",
            error.to_string(),
        )
    }
}
