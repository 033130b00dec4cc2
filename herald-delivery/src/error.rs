//! Typed error handling for delivery operations.
//!
//! Failures are grouped by what they say about the outbound attempt:
//! - Temporary failures (rate limiting, transport trouble, 5xx) clear up on their own
//! - Rejected deliveries mean the endpoint answered but not with a success
//! - System errors are problems on our side (store, configuration)
//!
//! None of them is retried in place. A message that fails stays unsent and is
//! picked up again by a later cycle.

use herald_store::{MessageId, StoreError};
use thiserror::Error;

/// Top-level delivery error type.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Temporary failure: {0}")]
    Temporary(#[from] TemporaryError),

    #[error("Delivery rejected: {0}")]
    Rejected(#[from] RejectedError),

    #[error("System error: {0}")]
    System(#[from] SystemError),
}

/// Failures expected to succeed on a later attempt.
#[derive(Debug, Error)]
pub enum TemporaryError {
    /// The endpoint answered 429.
    #[error("Rate limited by delivery endpoint{}", retry_hint(.retry_after))]
    RateLimited { retry_after: Option<u64> },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The endpoint answered with a 5xx status.
    #[error("Endpoint error {status}: {body}")]
    ServerError { status: u16, body: String },
}

fn retry_hint(retry_after: &Option<u64>) -> String {
    retry_after.map_or_else(String::new, |secs| format!(" (retry after {secs}s)"))
}

/// The endpoint answered, but not with an accepted delivery.
#[derive(Debug, Error)]
pub enum RejectedError {
    #[error("Unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// A success status whose body could not be decoded.
    #[error("Invalid response body: {0}")]
    InvalidResponse(String),
}

/// Internal problems unrelated to the endpoint's answer.
#[derive(Debug, Error)]
pub enum SystemError {
    /// Unsent messages could not be read; aborts the current cycle.
    #[error("Unable to fetch unsent messages: {0}")]
    Fetch(#[source] StoreError),

    /// Delivered, but the store refused to record it.
    #[error("Message {id} was delivered but could not be marked sent: {source}")]
    Persistence {
        id: MessageId,
        #[source]
        source: StoreError,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeliveryError {
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Temporary(TemporaryError::RateLimited { .. }))
    }

    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }

    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    #[must_use]
    pub const fn is_system(&self) -> bool {
        matches!(self, Self::System(_))
    }

    /// Whether the endpoint may have accepted the message even though we
    /// report failure.
    #[must_use]
    pub const fn is_persistence(&self) -> bool {
        matches!(self, Self::System(SystemError::Persistence { .. }))
    }
}

impl From<reqwest::Error> for DeliveryError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Temporary(TemporaryError::Timeout(error.to_string()))
        } else if error.is_decode() {
            Self::Rejected(RejectedError::InvalidResponse(error.to_string()))
        } else if error.is_builder() {
            Self::System(SystemError::Configuration(error.to_string()))
        } else {
            Self::Temporary(TemporaryError::ConnectionFailed(error.to_string()))
        }
    }
}

/// Errors from scheduler lifecycle calls.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// `start` was called from outside a tokio runtime.
    #[error("Scheduler must be started from within a tokio runtime")]
    NoRuntime,
}
