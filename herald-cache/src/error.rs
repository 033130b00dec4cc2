use thiserror::Error;

/// Failures reported by a cache backend.
///
/// Callers on the delivery path treat every variant as a soft failure.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend cannot serve the request right now (full, unreachable).
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// A cached value could not be encoded or decoded.
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal cache error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;
