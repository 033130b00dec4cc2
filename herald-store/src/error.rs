//! Error types for the herald-store crate.

use thiserror::Error;

use crate::MessageId;

/// Top-level store error type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No message with this id exists.
    #[error("Message not found: {0}")]
    NotFound(MessageId),

    /// The database rejected or failed a statement.
    #[error("Database error: {0}")]
    Database(String),

    /// A stored row could not be turned back into a message.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (lock poisoning, etc.).
    #[error("Internal error: {0}")]
    Internal(String),

    /// The store refuses new messages.
    #[error("Message store capacity exceeded: limit {limit}")]
    Capacity { limit: usize },
}

impl StoreError {
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Specialized `Result` type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::Internal(format!("Lock poisoned: {e}"))
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for StoreError {
    fn from(e: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Self::Database(e.to_string())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_id() {
        let id = MessageId::new(12).unwrap();
        let err = StoreError::NotFound(id);

        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Message not found: 12");
    }

    #[test]
    fn poisoned_lock_is_internal() {
        let lock = std::sync::Mutex::new(());
        let poisoned = std::thread::scope(|s| {
            s.spawn(|| {
                let _guard = lock.lock().unwrap();
                panic!("poison");
            })
            .join()
            .ok();
            lock.lock().map(|_| ()).map_err(StoreError::from)
        });

        assert!(matches!(poisoned, Err(StoreError::Internal(_))));
    }
}
