use std::{path::PathBuf, sync::Arc};

use serde::Deserialize;

use crate::{MemoryMessageStore, SqliteMessageStore, r#trait::MessageStore};

/// Which message store backs the process.
///
/// # Examples
///
/// SQLite file (production):
/// ```ron
/// Herald (
///     store: Sqlite (
///         path: "/var/lib/herald/messages.db",
///     ),
/// )
/// ```
///
/// In-memory, optionally bounded:
/// ```ron
/// Herald (
///     store: Memory (
///         capacity: Some(1000),
///     ),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum StoreConfig {
    Memory {
        /// Maximum number of messages to hold (omit for unlimited)
        #[serde(default)]
        capacity: Option<usize>,
    },
    Sqlite {
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,
    },
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("/var/lib/herald/messages.db")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

impl StoreConfig {
    /// Build the configured store.
    ///
    /// # Errors
    /// Returns an error if the SQLite database cannot be opened.
    pub async fn into_store(self) -> crate::Result<Arc<dyn MessageStore>> {
        Ok(match self {
            Self::Memory { capacity: None } => Arc::new(MemoryMessageStore::new()),
            Self::Memory {
                capacity: Some(capacity),
            } => Arc::new(MemoryMessageStore::with_capacity(capacity)),
            Self::Sqlite { path } => Arc::new(SqliteMessageStore::open(path).await?),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_both_variants() {
        let memory: StoreConfig = ron::from_str("Memory(capacity: Some(10))").unwrap();
        assert_eq!(memory, StoreConfig::Memory { capacity: Some(10) });

        let unbounded: StoreConfig = ron::from_str("Memory(capacity: None)").unwrap();
        assert_eq!(unbounded, StoreConfig::Memory { capacity: None });

        let sqlite: StoreConfig = ron::from_str(r#"Sqlite(path: "/tmp/h.db")"#).unwrap();
        assert_eq!(
            sqlite,
            StoreConfig::Sqlite {
                path: PathBuf::from("/tmp/h.db")
            }
        );
    }

    #[tokio::test]
    async fn memory_config_builds_a_bounded_store() {
        let store = StoreConfig::Memory { capacity: Some(0) }
            .into_store()
            .await
            .unwrap();

        let err = store
            .create_message(crate::NewMessage::new("x", "+1"))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::StoreError::Capacity { limit: 0 }));
    }
}
