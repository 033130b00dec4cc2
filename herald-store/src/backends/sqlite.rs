use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use herald_common::internal;

use crate::{Message, MessageId, NewMessage, StoreError, r#trait::MessageStore};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        content TEXT NOT NULL,
        recipient_address TEXT NOT NULL,
        sent INTEGER NOT NULL DEFAULT 0,
        sent_at TEXT,
        delivery_ref TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_messages_unsent ON messages(sent, id);
";

const COLUMNS: &str =
    "id, content, recipient_address, sent, sent_at, delivery_ref, created_at, updated_at";

/// A row as SQLite hands it back, before timestamps and ids are validated.
struct Row {
    id: i64,
    content: String,
    recipient_address: String,
    sent: bool,
    sent_at: Option<String>,
    delivery_ref: Option<String>,
    created_at: String,
    updated_at: String,
}

impl Row {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            content: row.get(1)?,
            recipient_address: row.get(2)?,
            sent: row.get(3)?,
            sent_at: row.get(4)?,
            delivery_ref: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_message(self) -> crate::Result<Message> {
        let id = u64::try_from(self.id)
            .ok()
            .and_then(MessageId::new)
            .ok_or_else(|| StoreError::Serialization(format!("Invalid message id {}", self.id)))?;

        Ok(Message {
            id,
            content: self.content,
            recipient_address: self.recipient_address,
            sent: self.sent,
            sent_at: self.sent_at.as_deref().map(parse_timestamp).transpose()?,
            delivery_ref: self.delivery_ref,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(raw: &str) -> crate::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| StoreError::Serialization(format!("Invalid timestamp {raw:?}: {e}")))
}

fn sql_id(id: MessageId) -> crate::Result<i64> {
    i64::try_from(id.get())
        .map_err(|_| StoreError::Serialization(format!("Message id {id} out of range")))
}

/// SQLite-backed message store.
///
/// All statements run on the single background thread owned by the
/// `tokio_rusqlite` connection, so writes are serialised without extra locking.
#[derive(Clone)]
pub struct SqliteMessageStore {
    conn: tokio_rusqlite::Connection,
}

impl std::fmt::Debug for SqliteMessageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteMessageStore").finish_non_exhaustive()
    }
}

impl SqliteMessageStore {
    /// Open (or create) the database at `path` and apply the schema.
    ///
    /// # Errors
    /// Fails if the parent directory cannot be created or the database cannot
    /// be opened.
    pub async fn open(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::Database(format!("Unable to create {}: {e}", parent.display()))
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let store = Self { conn };
        store.migrate(true).await?;

        internal!(level = INFO, path = %path.display(), "Opened SQLite message store");

        Ok(store)
    }

    /// A private in-memory database, mostly for tests.
    ///
    /// # Errors
    /// Fails if SQLite cannot allocate the database.
    pub async fn open_in_memory() -> crate::Result<Self> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let store = Self { conn };
        store.migrate(false).await?;

        Ok(store)
    }

    async fn migrate(&self, wal: bool) -> crate::Result<()> {
        self.conn
            .call(move |conn| -> rusqlite::Result<()> {
                if wal {
                    conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
                }
                conn.execute_batch(SCHEMA)
            })
            .await?;

        Ok(())
    }

    async fn select(&self, sql: String, limit: Option<i64>) -> crate::Result<Vec<Message>> {
        let rows = self
            .conn
            .call(move |conn| -> rusqlite::Result<Vec<Row>> {
                let mut stmt = conn.prepare(&sql)?;
                let rows = match limit {
                    Some(limit) => stmt.query_map([limit], Row::read)?,
                    None => stmt.query_map([], Row::read)?,
                };
                rows.collect()
            })
            .await?;

        rows.into_iter().map(Row::into_message).collect()
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn get_unsent_messages(&self, limit: usize) -> crate::Result<Vec<Message>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.select(
            format!("SELECT {COLUMNS} FROM messages WHERE sent = 0 ORDER BY id LIMIT ?1"),
            Some(limit),
        )
        .await
    }

    async fn update_message_sent(
        &self,
        id: MessageId,
        delivery_ref: Option<&str>,
    ) -> crate::Result<()> {
        let key = sql_id(id)?;
        let now = timestamp(Utc::now());
        let delivery_ref = delivery_ref.map(ToOwned::to_owned);

        // Re-marking keeps the first sent_at and reference.
        let changed = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE messages SET \
                         sent = 1, \
                         sent_at = COALESCE(sent_at, ?1), \
                         delivery_ref = CASE WHEN sent = 1 THEN delivery_ref ELSE ?2 END, \
                         updated_at = CASE WHEN sent = 1 THEN updated_at ELSE ?1 END \
                     WHERE id = ?3",
                    rusqlite::params![now, delivery_ref, key],
                )
            })
            .await?;

        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }

        Ok(())
    }

    async fn get_sent_messages(&self) -> crate::Result<Vec<Message>> {
        self.select(
            format!("SELECT {COLUMNS} FROM messages WHERE sent = 1 ORDER BY id"),
            None,
        )
        .await
    }

    async fn get_message(&self, id: MessageId) -> crate::Result<Message> {
        let key = sql_id(id)?;

        let row = self
            .conn
            .call(move |conn| -> rusqlite::Result<Option<Row>> {
                let mut stmt =
                    conn.prepare(&format!("SELECT {COLUMNS} FROM messages WHERE id = ?1"))?;
                let mut rows = stmt.query_map([key], Row::read)?;
                rows.next().transpose()
            })
            .await?;

        row.ok_or(StoreError::NotFound(id))?.into_message()
    }

    async fn create_message(&self, message: NewMessage) -> crate::Result<Message> {
        let now = Utc::now();
        let stamp = timestamp(now);
        let NewMessage {
            content,
            recipient_address,
        } = message.clone();

        let rowid = self
            .conn
            .call(move |conn| -> rusqlite::Result<i64> {
                conn.execute(
                    "INSERT INTO messages (content, recipient_address, sent, created_at, updated_at) \
                     VALUES (?1, ?2, 0, ?3, ?3)",
                    rusqlite::params![content, recipient_address, stamp],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        let id = u64::try_from(rowid)
            .ok()
            .and_then(MessageId::new)
            .ok_or_else(|| StoreError::Database(format!("Unexpected row id {rowid}")))?;

        // Round-trip the timestamp so the returned value matches later reads.
        Ok(Message::unsent(id, message, parse_timestamp(&timestamp(now))?))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn created_message_reads_back_identically() {
        let store = SqliteMessageStore::open_in_memory().await.unwrap();

        let created = store
            .create_message(NewMessage::new("hello", "+905551111111"))
            .await
            .unwrap();
        let fetched = store.get_message(created.id).await.unwrap();

        assert_eq!(created, fetched);
        assert_eq!(created.id.get(), 1);
    }

    #[tokio::test]
    async fn remarking_keeps_first_reference() {
        let store = SqliteMessageStore::open_in_memory().await.unwrap();
        let created = store
            .create_message(NewMessage::new("hello", "+1"))
            .await
            .unwrap();

        store
            .update_message_sent(created.id, Some("first"))
            .await
            .unwrap();
        let first = store.get_message(created.id).await.unwrap();

        store
            .update_message_sent(created.id, Some("second"))
            .await
            .unwrap();
        let second = store.get_message(created.id).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second.delivery_ref.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn reopening_a_file_keeps_messages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("messages.db");

        let id = {
            let store = SqliteMessageStore::open(&path).await.unwrap();
            store
                .create_message(NewMessage::new("persisted", "+1"))
                .await
                .unwrap()
                .id
        };

        let store = SqliteMessageStore::open(&path).await.unwrap();
        assert_eq!(store.get_message(id).await.unwrap().content, "persisted");
    }
}
