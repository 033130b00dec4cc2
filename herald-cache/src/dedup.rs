//! Soft-fail facade over a [`CacheStore`].
//!
//! The delivery path never depends on the cache for correctness. Every
//! operation here logs a warning on backend failure and reports the result a
//! cache miss would have produced, so callers need no error handling of
//! their own.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, SecondsFormat, Utc};
use herald_common::internal;
use herald_store::{Message, MessageId};

use crate::{
    DisabledCache, Result,
    keys::{self, MESSAGE_PATTERN, SCHEDULER_RUNNING, SCHEDULER_STATE, SENT_MESSAGES},
    r#trait::CacheStore,
};

/// Lifetime of a per-message delivery mark.
pub const DEFAULT_MESSAGE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Lifetime of the aggregate sent-messages snapshot.
pub const DEFAULT_SNAPSHOT_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone)]
pub struct DedupCache {
    backend: Arc<dyn CacheStore>,
    message_ttl: Duration,
    snapshot_ttl: Duration,
}

impl DedupCache {
    #[must_use]
    pub fn new(backend: Arc<dyn CacheStore>) -> Self {
        Self {
            backend,
            message_ttl: DEFAULT_MESSAGE_TTL,
            snapshot_ttl: DEFAULT_SNAPSHOT_TTL,
        }
    }

    /// A facade whose every lookup misses.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Arc::new(DisabledCache))
    }

    #[must_use]
    pub const fn with_ttls(mut self, message_ttl: Duration, snapshot_ttl: Duration) -> Self {
        self.message_ttl = message_ttl;
        self.snapshot_ttl = snapshot_ttl;
        self
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.backend.is_enabled()
    }

    #[must_use]
    pub const fn backend(&self) -> &Arc<dyn CacheStore> {
        &self.backend
    }

    /// Whether a delivery mark exists for `id`. A failing backend counts as
    /// "not delivered".
    pub async fn is_delivered(&self, id: MessageId) -> bool {
        match self.backend.exists(&keys::message_key(id)).await {
            Ok(found) => found,
            Err(e) => {
                internal!(
                    level = WARN,
                    message_id = %id,
                    error = %e,
                    "Dedup lookup failed, treating message as undelivered"
                );
                false
            }
        }
    }

    /// Record that `id` was delivered at `at`. Returns `false` when the mark
    /// could not be written.
    pub async fn record_delivery(&self, id: MessageId, at: DateTime<Utc>) -> bool {
        let value = at.to_rfc3339_opts(SecondsFormat::Secs, true);

        match self
            .backend
            .set(&keys::message_key(id), &value, Some(self.message_ttl))
            .await
        {
            Ok(()) => true,
            Err(e) => {
                internal!(
                    level = WARN,
                    message_id = %id,
                    error = %e,
                    "Unable to cache delivery mark"
                );
                false
            }
        }
    }

    /// The cached sent-messages snapshot, or `None` on miss, backend failure
    /// or an undecodable value.
    pub async fn sent_snapshot(&self) -> Option<Vec<Message>> {
        let raw = match self.backend.get(SENT_MESSAGES).await {
            Ok(raw) => raw?,
            Err(e) => {
                internal!(level = WARN, error = %e, "Unable to read sent-messages snapshot");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(messages) => Some(messages),
            Err(e) => {
                internal!(level = WARN, error = %e, "Discarding undecodable sent-messages snapshot");
                None
            }
        }
    }

    /// Overwrite the snapshot. Returns `false` when it could not be written.
    pub async fn store_sent_snapshot(&self, messages: &[Message]) -> bool {
        match self.write_snapshot(messages).await {
            Ok(()) => true,
            Err(e) => {
                internal!(level = WARN, error = %e, "Unable to refresh sent-messages snapshot");
                false
            }
        }
    }

    async fn write_snapshot(&self, messages: &[Message]) -> Result<()> {
        let encoded = serde_json::to_string(messages)?;
        self.backend
            .set(SENT_MESSAGES, &encoded, Some(self.snapshot_ttl))
            .await
    }

    /// Remove every per-message delivery mark, leaving the snapshot and
    /// scheduler state alone.
    ///
    /// # Errors
    /// Propagates backend failures; this is an operator action rather than
    /// part of a delivery cycle.
    pub async fn clear_delivery_marks(&self) -> Result<usize> {
        let marks: Vec<String> = self
            .backend
            .list_keys(MESSAGE_PATTERN)
            .await?
            .into_iter()
            .filter(|key| keys::parse_message_key(key).is_some())
            .collect();

        if marks.is_empty() {
            return Ok(0);
        }

        let removed = self.backend.delete(&marks).await?;
        internal!(level = INFO, removed, "Cleared delivery marks");

        Ok(removed)
    }

    pub async fn mark_scheduler_running(&self) -> bool {
        match self
            .backend
            .set(SCHEDULER_STATE, SCHEDULER_RUNNING, None)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                internal!(level = WARN, error = %e, "Unable to record scheduler state");
                false
            }
        }
    }

    pub async fn clear_scheduler_state(&self) -> bool {
        match self.backend.delete(&[SCHEDULER_STATE.to_string()]).await {
            Ok(_) => true,
            Err(e) => {
                internal!(level = WARN, error = %e, "Unable to clear scheduler state");
                false
            }
        }
    }
}
