//! Read path for the sent-messages listing.
//!
//! The listing is served from the cached snapshot when one is present and
//! rebuilt from the store otherwise. Rebuilding also re-caches the result.

use std::sync::Arc;

use herald_cache::DedupCache;
use herald_common::internal;
use herald_store::{Message, MessageStore, StoreError};

#[derive(Debug, Clone)]
pub struct SentMessages {
    store: Arc<dyn MessageStore>,
    cache: DedupCache,
}

impl SentMessages {
    #[must_use]
    pub fn new(store: Arc<dyn MessageStore>, cache: DedupCache) -> Self {
        Self { store, cache }
    }

    /// Cached snapshot if available, otherwise a fresh one.
    ///
    /// # Errors
    /// Fails only when the snapshot must be rebuilt and the store cannot be
    /// read.
    pub async fn load(&self) -> Result<Vec<Message>, StoreError> {
        if let Some(messages) = self.cache.sent_snapshot().await {
            internal!(count = messages.len(), "Serving sent messages from cache");
            return Ok(messages);
        }

        internal!(level = DEBUG, "Sent-messages snapshot missing, rebuilding");
        self.refresh().await
    }

    /// Rebuild the snapshot from the store and overwrite the cached copy.
    /// A cache write failure is logged and otherwise ignored.
    ///
    /// # Errors
    /// Fails when the store cannot list sent messages.
    pub async fn refresh(&self) -> Result<Vec<Message>, StoreError> {
        let messages = self.store.get_sent_messages().await?;
        self.cache.store_sent_snapshot(&messages).await;

        Ok(messages)
    }
}
