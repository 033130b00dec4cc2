use std::{
    collections::BTreeMap,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use chrono::Utc;

use crate::{Message, MessageId, NewMessage, StoreError, r#trait::MessageStore};

#[derive(Debug, Default)]
struct Inner {
    messages: BTreeMap<MessageId, Message>,
    last_id: u64,
}

/// In-memory message store.
///
/// Messages live in a `BTreeMap` so unsent batches come back in id order.
/// Nothing survives a restart; use it for development and tests.
///
/// An optional capacity bounds the number of messages; inserts beyond it fail
/// with [`StoreError::Capacity`].
#[derive(Debug, Clone, Default)]
pub struct MemoryMessageStore {
    inner: Arc<RwLock<Inner>>,
    capacity: Option<usize>,
}

impl MemoryMessageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// Number of stored messages. Recovers the data if the lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .messages
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn get_unsent_messages(&self, limit: usize) -> crate::Result<Vec<Message>> {
        Ok(self
            .inner
            .read()?
            .messages
            .values()
            .filter(|message| !message.sent)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update_message_sent(
        &self,
        id: MessageId,
        delivery_ref: Option<&str>,
    ) -> crate::Result<()> {
        self.inner
            .write()?
            .messages
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?
            .mark_sent(delivery_ref, Utc::now());

        Ok(())
    }

    async fn get_sent_messages(&self) -> crate::Result<Vec<Message>> {
        Ok(self
            .inner
            .read()?
            .messages
            .values()
            .filter(|message| message.sent)
            .cloned()
            .collect())
    }

    async fn get_message(&self, id: MessageId) -> crate::Result<Message> {
        self.inner
            .read()?
            .messages
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn create_message(&self, message: NewMessage) -> crate::Result<Message> {
        let mut inner = self.inner.write()?;

        if let Some(limit) = self.capacity
            && inner.messages.len() >= limit
        {
            return Err(StoreError::Capacity { limit });
        }

        let id = inner
            .last_id
            .checked_add(1)
            .and_then(MessageId::new)
            .ok_or_else(|| StoreError::Internal("Message id space exhausted".to_string()))?;
        inner.last_id = id.get();

        let message = Message::unsent(id, message, Utc::now());
        inner.messages.insert(id, message.clone());

        Ok(message)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn ids_start_at_one_and_increase() {
        let store = MemoryMessageStore::new();

        let first = store.create_message(NewMessage::new("a", "+1")).await.unwrap();
        let second = store.create_message(NewMessage::new("b", "+2")).await.unwrap();

        assert_eq!(first.id.get(), 1);
        assert_eq!(second.id.get(), 2);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn capacity_limits_inserts() {
        let store = MemoryMessageStore::with_capacity(1);
        store.create_message(NewMessage::new("a", "+1")).await.unwrap();

        let err = store
            .create_message(NewMessage::new("b", "+2"))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Capacity { limit: 1 }));
        assert_eq!(store.capacity(), Some(1));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn unsent_batch_is_in_id_order() {
        let store = MemoryMessageStore::new();
        for n in 0..4 {
            store
                .create_message(NewMessage::new(format!("m{n}"), "+1"))
                .await
                .unwrap();
        }
        store
            .update_message_sent(MessageId::new(2).unwrap(), None)
            .await
            .unwrap();

        let ids: Vec<u64> = store
            .get_unsent_messages(10)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id.get())
            .collect();

        assert_eq!(ids, vec![1, 3, 4]);
    }
}
