use async_trait::async_trait;

use crate::{Message, MessageId, NewMessage, Result};

/// Persistent record of every message and its delivery state.
///
/// Implementations must be safe to share between the scheduler's background
/// task and request handlers; callers do no additional synchronisation.
#[async_trait]
pub trait MessageStore: Send + Sync + std::fmt::Debug {
    /// Return at most `limit` messages that have not been sent. Order is
    /// implementation-defined.
    async fn get_unsent_messages(&self, limit: usize) -> Result<Vec<Message>>;

    /// Mark `id` as sent, stamping `sent_at` and `updated_at`.
    ///
    /// # Errors
    /// Returns [`crate::StoreError::NotFound`] for an unknown id. Marking an
    /// already-sent message succeeds and leaves its first `sent_at` intact.
    async fn update_message_sent(&self, id: MessageId, delivery_ref: Option<&str>) -> Result<()>;

    /// Every message currently marked sent.
    async fn get_sent_messages(&self) -> Result<Vec<Message>>;

    async fn get_message(&self, id: MessageId) -> Result<Message>;

    async fn create_message(&self, message: NewMessage) -> Result<Message>;
}
