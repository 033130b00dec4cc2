use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use herald_cache::DedupCache;
use herald_common::internal;
use herald_store::{Message, MessageStore};

use super::{CycleSummary, MessageSender, SendOutcome};
use crate::{
    client::DeliveryClient,
    error::{DeliveryError, SystemError},
    snapshot::SentMessages,
};

/// Sends batches of unsent messages one at a time.
///
/// For each message: skip if already sent or cache-marked, deliver, mark sent
/// in the store, then write the dedup mark. The mark is only written after the
/// store accepted the update. A crash between those two steps leaves the
/// message sent in the store without a mark, which is harmless; a crash
/// between delivery and the store update means the next cycle delivers it
/// again.
#[derive(Debug, Clone)]
pub struct BatchSender {
    store: Arc<dyn MessageStore>,
    client: Arc<dyn DeliveryClient>,
    cache: DedupCache,
    sent: SentMessages,
}

impl BatchSender {
    #[must_use]
    pub fn new(
        store: Arc<dyn MessageStore>,
        client: Arc<dyn DeliveryClient>,
        cache: DedupCache,
    ) -> Self {
        let sent = SentMessages::new(Arc::clone(&store), cache.clone());

        Self {
            store,
            client,
            cache,
            sent,
        }
    }

    /// The sent-messages read path backed by the same store and cache.
    #[must_use]
    pub const fn sent_messages(&self) -> &SentMessages {
        &self.sent
    }

    fn report_failure(message: &Message, error: &DeliveryError) {
        if error.is_system() {
            internal!(
                level = ERROR,
                message_id = %message.id,
                error = %error,
                "Message delivery could not be completed"
            );
        } else {
            internal!(
                level = WARN,
                message_id = %message.id,
                rate_limited = error.is_rate_limited(),
                error = %error,
                "Message delivery failed, will retry next cycle"
            );
        }
    }
}

#[async_trait]
impl MessageSender for BatchSender {
    async fn send_messages(&self, batch_size: usize) -> Result<CycleSummary, DeliveryError> {
        let mut summary = CycleSummary::default();

        if batch_size == 0 {
            internal!(level = DEBUG, "Batch size is zero, nothing to do");
            return Ok(summary);
        }

        let mut messages = self
            .store
            .get_unsent_messages(batch_size)
            .await
            .map_err(SystemError::Fetch)?;
        messages.truncate(batch_size);
        summary.fetched = messages.len();

        if messages.is_empty() {
            internal!(level = DEBUG, "No unsent messages");
            return Ok(summary);
        }

        let mut seen = HashSet::with_capacity(messages.len());

        for message in &messages {
            if !seen.insert(message.id) {
                internal!(
                    level = WARN,
                    message_id = %message.id,
                    "Message appeared twice in one batch, skipping duplicate"
                );
                summary.skipped += 1;
                continue;
            }

            match self.send_message(message).await {
                Ok(SendOutcome::Delivered { .. }) => summary.delivered += 1,
                Ok(SendOutcome::AlreadySent) => summary.skipped += 1,
                Err(e) => {
                    Self::report_failure(message, &e);
                    summary.failed += 1;
                }
            }
        }

        if summary.delivered > 0
            && let Err(e) = self.sent.refresh().await
        {
            internal!(
                level = WARN,
                error = %e,
                "Unable to rebuild sent-messages snapshot, it will be rebuilt on next read"
            );
        }

        internal!(
            level = INFO,
            fetched = summary.fetched,
            delivered = summary.delivered,
            skipped = summary.skipped,
            failed = summary.failed,
            "Delivery cycle complete"
        );

        Ok(summary)
    }

    async fn send_message(&self, message: &Message) -> Result<SendOutcome, DeliveryError> {
        if message.sent {
            internal!(level = DEBUG, message_id = %message.id, "Message already marked sent");
            return Ok(SendOutcome::AlreadySent);
        }

        if self.cache.is_delivered(message.id).await {
            internal!(
                level = WARN,
                message_id = %message.id,
                "Message has a delivery mark, skipping"
            );
            return Ok(SendOutcome::AlreadySent);
        }

        let receipt = self.client.deliver(message).await?;

        self.store
            .update_message_sent(message.id, Some(&receipt.message_id))
            .await
            .map_err(|source| SystemError::Persistence {
                id: message.id,
                source,
            })?;

        self.cache.record_delivery(message.id, Utc::now()).await;

        internal!(
            level = INFO,
            message_id = %message.id,
            delivery_ref = %receipt.message_id,
            "Message delivered"
        );

        Ok(SendOutcome::Delivered {
            delivery_ref: receipt.message_id,
        })
    }
}
