//! Delivery cycles and the per-message send protocol.

mod batch;

use async_trait::async_trait;
use herald_store::Message;
use serde::Serialize;

pub use batch::BatchSender;

use crate::error::DeliveryError;

/// Result of running the send protocol for one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SendOutcome {
    /// Accepted by the endpoint and recorded as sent.
    Delivered { delivery_ref: String },
    /// Skipped: the store or the dedup cache already knows it was sent.
    AlreadySent,
}

/// Counters for one delivery cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub fetched: usize,
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Sending surface shared by the scheduler and manual single sends.
#[async_trait]
pub trait MessageSender: Send + Sync + std::fmt::Debug {
    /// Run one cycle over at most `batch_size` unsent messages.
    ///
    /// # Errors
    /// Only a failure to fetch the batch is returned. Per-message failures
    /// are logged and counted in the summary.
    async fn send_messages(&self, batch_size: usize) -> Result<CycleSummary, DeliveryError>;

    /// Deliver one message unless it is already known to be sent.
    ///
    /// # Errors
    /// Returns the delivery failure, or a persistence error when the endpoint
    /// accepted the message but the store could not record it.
    async fn send_message(&self, message: &Message) -> Result<SendOutcome, DeliveryError>;
}
