pub mod client;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod sender;
pub mod snapshot;

pub use client::{DeliveryClient, DeliveryReceipt, WebhookClient};
pub use config::{DeliveryConfig, WebhookConfig};
pub use error::{DeliveryError, RejectedError, SchedulerError, SystemError, TemporaryError};
pub use scheduler::Scheduler;
pub use sender::{BatchSender, CycleSummary, MessageSender, SendOutcome};
pub use snapshot::SentMessages;
