use std::{fmt, num::NonZeroU64, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier for a stored message.
///
/// Ids are positive integers assigned by the store at creation time and never
/// change afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(NonZeroU64);

impl MessageId {
    /// Wrap a raw id, rejecting zero.
    #[must_use]
    pub const fn new(id: u64) -> Option<Self> {
        match NonZeroU64::new(id) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<NonZeroU64>().map(Self)
    }
}

impl From<NonZeroU64> for MessageId {
    fn from(id: NonZeroU64) -> Self {
        Self(id)
    }
}

/// A queued message and its delivery state.
///
/// `sent` and `sent_at` move together: a message is sent exactly when
/// `sent_at` is populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    pub recipient_address: String,
    pub sent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    /// Reference returned by the delivery endpoint, if one was recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    /// Build a fresh, unsent message as a store would on insert.
    #[must_use]
    pub fn unsent(id: MessageId, new: NewMessage, now: DateTime<Utc>) -> Self {
        Self {
            id,
            content: new.content,
            recipient_address: new.recipient_address,
            sent: false,
            sent_at: None,
            delivery_ref: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Transition to sent. Marking an already-sent message keeps the original
    /// timestamps and reference.
    pub fn mark_sent(&mut self, delivery_ref: Option<&str>, now: DateTime<Utc>) {
        if self.sent {
            return;
        }

        self.sent = true;
        self.sent_at = Some(now);
        self.delivery_ref = delivery_ref.map(ToOwned::to_owned);
        self.updated_at = now;
    }
}

/// Payload for creating a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub content: String,
    pub recipient_address: String,
}

impl NewMessage {
    pub fn new(content: impl Into<String>, recipient_address: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            recipient_address: recipient_address.into(),
        }
    }
}
