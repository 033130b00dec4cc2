//! Cache key layout shared by the sender, the read path and the control API.

use herald_store::MessageId;

/// Prefix for per-message delivery marks (`message:<id>`).
pub const MESSAGE_PREFIX: &str = "message:";

/// Glob selecting every per-message delivery mark.
pub const MESSAGE_PATTERN: &str = "message:*";

/// Serialized snapshot of every sent message.
pub const SENT_MESSAGES: &str = "messages:sent";

/// Operator-visible scheduler flag.
pub const SCHEDULER_STATE: &str = "scheduler:state";

pub const SCHEDULER_RUNNING: &str = "running";

#[must_use]
pub fn message_key(id: MessageId) -> String {
    format!("{MESSAGE_PREFIX}{id}")
}

/// Recover the id from a `message:<id>` key.
#[must_use]
pub fn parse_message_key(key: &str) -> Option<MessageId> {
    key.strip_prefix(MESSAGE_PREFIX)?.parse().ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::pattern::matches;

    #[test]
    fn message_keys_round_trip() {
        let id = MessageId::new(31).unwrap_or_else(|| unreachable!());
        assert_eq!(message_key(id), "message:31");
        assert_eq!(parse_message_key("message:31"), Some(id));
    }

    #[test]
    fn only_message_keys_parse() {
        assert_eq!(parse_message_key(SENT_MESSAGES), None);
        assert_eq!(parse_message_key(SCHEDULER_STATE), None);
        assert_eq!(parse_message_key("message:0"), None);
        assert_eq!(parse_message_key("message:abc"), None);
    }

    #[test]
    fn message_pattern_excludes_the_snapshot() {
        assert!(matches(MESSAGE_PATTERN, "message:1"));
        assert!(!matches(MESSAGE_PATTERN, SENT_MESSAGES));
    }
}
