use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};
use serde::Deserialize;

use crate::error::{DeliveryError, SystemError};

const fn default_interval() -> u64 {
    120 // 2 minutes
}

const fn default_batch_size() -> usize {
    2
}

const fn default_message_ttl() -> u64 {
    86_400 // 24 hours
}

const fn default_snapshot_ttl() -> u64 {
    600 // 10 minutes
}

const fn default_timeout() -> u64 {
    30
}

fn default_auth_header() -> String {
    "x-ins-auth-key".to_string()
}

/// Scheduling and delivery settings.
///
/// ```ron
/// Herald (
///     delivery: (
///         interval_secs: 120,
///         batch_size: 2,
///         autostart: true,
///         webhook: (
///             url: "https://hooks.example.com/deliver",
///             auth_key: "secret",
///         ),
///     ),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeliveryConfig {
    /// Seconds between scheduled cycles
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Maximum unsent messages fetched per cycle
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Start the scheduler as soon as the process is up
    #[serde(default)]
    pub autostart: bool,

    /// Lifetime of a per-message dedup entry (seconds)
    #[serde(default = "default_message_ttl")]
    pub message_ttl_secs: u64,

    /// Lifetime of the cached sent-messages snapshot (seconds)
    #[serde(default = "default_snapshot_ttl")]
    pub snapshot_ttl_secs: u64,

    #[serde(default)]
    pub webhook: WebhookConfig,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            batch_size: default_batch_size(),
            autostart: false,
            message_ttl_secs: default_message_ttl(),
            snapshot_ttl_secs: default_snapshot_ttl(),
            webhook: WebhookConfig::default(),
        }
    }
}

impl DeliveryConfig {
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    #[must_use]
    pub const fn message_ttl(&self) -> Duration {
        Duration::from_secs(self.message_ttl_secs)
    }

    #[must_use]
    pub const fn snapshot_ttl(&self) -> Duration {
        Duration::from_secs(self.snapshot_ttl_secs)
    }

    /// Reject settings the scheduler or client cannot run with.
    ///
    /// # Errors
    /// Returns a configuration error naming the first offending field.
    pub fn validate(&self) -> Result<(), DeliveryError> {
        if self.batch_size == 0 {
            return Err(configuration("delivery.batch_size must be greater than zero"));
        }

        if self.interval_secs == 0 {
            return Err(configuration("delivery.interval_secs must be greater than zero"));
        }

        self.webhook.validate()
    }
}

/// Outbound endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub url: String,

    /// Static secret sent with every request
    #[serde(default)]
    pub auth_key: String,

    /// Header carrying `auth_key`
    #[serde(default = "default_auth_header")]
    pub auth_header: String,

    /// Whole-request timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            auth_key: String::new(),
            auth_header: default_auth_header(),
            timeout_secs: default_timeout(),
        }
    }
}

impl WebhookConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub(crate) fn endpoint(&self) -> Result<reqwest::Url, DeliveryError> {
        let url = reqwest::Url::parse(&self.url).map_err(|e| {
            configuration(format!("delivery.webhook.url {:?} is invalid: {e}", self.url))
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(configuration(format!(
                "delivery.webhook.url must be http or https, not {scheme}"
            ))),
        }
    }

    pub(crate) fn auth(&self) -> Result<(HeaderName, HeaderValue), DeliveryError> {
        let name = HeaderName::from_bytes(self.auth_header.as_bytes()).map_err(|e| {
            configuration(format!(
                "delivery.webhook.auth_header {:?} is invalid: {e}",
                self.auth_header
            ))
        })?;

        let mut value = HeaderValue::from_str(&self.auth_key)
            .map_err(|e| configuration(format!("delivery.webhook.auth_key is invalid: {e}")))?;
        value.set_sensitive(true);

        Ok((name, value))
    }

    /// # Errors
    /// Fails when the URL or the auth header cannot be used.
    pub fn validate(&self) -> Result<(), DeliveryError> {
        self.endpoint()?;
        self.auth()?;
        Ok(())
    }
}

fn configuration(reason: impl Into<String>) -> DeliveryError {
    SystemError::Configuration(reason.into()).into()
}
