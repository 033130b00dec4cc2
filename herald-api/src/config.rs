//! Control API configuration

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the HTTP control surface
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Enable or disable the API server
    ///
    /// When disabled the scheduler can still autostart, but nothing can
    /// control it at runtime.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Address to bind the API server
    ///
    /// Common values:
    /// - `[::]:8080` (IPv6 any address, port 8080)
    /// - `0.0.0.0:8080` (IPv4 any address, port 8080)
    /// - `127.0.0.1:8080` (localhost only, port 8080)
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Upper bound on a single request, in seconds
    ///
    /// A manual send waits for the webhook, so this should exceed the
    /// webhook timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

const fn default_enabled() -> bool {
    true
}

fn default_listen_address() -> String {
    "[::]:8080".to_string()
}

const fn default_request_timeout_secs() -> u64 {
    60
}

impl ApiConfig {
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            listen_address: default_listen_address(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}
