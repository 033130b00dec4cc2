use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

/// Minimal key-value capability the delivery core relies on.
///
/// Values are opaque strings. A `ttl` of `None` keeps the entry until it is
/// deleted explicitly.
#[async_trait]
pub trait CacheStore: Send + Sync + std::fmt::Debug {
    async fn exists(&self, key: &str) -> Result<bool>;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Remove the given keys, returning how many were present.
    async fn delete(&self, keys: &[String]) -> Result<usize>;

    /// Keys matching a glob `pattern` (`*` and `?` wildcards).
    async fn list_keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// `false` for backends that never hold data.
    fn is_enabled(&self) -> bool {
        true
    }
}
