use std::time::Duration;

use async_trait::async_trait;

use crate::r#trait::CacheStore;

/// Cache that holds nothing. Every lookup misses and every write succeeds
/// without effect, so callers behave as if the cache were empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCache;

#[async_trait]
impl CacheStore for DisabledCache {
    async fn exists(&self, _key: &str) -> crate::Result<bool> {
        Ok(false)
    }

    async fn get(&self, _key: &str) -> crate::Result<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> crate::Result<()> {
        Ok(())
    }

    async fn delete(&self, _keys: &[String]) -> crate::Result<usize> {
        Ok(0)
    }

    async fn list_keys(&self, _pattern: &str) -> crate::Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_are_forgotten() {
        let cache = DisabledCache;
        cache.set("k", "v", None).await.unwrap();

        assert!(!cache.exists("k").await.unwrap());
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.list_keys("*").await.unwrap().is_empty());
        assert_eq!(cache.delete(&["k".to_string()]).await.unwrap(), 0);
        assert!(!cache.is_enabled());
    }
}
