use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::{CacheError, pattern, r#trait::CacheStore};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    /// `None` never expires
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// In-process cache with per-entry expiry.
///
/// Expired entries are dropped lazily: reads ignore them and writes purge
/// them when the cache is at its entry limit. Time comes from
/// `tokio::time`, so paused-clock tests can advance past a TTL.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<DashMap<String, Entry>>,
    max_entries: Option<usize>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: Arc::default(),
            max_entries: Some(max_entries),
        }
    }

    /// Live entries currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.is_live(now)).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.is_live(now));
    }

    fn live_value(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let entry = self.entries.get(key)?;

        if entry.is_live(now) {
            return Some(entry.value.clone());
        }

        drop(entry);
        self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        None
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn exists(&self, key: &str) -> crate::Result<bool> {
        Ok(self.live_value(key).is_some())
    }

    async fn get(&self, key: &str) -> crate::Result<Option<String>> {
        Ok(self.live_value(key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> crate::Result<()> {
        if let Some(limit) = self.max_entries
            && !self.entries.contains_key(key)
            && self.entries.len() >= limit
        {
            self.purge_expired();
            if self.entries.len() >= limit {
                return Err(CacheError::Unavailable(format!(
                    "Memory cache full: {limit} entries"
                )));
            }
        }

        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );

        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> crate::Result<usize> {
        let now = Instant::now();

        Ok(keys
            .iter()
            .filter_map(|key| self.entries.remove(key))
            .filter(|(_, entry)| entry.is_live(now))
            .count())
    }

    async fn list_keys(&self, pattern: &str) -> crate::Result<Vec<String>> {
        let now = Instant::now();

        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.is_live(now) && pattern::matches(pattern, entry.key()))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();

        Ok(keys)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn set_get_exists() {
        let cache = MemoryCache::new();
        assert!(!cache.exists("k").await.unwrap());

        cache.set("k", "v", None).await.unwrap();

        assert!(cache.exists("k").await.unwrap());
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(cache.get("other").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_their_ttl() {
        let cache = MemoryCache::new();
        cache
            .set("short", "1", Some(Duration::from_secs(10)))
            .await
            .unwrap();
        cache.set("forever", "2", None).await.unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(cache.exists("short").await.unwrap());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!cache.exists("short").await.unwrap());
        assert_eq!(cache.get("short").await.unwrap(), None);
        assert!(cache.exists("forever").await.unwrap());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn delete_counts_present_keys() {
        let cache = MemoryCache::new();
        cache.set("a", "1", None).await.unwrap();
        cache.set("b", "2", None).await.unwrap();

        let removed = cache
            .delete(&["a".to_string(), "missing".to_string()])
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert!(!cache.exists("a").await.unwrap());
        assert!(cache.exists("b").await.unwrap());
    }

    #[tokio::test]
    async fn list_keys_filters_by_pattern() {
        let cache = MemoryCache::new();
        for key in ["message:2", "message:1", "messages:sent", "scheduler:state"] {
            cache.set(key, "x", None).await.unwrap();
        }

        assert_eq!(
            cache.list_keys("message:*").await.unwrap(),
            vec!["message:1".to_string(), "message:2".to_string()]
        );
        assert_eq!(cache.list_keys("*").await.unwrap().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn full_cache_rejects_new_keys_until_something_expires() {
        let cache = MemoryCache::with_max_entries(1);
        cache
            .set("a", "1", Some(Duration::from_secs(1)))
            .await
            .unwrap();

        let err = cache.set("b", "2", None).await.unwrap_err();
        assert!(matches!(err, CacheError::Unavailable(_)));

        // Overwriting an existing key is always allowed.
        cache.set("a", "3", Some(Duration::from_secs(1))).await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        cache.set("b", "2", None).await.unwrap();
        assert_eq!(cache.get("b").await.unwrap().as_deref(), Some("2"));
    }
}
