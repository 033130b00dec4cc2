use std::sync::Arc;

use serde::Deserialize;

use crate::{DisabledCache, MemoryCache, r#trait::CacheStore};

/// Cache backend selection.
///
/// ```ron
/// Herald (
///     cache: Memory ( max_entries: Some(100000) ),
/// )
/// ```
///
/// Turning the cache off entirely keeps delivery working; every dedup
/// lookup misses and snapshot reads always rebuild from the store:
/// ```ron
/// Herald (
///     cache: Disabled,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum CacheConfig {
    Memory {
        #[serde(default = "default_max_entries")]
        max_entries: Option<usize>,
    },
    Disabled,
}

#[allow(clippy::unnecessary_wraps)]
const fn default_max_entries() -> Option<usize> {
    Some(100_000)
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::Memory {
            max_entries: default_max_entries(),
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn into_backend(self) -> Arc<dyn CacheStore> {
        match self {
            Self::Memory { max_entries: None } => Arc::new(MemoryCache::new()),
            Self::Memory {
                max_entries: Some(limit),
            } => Arc::new(MemoryCache::with_max_entries(limit)),
            Self::Disabled => Arc::new(DisabledCache),
        }
    }
}
