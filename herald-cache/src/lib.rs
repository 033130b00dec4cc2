pub mod backends;
pub mod config;
pub mod dedup;
pub mod error;
pub mod keys;
pub mod pattern;
pub mod r#trait;

pub use backends::{DisabledCache, MemoryCache};
pub use config::CacheConfig;
pub use dedup::DedupCache;
pub use error::{CacheError, Result};
pub use r#trait::CacheStore;
