pub mod backends;
pub mod config;
pub mod error;
pub mod r#trait;
pub mod types;

pub use backends::{MemoryMessageStore, SqliteMessageStore};
pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use r#trait::MessageStore;
pub use types::{Message, MessageId, NewMessage};
