//! Shared handler state

use std::sync::Arc;

use herald_cache::DedupCache;
use herald_delivery::{MessageSender, Scheduler, SentMessages};
use herald_store::MessageStore;

/// Everything the handlers reach into. Cloned per request; every field is a
/// handle.
#[derive(Debug, Clone)]
pub struct AppState {
    pub(crate) scheduler: Arc<Scheduler>,
    pub(crate) sender: Arc<dyn MessageSender>,
    pub(crate) store: Arc<dyn MessageStore>,
    pub(crate) cache: DedupCache,
    pub(crate) sent: SentMessages,
}

impl AppState {
    /// `sender` must be the one `scheduler` drives, so manual sends and
    /// scheduled cycles share one send protocol.
    #[must_use]
    pub fn new(
        scheduler: Arc<Scheduler>,
        sender: Arc<dyn MessageSender>,
        store: Arc<dyn MessageStore>,
        cache: DedupCache,
    ) -> Self {
        let sent = SentMessages::new(Arc::clone(&store), cache.clone());
        Self {
            scheduler,
            sender,
            store,
            cache,
            sent,
        }
    }

    #[must_use]
    pub const fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }
}
