//! Session store adapters.
//!
//! Both adapters publish a [`StorageChange`] after every mutation through a
//! shared [`ChangeFeed`].

mod file;
mod memory;

pub use file::{FileSessionStore, SessionFilePoller};
pub use memory::MemorySessionStore;

use tokio::sync::broadcast;
use tracing::trace;

use crate::domain::ports::{SessionKey, StorageChange};

const CHANGE_FEED_CAPACITY: usize = 64;

/// Broadcast fan-out for session mutations.
#[derive(Debug, Clone)]
pub(crate) struct ChangeFeed {
    sender: broadcast::Sender<StorageChange>,
}

impl ChangeFeed {
    pub(crate) fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self { sender }
    }

    pub(crate) fn publish(&self, key: SessionKey, value: Option<String>) {
        if self.sender.send(StorageChange { key, value }).is_err() {
            // No subscribers is not an error.
            trace!(key = key.storage_name(), "session change had no subscribers");
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.sender.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}
