//! Process-local session store.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use tokio::sync::broadcast;

use super::ChangeFeed;
use crate::domain::ports::{SessionKey, SessionStore, SessionStoreError, StorageChange};

/// Session store that lives for the duration of the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: RwLock<BTreeMap<SessionKey, String>>,
    feed: ChangeFeed,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `entries`, without publishing.
    pub fn with_entries<I, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (SessionKey, V)>,
        V: Into<String>,
    {
        let values = entries
            .into_iter()
            .map(|(key, value)| (key, value.into()))
            .collect();
        Self {
            values: RwLock::new(values),
            feed: ChangeFeed::new(),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: SessionKey) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    fn set(&self, key: SessionKey, value: &str) -> Result<(), SessionStoreError> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value.to_owned());
        self.feed.publish(key, Some(value.to_owned()));
        Ok(())
    }

    fn clear(&self, keys: &[SessionKey]) -> Result<(), SessionStoreError> {
        let removed: Vec<SessionKey> = {
            let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
            keys.iter()
                .copied()
                .filter(|key| values.remove(key).is_some())
                .collect()
        };
        for key in removed {
            self.feed.publish(key, None);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.feed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let store = MemorySessionStore::new();
        store.set(SessionKey::Role, "ADMIN").expect("set role");
        assert_eq!(store.get(SessionKey::Role).as_deref(), Some("ADMIN"));
        assert!(store.get(SessionKey::Token).is_none());
    }

    #[test]
    fn mutations_are_published_in_order() {
        let store = MemorySessionStore::with_entries([(SessionKey::Token, "abc")]);
        let mut changes = store.subscribe();

        store.set(SessionKey::LoggedIn, "true").expect("set flag");
        store
            .clear(&[SessionKey::Token, SessionKey::UserId])
            .expect("clear keys");

        assert_eq!(
            changes.try_recv().expect("set change"),
            StorageChange {
                key: SessionKey::LoggedIn,
                value: Some("true".to_owned()),
            }
        );
        assert_eq!(
            changes.try_recv().expect("clear change"),
            StorageChange {
                key: SessionKey::Token,
                value: None,
            }
        );
        assert!(
            changes.try_recv().is_err(),
            "absent keys should not publish removals"
        );
    }
}
