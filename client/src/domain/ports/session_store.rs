//! Driven port for the persisted authentication session.
//!
//! The store is a plain string key-value wrapper. Every mutation is also
//! published as a [`StorageChange`] so observers in other components can
//! react to logins and logouts they did not perform themselves.

use std::fmt;

use tokio::sync::broadcast;

use super::define_port_error;

/// Keys persisted by the session store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SessionKey {
    /// Opaque bearer token.
    Token,
    /// `"true"` while a user is logged in.
    LoggedIn,
    /// Role string returned at login, e.g. `ADMIN`.
    Role,
    /// Numeric user id rendered as a string.
    UserId,
}

impl SessionKey {
    /// Every key, in the order they are cleared.
    pub const ALL: [Self; 4] = [Self::LoggedIn, Self::Token, Self::UserId, Self::Role];

    /// Stable storage name for the key.
    pub const fn storage_name(self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::LoggedIn => "isLoggedIn",
            Self::Role => "role",
            Self::UserId => "userId",
        }
    }

    /// Resolve a storage name back to its key.
    pub fn from_storage_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.storage_name() == name)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.storage_name())
    }
}

/// Notification published after a key was written or removed.
#[derive(Clone, PartialEq, Eq)]
pub struct StorageChange {
    /// Key that changed.
    pub key: SessionKey,
    /// New value, or `None` when the key was removed.
    pub value: Option<String>,
}

impl fmt::Debug for StorageChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match (&self.key, &self.value) {
            (SessionKey::Token, Some(_)) => Some("<redacted>"),
            (_, value) => value.as_deref(),
        };
        f.debug_struct("StorageChange")
            .field("key", &self.key)
            .field("value", &value)
            .finish()
    }
}

define_port_error! {
    /// Errors raised while persisting session values.
    pub enum SessionStoreError {
        /// Backing storage could not be read or written.
        Io { message: String } => "session storage failed: {message}",
        /// Persisted contents could not be decoded.
        Corrupt { message: String } => "session storage is corrupt: {message}",
    }
}

/// Port for reading and writing the persisted session.
#[cfg_attr(test, mockall::automock)]
pub trait SessionStore: Send + Sync {
    /// Current value for `key`.
    fn get(&self, key: SessionKey) -> Option<String>;

    /// Write `value` under `key`.
    fn set(&self, key: SessionKey, value: &str) -> Result<(), SessionStoreError>;

    /// Remove every key in `keys`.
    fn clear(&self, keys: &[SessionKey]) -> Result<(), SessionStoreError>;

    /// Subscribe to change notifications published after each mutation.
    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(SessionKey::Token, "token")]
    #[case(SessionKey::LoggedIn, "isLoggedIn")]
    #[case(SessionKey::Role, "role")]
    #[case(SessionKey::UserId, "userId")]
    fn storage_names_round_trip(#[case] key: SessionKey, #[case] name: &str) {
        assert_eq!(key.storage_name(), name);
        assert_eq!(SessionKey::from_storage_name(name), Some(key));
    }

    #[test]
    fn unknown_storage_names_are_rejected() {
        assert_eq!(SessionKey::from_storage_name("theme"), None);
    }

    #[test]
    fn debug_output_redacts_token_values() {
        let change = StorageChange {
            key: SessionKey::Token,
            value: Some("secret-token".to_owned()),
        };
        let rendered = format!("{change:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("<redacted>"));
    }
}
