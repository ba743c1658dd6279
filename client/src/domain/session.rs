//! Read-only view of the persisted authentication session.

use std::fmt;

use zeroize::Zeroizing;

use super::ports::{SessionKey, SessionStore};
use super::user::{Role, UserId};

/// Value stored under [`SessionKey::LoggedIn`] while a user is logged in.
pub const LOGGED_IN: &str = "true";

/// Interpret the raw logged-in flag.
pub fn is_logged_in_flag(raw: Option<&str>) -> bool {
    raw == Some(LOGGED_IN)
}

/// Snapshot of the session keys at one point in time.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Session {
    token: Option<Zeroizing<String>>,
    logged_in: bool,
    role: Option<String>,
    user_id: Option<String>,
}

impl Session {
    /// Read every session key from `store`.
    pub fn read(store: &dyn SessionStore) -> Self {
        Self {
            token: store.get(SessionKey::Token).map(Zeroizing::new),
            logged_in: is_logged_in_flag(store.get(SessionKey::LoggedIn).as_deref()),
            role: store.get(SessionKey::Role),
            user_id: store.get(SessionKey::UserId),
        }
    }

    /// Bearer token, when present and non-empty.
    pub fn token(&self) -> Option<&str> {
        self.token
            .as_deref()
            .map(String::as_str)
            .filter(|token| !token.is_empty())
    }

    /// Whether the logged-in flag is set.
    pub const fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    /// Raw role string as stored.
    pub fn raw_role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    /// Normalised role; absent roles are ordinary.
    pub fn role(&self) -> Role {
        self.role.as_deref().map(Role::from_wire).unwrap_or_default()
    }

    /// Whether the stored role is `ADMIN`, compared case-insensitively.
    pub fn is_admin(&self) -> bool {
        self.role().is_admin()
    }

    /// Stored user id, when it parses.
    pub fn user_id(&self) -> Option<UserId> {
        self.user_id.as_deref().and_then(|raw| raw.parse().ok())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("logged_in", &self.logged_in)
            .field("role", &self.role)
            .field("user_id", &self.user_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ports::MockSessionStore;
    use rstest::rstest;

    fn store_with(values: Vec<(SessionKey, &'static str)>) -> MockSessionStore {
        let mut store = MockSessionStore::new();
        store.expect_get().returning(move |key| {
            values
                .iter()
                .find(|(candidate, _)| *candidate == key)
                .map(|(_, value)| (*value).to_owned())
        });
        store
    }

    #[test]
    fn reads_complete_session() {
        let store = store_with(vec![
            (SessionKey::Token, "abc"),
            (SessionKey::LoggedIn, "true"),
            (SessionKey::Role, "admin"),
            (SessionKey::UserId, "12"),
        ]);

        let session = Session::read(&store);

        assert_eq!(session.token(), Some("abc"));
        assert!(session.is_logged_in());
        assert!(session.is_admin());
        assert_eq!(session.raw_role(), Some("admin"));
        assert_eq!(session.user_id(), Some(UserId::new(12)));
    }

    #[test]
    fn empty_store_is_logged_out() {
        let session = Session::read(&store_with(Vec::new()));

        assert_eq!(session, Session::default());
        assert!(session.token().is_none());
        assert!(!session.is_admin());
    }

    #[rstest]
    #[case(Some("true"), true)]
    #[case(Some("TRUE"), false)]
    #[case(Some("false"), false)]
    #[case(None, false)]
    fn logged_in_flag_is_exact(#[case] raw: Option<&str>, #[case] expected: bool) {
        assert_eq!(is_logged_in_flag(raw), expected);
    }

    #[test]
    fn debug_output_redacts_token() {
        let session = Session::read(&store_with(vec![(SessionKey::Token, "very-secret")]));
        assert!(!format!("{session:?}").contains("very-secret"));
    }
}
