//! Observable collection state and operation outcomes.

use std::sync::Arc;

/// Fetch lifecycle of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing loaded yet, or the last error was cleared by a mutation.
    #[default]
    Idle,
    /// A fetch is in flight.
    Fetching,
    /// The latest fetch failed; see [`CollectionSnapshot::error`].
    Error,
    /// Items reflect the latest fetch.
    Ready,
}

/// Which listing a fetch asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListingScope {
    /// The coordinator's configured listing.
    #[default]
    Default,
    /// Everything the session may see, e.g. unpublished catalog entries.
    All,
}

/// Point-in-time view of a collection handed to consumers.
///
/// Items are shared behind [`Arc`] so consumers can tell which items a
/// mutation replaced with [`Arc::ptr_eq`].
#[derive(Debug)]
pub struct CollectionSnapshot<T> {
    /// Items in server order.
    pub items: Vec<Arc<T>>,
    /// Fetch lifecycle.
    pub phase: Phase,
    /// Latest recorded error message.
    pub error: Option<String>,
    /// Generation of the most recently started fetch.
    pub generation: u64,
    /// Scope of the most recently started fetch.
    pub scope: ListingScope,
}

impl<T> CollectionSnapshot<T> {
    /// Whether a fetch is in flight.
    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Fetching
    }

    /// Find an item by predicate.
    pub fn find(&self, mut predicate: impl FnMut(&T) -> bool) -> Option<&Arc<T>> {
        self.items.iter().find(|item| predicate(item))
    }
}

impl<T> Default for CollectionSnapshot<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            phase: Phase::Idle,
            error: None,
            generation: 0,
            scope: ListingScope::Default,
        }
    }
}

impl<T> Clone for CollectionSnapshot<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            phase: self.phase,
            error: self.error.clone(),
            generation: self.generation,
            scope: self.scope,
        }
    }
}

/// Result of a fetch request.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response was committed.
    Applied {
        /// Number of items now visible.
        count: usize,
    },
    /// A fetch was already in flight; nothing was sent.
    Skipped,
    /// A newer fetch started before this one resolved; the result was dropped.
    Superseded,
    /// The fetch failed and the error was recorded.
    Failed {
        /// Recorded error message.
        message: String,
    },
    /// The session may not list this collection; items were cleared.
    NotPermitted,
}

impl FetchOutcome {
    /// Whether this call committed new items.
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}
