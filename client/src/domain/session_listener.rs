//! Refreshes a collection when another component logs the user in.
//!
//! The listener follows the session store's change feed and tracks the last
//! known logged-in flag. A transition from logged out to logged in triggers
//! one refresh of the target; further transitions are ignored while that
//! refresh is pending.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::collection::{CollectionCoordinator, CollectionResource, FetchOutcome};
use super::ports::{SessionKey, SessionStore, StorageChange};
use super::session::is_logged_in_flag;

/// Something that can reload its data on demand.
#[async_trait]
pub trait RefreshTarget: Send + Sync {
    /// Reload, superseding any load in flight.
    async fn refresh(&self) -> FetchOutcome;
}

#[async_trait]
impl<R: CollectionResource> RefreshTarget for CollectionCoordinator<R> {
    async fn refresh(&self) -> FetchOutcome {
        CollectionCoordinator::refresh(self).await
    }
}

/// Background task following login transitions. Stops when dropped.
pub struct SessionChangeListener {
    task: JoinHandle<()>,
}

impl SessionChangeListener {
    /// Start following `store` on the current runtime.
    pub fn spawn(store: Arc<dyn SessionStore>, target: Arc<dyn RefreshTarget>) -> Self {
        let changes = store.subscribe();
        let logged_in = is_logged_in_flag(store.get(SessionKey::LoggedIn).as_deref());
        let watcher = LoginWatcher {
            store,
            target,
            logged_in,
            in_flight: Arc::new(AtomicBool::new(false)),
        };
        Self {
            task: tokio::spawn(watcher.run(changes)),
        }
    }

    /// Stop following the store.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for SessionChangeListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct LoginWatcher {
    store: Arc<dyn SessionStore>,
    target: Arc<dyn RefreshTarget>,
    logged_in: bool,
    in_flight: Arc<AtomicBool>,
}

impl LoginWatcher {
    async fn run(mut self, mut changes: broadcast::Receiver<StorageChange>) {
        loop {
            let now = match changes.recv().await {
                Ok(change) if change.key == SessionKey::LoggedIn => {
                    is_logged_in_flag(change.value.as_deref())
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "session change feed lagged, re-reading the store");
                    is_logged_in_flag(self.store.get(SessionKey::LoggedIn).as_deref())
                }
                Err(RecvError::Closed) => {
                    debug!("session change feed closed");
                    return;
                }
            };
            let logged_in_now = !self.logged_in && now;
            self.logged_in = now;
            if logged_in_now {
                self.trigger();
            }
        }
    }

    fn trigger(&self) {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("login refresh already pending");
            return;
        }
        info!("login detected, refreshing");
        let target = Arc::clone(&self.target);
        let in_flight = Arc::clone(&self.in_flight);
        tokio::spawn(async move {
            let outcome = target.refresh().await;
            debug!(?outcome, "login refresh settled");
            in_flight.store(false, Ordering::Release);
        });
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use tokio::sync::Notify;
    use tokio::time::timeout;

    use super::*;
    use crate::outbound::session::MemorySessionStore;

    #[derive(Default)]
    struct CountingTarget {
        started: AtomicUsize,
        signal: Notify,
        gate: Option<Arc<Notify>>,
    }

    impl CountingTarget {
        fn gated(gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::default()
            }
        }

        fn started(&self) -> usize {
            self.started.load(Ordering::SeqCst)
        }

        async fn wait_for(&self, expected: usize) {
            let waiting = async {
                while self.started() < expected {
                    self.signal.notified().await;
                }
            };
            timeout(Duration::from_secs(5), waiting)
                .await
                .expect("refresh should start");
        }
    }

    #[async_trait]
    impl RefreshTarget for CountingTarget {
        async fn refresh(&self) -> FetchOutcome {
            self.started.fetch_add(1, Ordering::SeqCst);
            self.signal.notify_one();
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            FetchOutcome::Applied { count: 0 }
        }
    }

    fn listen(
        store: &Arc<MemorySessionStore>,
        target: &Arc<CountingTarget>,
    ) -> SessionChangeListener {
        SessionChangeListener::spawn(store.clone(), target.clone())
    }

    #[tokio::test]
    async fn login_triggers_exactly_one_refresh() {
        let store = Arc::new(MemorySessionStore::new());
        let target = Arc::new(CountingTarget::default());
        let _listener = listen(&store, &target);

        store.set(SessionKey::Token, "abc").expect("token");
        store.set(SessionKey::LoggedIn, "true").expect("flag");
        store.set(SessionKey::LoggedIn, "true").expect("repeat flag");
        target.wait_for(1).await;
        tokio::task::yield_now().await;

        assert_eq!(target.started(), 1);
    }

    #[tokio::test]
    async fn logout_does_not_refresh() {
        let store = Arc::new(MemorySessionStore::with_entries([(SessionKey::LoggedIn, "true")]));
        let target = Arc::new(CountingTarget::default());
        let _listener = listen(&store, &target);

        store.clear(&SessionKey::ALL).expect("logout");
        store.set(SessionKey::Role, "ADMIN").expect("unrelated key");
        store.set(SessionKey::LoggedIn, "true").expect("login again");
        target.wait_for(1).await;

        assert_eq!(target.started(), 1, "only the later login refreshes");
    }

    #[tokio::test]
    async fn logins_during_a_pending_refresh_are_ignored() {
        let store = Arc::new(MemorySessionStore::new());
        let gate = Arc::new(Notify::new());
        let target = Arc::new(CountingTarget::gated(gate.clone()));
        let _listener = listen(&store, &target);

        store.set(SessionKey::LoggedIn, "true").expect("login");
        target.wait_for(1).await;
        store.set(SessionKey::LoggedIn, "false").expect("logout");
        store.set(SessionKey::LoggedIn, "true").expect("login again");
        tokio::task::yield_now().await;
        assert_eq!(target.started(), 1);

        gate.notify_one();
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        store.set(SessionKey::LoggedIn, "false").expect("logout");
        store.set(SessionKey::LoggedIn, "true").expect("login after settle");
        gate.notify_one();
        target.wait_for(2).await;
    }

    #[tokio::test]
    async fn dropping_the_listener_stops_refreshes() {
        let store = Arc::new(MemorySessionStore::new());
        let target = Arc::new(CountingTarget::default());
        listen(&store, &target).shutdown();

        store.set(SessionKey::LoggedIn, "true").expect("login");
        tokio::task::yield_now().await;

        assert_eq!(target.started(), 0);
    }
}
