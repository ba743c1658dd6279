//! Test utilities for the client crate.
//!
//! Shared doubles for unit tests (in `src/`) and integration tests (in
//! `tests/`). Only compiled for tests or with the `test-support` feature.

pub mod transport;

pub mod notices {
    //! Recording notifier and login redirect.

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::Notify;

    use crate::domain::ports::{LoginRedirect, Notice, Notifier};

    /// Notifier that keeps every notice.
    #[derive(Debug, Default)]
    pub struct RecordingNotifier(Mutex<Vec<Notice>>);

    impl RecordingNotifier {
        /// Notices received so far.
        pub fn notices(&self) -> Vec<Notice> {
            match self.0.lock() {
                Ok(notices) => notices.clone(),
                Err(_) => panic!("notifier mutex"),
            }
        }

        /// Messages received so far.
        pub fn messages(&self) -> Vec<String> {
            self.notices()
                .into_iter()
                .map(|notice| notice.message)
                .collect()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notice: Notice) {
            match self.0.lock() {
                Ok(mut notices) => notices.push(notice),
                Err(_) => panic!("notifier mutex"),
            }
        }
    }

    /// Login redirect that counts invocations.
    #[derive(Debug, Default)]
    pub struct RecordingRedirect {
        count: AtomicUsize,
        signal: Notify,
    }

    impl RecordingRedirect {
        /// Redirects performed so far.
        pub fn count(&self) -> usize {
            self.count.load(Ordering::SeqCst)
        }

        /// Wait until at least `expected` redirects happened.
        pub async fn wait_for(&self, expected: usize) {
            while self.count() < expected {
                self.signal.notified().await;
            }
        }
    }

    impl LoginRedirect for RecordingRedirect {
        fn redirect_to_login(&self) {
            self.count.fetch_add(1, Ordering::SeqCst);
            self.signal.notify_one();
        }
    }
}

pub mod time {
    //! Sleepers that do not wait.

    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::domain::ports::Sleeper;

    /// Sleeper that returns immediately.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct ImmediateSleeper;

    #[async_trait]
    impl Sleeper for ImmediateSleeper {
        async fn sleep(&self, _duration: Duration) {}
    }

    /// Sleeper that records requested delays and returns immediately.
    #[derive(Debug, Default)]
    pub struct RecordingSleeper(pub Mutex<Vec<Duration>>);

    impl RecordingSleeper {
        /// Delays requested so far.
        pub fn delays(&self) -> Vec<Duration> {
            match self.0.lock() {
                Ok(entries) => entries.clone(),
                Err(_) => panic!("sleeper mutex"),
            }
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            let mut entries = match self.0.lock() {
                Ok(entries) => entries,
                Err(_) => panic!("sleeper mutex"),
            };
            entries.push(duration);
        }
    }
}

pub mod session_file {
    //! Temporary locations for the file-backed session store.

    use std::path::PathBuf;

    use tempfile::TempDir;

    /// Fresh directory plus a session file path inside it. Keep the
    /// directory alive for as long as the path is used.
    pub fn temp_session_path() -> (TempDir, PathBuf) {
        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(error) => panic!("failed to create temp dir: {error}"),
        };
        let path = dir.path().join("session.json");
        (dir, path)
    }
}
