//! Async sleeping abstraction for debounce and redirect delays.

use std::time::Duration;

use async_trait::async_trait;

/// Clock-independent sleeping abstraction.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend execution for `duration`.
    ///
    /// ```rust,no_run
    /// use async_trait::async_trait;
    /// use storefront_client::domain::ports::Sleeper;
    /// use std::sync::{Arc, Mutex};
    /// use std::time::Duration;
    /// #[derive(Default)]
    /// struct CountingSleeper {
    ///     calls: Arc<Mutex<u32>>,
    /// }
    /// #[async_trait]
    /// impl Sleeper for CountingSleeper {
    ///     async fn sleep(&self, _duration: Duration) {
    ///         *self.calls.lock().expect("calls mutex") += 1;
    ///     }
    /// }
    /// # async fn demo() {
    /// let sleeper = CountingSleeper::default();
    /// sleeper.sleep(Duration::from_millis(200)).await;
    /// assert_eq!(*sleeper.calls.lock().expect("calls mutex"), 1);
    /// # }
    /// ```
    async fn sleep(&self, duration: Duration);
}

/// Tokio-based sleeper implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
