//! Cooperative cancellation flag
//!
//! One flag per task. The orchestrator checks it between steps; the retry
//! engine races it against backoff sleeps and in-flight attempts so a
//! cancel takes effect at the next suspension point.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// A set-once cancellation flag with async wakeup
#[derive(Debug, Default)]
pub struct CancelFlag {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake all waiters
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Wait until cancellation is requested
    ///
    /// Returns immediately if the flag is already set.
    pub async fn cancelled(&self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register as a waiter before the re-check so a cancel landing
            // in between cannot be missed
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}
