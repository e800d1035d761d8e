//! Operator-initiated abandonment of a confirmation wait.
//!
//! Aborting ends only the local wait. A transaction that was already
//! broadcast may still be included later.

use std::sync::Arc;

use tokio::sync::watch;

/// Cloneable handle. Any clone may abort; every clone observes it.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl AbortHandle {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Abandon the wait.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once [`abort()`](Self::abort) has been called.
    pub async fn aborted(&self) {
        let mut rx = self.rx.clone();
        // The sender lives in `self`, so the channel cannot close while
        // this future is polled.
        let _ = rx.wait_for(|aborted| *aborted).await;
    }
}

impl Default for AbortHandle {
    fn default() -> Self {
        Self::new()
    }
}
