// src/exec/cancel.rs

//! Per-unit cancellation tokens.
//!
//! Every command unit owns its own [`CancelHandle`], so one unit can be
//! stopped without touching its siblings. The runner holds a
//! [`CancelSignal`] subscribed to that handle.

use std::sync::Arc;

use tokio::sync::watch;

/// Owning side of a unit's cancellation token.
///
/// Cloning shares the same token. Cancelling is idempotent and does not need
/// a running Tokio runtime.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// A receiver that observes this token, including a cancellation that
    /// already happened.
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of a cancellation token, moved into the process runner.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the token is cancelled.
    ///
    /// If every handle is dropped without cancelling, this never resolves:
    /// the process is then left to finish on its own.
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn signal_sees_cancellation_made_before_subscription() {
        let handle = CancelHandle::new();
        handle.cancel();
        let mut signal = handle.signal();
        assert!(signal.is_cancelled());
        tokio::time::timeout(Duration::from_secs(1), signal.cancelled())
            .await
            .expect("already-cancelled token must resolve immediately");
    }

    #[tokio::test]
    async fn handles_are_independent() {
        let a = CancelHandle::new();
        let b = CancelHandle::new();
        let signal_b = b.signal();
        a.cancel();
        assert!(a.is_cancelled());
        assert!(!signal_b.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_handle_does_not_count_as_cancellation() {
        let handle = CancelHandle::new();
        let mut signal = handle.signal();
        drop(handle);
        let res = tokio::time::timeout(Duration::from_secs(5), signal.cancelled()).await;
        assert!(res.is_err());
    }
}
