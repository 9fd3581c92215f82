use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Shared running flag for cooperative cancellation.
///
/// Cloned into the session engine, the pacer and the live source. Clearing
/// it wakes any pacing sleep immediately; in-flight sends and receives are
/// left to complete.
#[derive(Debug, Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Request a stop. Idempotent.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Resolves once `stop` has been called
    pub async fn stopped(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before re-checking so a concurrent stop is not missed
            notified.as_mut().enable();
            if !self.is_running() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_starts_running() {
        let handle = StopHandle::new();
        assert!(handle.is_running());
        handle.stop();
        assert!(!handle.is_running());
        handle.stop();
        assert!(!handle.is_running());
    }

    #[tokio::test]
    async fn test_stopped_resolves_immediately_when_already_stopped() {
        let handle = StopHandle::new();
        handle.stop();
        tokio::time::timeout(Duration::from_millis(50), handle.stopped())
            .await
            .expect("stopped() should resolve");
    }

    #[tokio::test]
    async fn test_stop_from_clone_wakes_waiter() {
        let handle = StopHandle::new();
        let remote = handle.clone();

        let waiter = tokio::spawn(async move { handle.stopped().await });
        tokio::task::yield_now().await;
        remote.stop();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }
}
