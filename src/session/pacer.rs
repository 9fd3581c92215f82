use std::time::Duration;
use tokio::time::Instant;

use crate::shutdown::StopHandle;

/// Real-time pacing of chunk sends.
///
/// The wait after a chunk is measured from when that chunk was sent, so
/// time spent draining inbound messages does not stretch the cadence.
#[derive(Debug, Clone)]
pub struct Pacer {
    interval: Option<Duration>,
    stop: StopHandle,
}

impl Pacer {
    pub fn new(interval: Duration, stop: StopHandle) -> Self {
        Self {
            interval: Some(interval),
            stop,
        }
    }

    /// Pacer for sources that already deliver in real time
    pub fn passthrough(stop: StopHandle) -> Self {
        Self {
            interval: None,
            stop,
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Wait until one interval after `sent_at`.
    ///
    /// Returns false if a stop was requested before or during the wait, in
    /// which case no further chunk should be sent.
    pub async fn wait(&self, sent_at: Instant) -> bool {
        if !self.stop.is_running() {
            return false;
        }

        let Some(interval) = self.interval else {
            return true;
        };

        tokio::select! {
            _ = tokio::time::sleep_until(sent_at + interval) => self.stop.is_running(),
            _ = self.stop.stopped() => false,
        }
    }
}
