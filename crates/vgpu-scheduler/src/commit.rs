//! Process-wide serialization of placement commits.
//!
//! Exactly one bind runs at a time, and each holds the gate for at least
//! `min_interval` from acquisition to release, even when it fails. This
//! gives the node-side agents a minimum window between consecutive
//! allocations.
//!
//! The acquisition time of the last holder is kept inside the lock. A
//! holder whose future is dropped mid-commit skips its trailing sleep, so
//! the next holder waits out the remainder before starting its own work.

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_MIN_COMMIT_INTERVAL: Duration = Duration::from_millis(30);

#[derive(Debug)]
pub struct CommitGate {
    /// Acquisition time of the most recent holder.
    last_acquired: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl Default for CommitGate {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_COMMIT_INTERVAL)
    }
}

impl CommitGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_acquired: Mutex::new(None),
            min_interval,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Run `work` while holding the gate. Waiters queue in FIFO order.
    pub async fn run<F, Fut, T>(&self, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut last_acquired = self.last_acquired.lock().await;
        if let Some(deadline) = (*last_acquired).and_then(|t| t.checked_add(self.min_interval)) {
            tokio::time::sleep_until(deadline).await;
        }
        let acquired = Instant::now();
        *last_acquired = Some(acquired);

        let output = work().await;

        let elapsed = acquired.elapsed();
        debug!(elapsed_ms = elapsed.as_millis() as u64, "commit finished");
        if let Some(remaining) = self.min_interval.checked_sub(elapsed) {
            tokio::time::sleep(remaining).await;
        }
        output
    }
}
