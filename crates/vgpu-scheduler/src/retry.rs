//! Bounded exponential backoff for store writes.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use vgpu_state::{StoreError, StoreResult};

/// Backoff schedule: `steps` attempts in total, the delay after attempt
/// `n` being `initial_backoff * factor^(n-1)` capped at `max_backoff`,
/// plus up to `jitter` of that delay at random.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub steps: u32,
    pub initial_backoff: Duration,
    pub factor: f64,
    pub jitter: f64,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            steps: 5,
            initial_backoff: Duration::from_millis(10),
            factor: 2.0,
            jitter: 0.1,
            max_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay after the given 1-based attempt, without jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let secs = self.initial_backoff.as_secs_f64() * self.factor.max(1.0).powi(exponent);
        let capped = secs.min(self.max_backoff.as_secs_f64());
        Duration::try_from_secs_f64(capped).unwrap_or(self.max_backoff)
    }

    fn jittered(&self, attempt: u32) -> Duration {
        let base = self.backoff(attempt);
        if self.jitter <= 0.0 {
            return base;
        }
        let extra = rand::thread_rng().gen_range(0.0..=self.jitter);
        Duration::try_from_secs_f64(base.as_secs_f64() * (1.0 + extra)).unwrap_or(base)
    }
}

/// Run `op` until it succeeds, fails with an error `retriable` rejects,
/// or the policy's attempts run out. Cancellation interrupts both the
/// operation and the backoff sleep.
pub async fn retry_on_error<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    retriable: impl Fn(&StoreError) -> bool,
    mut op: F,
) -> StoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let steps = policy.steps.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StoreError::Cancelled),
            result = op() => result,
        };

        match result {
            Ok(value) => return Ok(value),
            Err(err) if attempt < steps && retriable(&err) => {
                let delay = policy.jittered(attempt);
                debug!(attempt, delay_ms = delay.as_millis() as u64, %err, "retrying store write");
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(StoreError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Err(err) => return Err(err),
        }
    }
}
