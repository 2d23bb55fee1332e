//! Per-action cooldowns.
//!
//! [`RateLimiter::enforce`] delays a caller until `min_interval` has passed
//! since the action last ran, then records the new run time. It throttles
//! classes of traffic ("publish", "fetch-profile"), not individual targets.
//!
//! This is a best-effort throttle, not mutual exclusion. The last-run time is
//! read, the caller sleeps without holding any lock, and the time is written
//! afterwards. Two callers racing on the same action can both read the same
//! timestamp and be admitted close together.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::debug;

/// Tracks when each named action last ran.
#[derive(Debug, Default)]
pub struct RateLimiter {
    last_run: Mutex<HashMap<String, Instant>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait out the remainder of `min_interval` for `action`, then mark it as run.
    ///
    /// Returns how long the caller was delayed.
    pub async fn enforce(&self, action: &str, min_interval: Duration) -> Duration {
        let last = self.last_run.lock().await.get(action).copied();

        let wait = match last {
            Some(last) => min_interval.saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        };

        if !wait.is_zero() {
            debug!("Rate limiting {} for {:?}", action, wait);
            sleep(wait).await;
        }

        self.last_run
            .lock()
            .await
            .insert(action.to_string(), Instant::now());

        wait
    }

    #[cfg(test)]
    async fn last_run(&self, action: &str) -> Option<Instant> {
        self.last_run.lock().await.get(action).copied()
    }
}
