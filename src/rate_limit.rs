//! Minimum-interval gate shared by all calls to one upstream host.
//!
//! Not a correctness mechanism: it keeps request bursts below the rate that
//! trips upstream abuse detection.

use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug)]
pub struct RateLimiter {
    last_slot: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_slot: Mutex::new(None),
            min_interval,
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Resolves immediately if `min_interval` elapsed since the last slot,
    /// otherwise sleeps for the remainder. Callers are served in lock order.
    pub async fn await_slot(&self) {
        let mut last = self.last_slot.lock().await;

        if let Some(t) = *last {
            let elapsed = t.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                tracing::trace!(target: "wiki", wait_ms = wait.as_millis() as u64, "rate limiting");
                tokio::time::sleep(wait).await;
            }
        }

        *last = Some(Instant::now());
    }
}
