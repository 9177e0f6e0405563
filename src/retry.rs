use crate::clock::Clock;
use crate::error::AnchorcastResult;
use std::time::Duration;
use tracing::warn;

/// Bounded exponential backoff: the wait after attempt `n` (1-based) is
/// `2^(n-1)` seconds, clamped to `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub min: Duration,
    pub max: Duration,
}

impl RetryPolicy {
    pub const fn new(attempts: u32, min_secs: u64, max_secs: u64) -> Self {
        Self {
            attempts,
            min: Duration::from_secs(min_secs),
            max: Duration::from_secs(max_secs),
        }
    }

    /// Wait before the attempt following `attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        let secs = 1u64 << exp;
        Duration::from_secs(secs).clamp(self.min, self.max)
    }

    /// Run `op` until it succeeds, returns a non-transient error, or the
    /// attempt budget is spent. The last error is returned unchanged.
    pub fn run<T, F>(&self, clock: &dyn Clock, what: &str, mut op: F) -> AnchorcastResult<T>
    where
        F: FnMut() -> AnchorcastResult<T>,
    {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.attempts => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        "{what} failed (attempt {attempt}/{}): {e}; retrying in {:?}",
                        self.attempts, delay
                    );
                    clock.sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
