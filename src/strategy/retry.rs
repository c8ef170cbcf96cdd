use std::time::Duration;

/// Bounded retry with a (possibly growing) pause between attempts.
///
/// Shared by the purchase, listing and unstacking loops so their caps live
/// in config rather than in literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    /// Each retry waits `multiplier` times longer than the last (1 = fixed).
    pub multiplier: u32,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Fixed pause between attempts.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            multiplier: 1,
            max_delay: delay,
        }
    }

    pub fn exponential(max_attempts: u32, delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            multiplier: 2,
            max_delay,
        }
    }

    /// Attempt numbers, starting at 1. Always at least one attempt.
    pub fn attempts(&self) -> std::ops::RangeInclusive<u32> {
        1..=self.max_attempts.max(1)
    }

    pub fn is_last(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts.max(1)
    }

    /// Pause to take after failed attempt number `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .max(1)
            .saturating_pow(attempt.saturating_sub(1));
        self.delay.saturating_mul(factor).min(self.max_delay.max(self.delay))
    }

    /// Sleep for `backoff(attempt)`.
    pub async fn wait(&self, attempt: u32) {
        tokio::time::sleep(self.backoff(attempt)).await;
    }
}
