//! Exponential backoff policy for transient upstream failures

use crate::constants::{INITIAL_BACKOFF_MS, MAX_BACKOFF_MS, MAX_RETRIES};
use std::time::Duration;

/// Retry policy applied to a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts is `max_retries + 1`
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy allowing `max_retries` retries after the first attempt
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// A policy that never retries
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO)
    }

    /// Delay to wait after failed attempt `attempt` (0-based)
    ///
    /// `min(base_delay * 2^attempt, max_delay)`, saturating on overflow.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Total attempts this policy allows
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Whether another attempt follows `attempt` (0-based)
    pub fn has_next(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Worst-case time spent sleeping across the whole sequence
    pub fn total_delay(&self) -> Duration {
        (0..self.max_retries).map(|n| self.delay(n)).sum()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            MAX_RETRIES,
            Duration::from_millis(INITIAL_BACKOFF_MS),
            Duration::from_millis(MAX_BACKOFF_MS),
        )
    }
}

/// Whether an HTTP status warrants another attempt
///
/// Rate limiting (429) and server errors (>= 500) are transient. Any other
/// client error is final.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || status >= 500
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(5, Duration::from_millis(100), Duration::from_millis(1000))
    }

    #[test]
    fn test_delay_doubles_until_cap() {
        let p = policy();
        assert_eq!(p.delay(0), Duration::from_millis(100));
        assert_eq!(p.delay(1), Duration::from_millis(200));
        assert_eq!(p.delay(2), Duration::from_millis(400));
        assert_eq!(p.delay(3), Duration::from_millis(800));
        assert_eq!(p.delay(4), Duration::from_millis(1000));
        assert_eq!(p.delay(10), Duration::from_millis(1000));
    }

    #[test]
    fn test_delay_monotonic_and_capped() {
        let p = policy();
        let mut previous = Duration::ZERO;
        for n in 0..64 {
            let d = p.delay(n);
            assert!(d >= previous, "delay({}) decreased", n);
            assert!(d <= p.max_delay);
            previous = d;
        }
    }

    #[test]
    fn test_huge_attempt_saturates() {
        let p = RetryPolicy::new(3, Duration::from_secs(u64::MAX / 2), Duration::from_secs(30));
        assert_eq!(p.delay(40), Duration::from_secs(30));
    }

    #[test]
    fn test_total_delay_bounded() {
        let p = policy();
        assert_eq!(p.total_delay(), Duration::from_millis(100 + 200 + 400 + 800 + 1000));
        assert!(p.total_delay() <= p.max_delay * p.max_retries);
        assert_eq!(p.max_attempts(), 6);
        assert!(p.has_next(4));
        assert!(!p.has_next(5));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(429));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(499));
        assert!(!is_retryable_status(200));
    }
}
