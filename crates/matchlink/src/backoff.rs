//! Bounded exponential backoff for automatic reconnection.

use std::time::Duration;

use rand::Rng;

use crate::ReconnectPolicy;

/// Hands out retry delays for one run of reconnection attempts.
///
/// Delay `n` (1-based) is `min(backoff_base * 2^(n-1), max_backoff)` plus a
/// random jitter in `0..jitter`. After `max_attempts` delays it returns
/// `None`. [`reset`](Self::reset) starts a new run.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    attempts: u32,
}

impl Backoff {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    /// Number of delays handed out since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns `true` once every allowed attempt has been used.
    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.policy.max_attempts
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// The delay before the next attempt, or `None` if there are no
    /// attempts left.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        self.attempts += 1;
        let jitter = if self.policy.jitter.is_zero() {
            Duration::ZERO
        } else {
            let max_ms = self.policy.jitter.as_millis().min(u128::from(u64::MAX)) as u64;
            Duration::from_millis(rand::rng().random_range(0..max_ms.max(1)))
        };
        Some(self.base_delay(self.attempts) + jitter)
    }

    /// The un-jittered delay for attempt `n` (1-based).
    fn base_delay(&self, n: u32) -> Duration {
        let factor = 1u32.checked_shl(n.saturating_sub(1)).unwrap_or(u32::MAX);
        self.policy
            .backoff_base
            .checked_mul(factor)
            .unwrap_or(self.policy.max_backoff)
            .min(self.policy.max_backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_attempts: u32, jitter_ms: u64) -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts,
            backoff_base: Duration::from_millis(100),
            max_backoff: Duration::from_millis(1000),
            jitter: Duration::from_millis(jitter_ms),
        }
    }

    #[test]
    fn test_next_delay_doubles_until_cap() {
        let mut backoff = Backoff::new(policy(6, 0));
        let delays: Vec<u64> = std::iter::from_fn(|| backoff.next_delay())
            .map(|d| d.as_millis() as u64)
            .collect();
        assert_eq!(delays, [100, 200, 400, 800, 1000, 1000]);
    }

    #[test]
    fn test_next_delay_none_after_max_attempts() {
        let mut backoff = Backoff::new(policy(2, 0));
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_none());
        assert!(backoff.is_exhausted());
        assert_eq!(backoff.attempts(), 2);
    }

    #[test]
    fn test_next_delay_zero_attempts_never_retries() {
        let mut backoff = Backoff::new(policy(0, 0));
        assert!(backoff.next_delay().is_none());
        assert_eq!(backoff.attempts(), 0);
    }

    #[test]
    fn test_next_delay_jitter_stays_in_range() {
        let mut backoff = Backoff::new(policy(1, 50));
        for _ in 0..100 {
            backoff.reset();
            let delay = backoff.next_delay().unwrap();
            assert!(delay >= Duration::from_millis(100));
            assert!(delay < Duration::from_millis(150), "got {delay:?}");
        }
    }

    #[test]
    fn test_reset_starts_a_new_run() {
        let mut backoff = Backoff::new(policy(1, 0));
        backoff.next_delay();
        assert!(backoff.next_delay().is_none());

        backoff.reset();

        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_base_delay_huge_attempt_saturates_at_cap() {
        let backoff = Backoff::new(policy(u32::MAX, 0));
        assert_eq!(backoff.base_delay(64), Duration::from_millis(1000));
    }
}
