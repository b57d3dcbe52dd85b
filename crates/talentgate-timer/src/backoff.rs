//! Bounded exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

/// Hands out retry delays: `base * 2^attempt`, capped at `max`, plus up to
/// `jitter` (a fraction of the delay) of random spread so that many
/// clients failing together don't retry in lockstep.
///
/// After `max_attempts` delays it returns `None` until [`reset`](Self::reset).
/// `max_attempts == 0` means "never retry".
#[derive(Debug, Clone)]
pub struct RetryBackoff {
    base: Duration,
    max: Duration,
    max_attempts: u32,
    jitter: f64,
    attempt: u32,
}

impl RetryBackoff {
    pub fn new(base: Duration, max: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            max: max.max(base),
            max_attempts,
            jitter: 0.2,
            attempt: 0,
        }
    }

    /// Sets the jitter fraction, clamped to `0.0..=1.0`.
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// A backoff that never yields a delay.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, 0)
    }

    /// The delay before the next attempt, or `None` if the budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        let factor = 1u32 << self.attempt.min(16);
        let delay = self.base.saturating_mul(factor).min(self.max);
        self.attempt += 1;

        let spread_ms = (delay.as_millis() as f64 * self.jitter) as u64;
        let extra = if spread_ms > 0 {
            Duration::from_millis(rand::rng().random_range(0..=spread_ms))
        } else {
            Duration::ZERO
        };
        Some(delay + extra)
    }

    /// Forgets previous attempts (call after a success).
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Attempts handed out since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_delay_doubles_until_cap() {
        let mut b = RetryBackoff::new(Duration::from_secs(5), Duration::from_secs(12), 4)
            .with_jitter(0.0);

        assert_eq!(b.next_delay(), Some(Duration::from_secs(5)));
        assert_eq!(b.next_delay(), Some(Duration::from_secs(10)));
        assert_eq!(b.next_delay(), Some(Duration::from_secs(12)));
        assert_eq!(b.next_delay(), Some(Duration::from_secs(12)));
        assert_eq!(b.next_delay(), None);
        assert!(b.is_exhausted());
    }

    #[test]
    fn test_next_delay_jitter_stays_within_fraction() {
        let mut b = RetryBackoff::new(Duration::from_secs(10), Duration::from_secs(10), 50)
            .with_jitter(0.5);

        for _ in 0..50 {
            let d = b.next_delay().unwrap();
            assert!(d >= Duration::from_secs(10));
            assert!(d <= Duration::from_secs(15));
        }
    }

    #[test]
    fn test_reset_restores_budget() {
        let mut b = RetryBackoff::new(Duration::from_secs(1), Duration::from_secs(1), 1);
        assert!(b.next_delay().is_some());
        assert!(b.next_delay().is_none());

        b.reset();

        assert_eq!(b.attempts(), 0);
        assert!(b.next_delay().is_some());
    }

    #[test]
    fn test_disabled_never_yields() {
        let mut b = RetryBackoff::disabled();
        assert!(b.is_exhausted());
        assert_eq!(b.next_delay(), None);
    }
}
