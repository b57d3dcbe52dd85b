//! One-shot, cancellable deadline with a single slot.

use std::time::Duration;

use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace};

/// Information about a deadline that fired, returned by
/// [`RefreshDeadline::fired`].
#[derive(Debug, Clone, Copy)]
pub struct Fired {
    /// The instant the deadline was armed for.
    pub scheduled_for: TokioInstant,
    /// How late the wake-up was (runtime scheduling jitter).
    pub late_by: Duration,
}

/// A single pending deadline.
///
/// Invariant: at most one deadline is outstanding. [`arm_after`](Self::arm_after)
/// always cancels the previous one before installing the new one, so a
/// burst of reschedules leaves exactly one fire behind.
///
/// The slot is plain data (no spawned task), which makes cancellation
/// synchronous and lets tests assert on [`is_armed`](Self::is_armed) and
/// the counters directly.
#[derive(Debug, Default)]
pub struct RefreshDeadline {
    deadline: Option<TokioInstant>,
    armed_total: u64,
    cancelled_total: u64,
}

impl RefreshDeadline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the deadline `delay` from now, cancelling any pending one.
    ///
    /// Returns the instant it will fire at.
    pub fn arm_after(&mut self, delay: Duration) -> TokioInstant {
        let replaced = self.cancel();
        let at = crate::instant_after(delay);
        self.deadline = Some(at);
        self.armed_total += 1;
        debug!(
            delay_ms = delay.as_millis() as u64,
            replaced, "refresh deadline armed"
        );
        at
    }

    /// Cancels the pending deadline. Returns `true` if one was pending.
    pub fn cancel(&mut self) -> bool {
        if self.deadline.take().is_some() {
            self.cancelled_total += 1;
            trace!("refresh deadline cancelled");
            true
        } else {
            false
        }
    }

    /// Waits until the pending deadline and clears the slot.
    ///
    /// With nothing armed this future pends forever; `tokio::select!`
    /// keeps servicing its other branches. Cancel-safe: dropping the
    /// future before it resolves leaves the deadline armed.
    pub async fn fired(&mut self) -> Fired {
        let Some(at) = self.deadline else {
            return std::future::pending::<Fired>().await;
        };

        time::sleep_until(at).await;

        self.deadline = None;
        let late_by = TokioInstant::now().saturating_duration_since(at);
        trace!(late_ms = late_by.as_millis() as u64, "refresh deadline fired");
        Fired {
            scheduled_for: at,
            late_by,
        }
    }

    /// Whether a deadline is pending.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Number of pending deadlines (0 or 1).
    pub fn pending(&self) -> usize {
        usize::from(self.is_armed())
    }

    /// The instant the pending deadline fires at.
    pub fn deadline(&self) -> Option<TokioInstant> {
        self.deadline
    }

    /// Time left until the pending deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|at| at.saturating_duration_since(TokioInstant::now()))
    }

    /// How many times the deadline has been armed.
    pub fn armed_total(&self) -> u64 {
        self.armed_total
    }

    /// How many pending deadlines were cancelled (explicitly or by re-arming).
    pub fn cancelled_total(&self) -> u64 {
        self.cancelled_total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_unarmed() {
        let d = RefreshDeadline::new();
        assert!(!d.is_armed());
        assert_eq!(d.pending(), 0);
        assert_eq!(d.remaining(), None);
    }

    #[test]
    fn test_cancel_unarmed_returns_false() {
        let mut d = RefreshDeadline::new();
        assert!(!d.cancel());
        assert_eq!(d.cancelled_total(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_arm_twice_cancels_first() {
        let mut d = RefreshDeadline::new();

        d.arm_after(Duration::from_secs(60));
        let second = d.arm_after(Duration::from_secs(120));

        assert_eq!(d.pending(), 1);
        assert_eq!(d.deadline(), Some(second));
        assert_eq!(d.armed_total(), 2);
        assert_eq!(d.cancelled_total(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_arm_after_huge_delay_stays_armed() {
        let mut d = RefreshDeadline::new();

        let at = d.arm_after(Duration::MAX);

        assert!(d.is_armed());
        assert!(at > TokioInstant::now() + Duration::from_secs(365 * 24 * 60 * 60));
    }
}
