//! Wall-clock time derived from the tokio clock, and the activity tracker.
//!
//! All timestamps the session layer records come from a [`Clock`]: a wall
//! time captured once plus the tokio monotonic time elapsed since. Under
//! `tokio::time::pause()` the wall clock therefore advances exactly as far
//! as the test advances tokio time.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant as TokioInstant;

/// Maps tokio instants onto UTC.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    wall_anchor: DateTime<Utc>,
    mono_anchor: TokioInstant,
}

impl Clock {
    /// A clock anchored at the current time.
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// A clock that reads `wall` right now.
    pub fn starting_at(wall: DateTime<Utc>) -> Self {
        Self {
            wall_anchor: wall,
            mono_anchor: TokioInstant::now(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.at_offset(self.elapsed_ms())
    }

    /// Milliseconds of tokio time since the anchor.
    pub fn elapsed_ms(&self) -> u64 {
        self.mono_anchor.elapsed().as_millis() as u64
    }

    pub(crate) fn at_offset(&self, ms: u64) -> DateTime<Utc> {
        self.wall_anchor + chrono::Duration::milliseconds(ms as i64)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// ActivityTracker
// ---------------------------------------------------------------------------

/// Last time the user interacted with the app.
///
/// Input handlers call [`record`](Self::record) on every pointer, key,
/// scroll or touch event, so the write is a single relaxed atomic store
/// with no lock and no channel. Clones share the same timestamp.
#[derive(Debug, Clone)]
pub struct ActivityTracker {
    clock: Clock,
    last_ms: Arc<AtomicU64>,
}

impl ActivityTracker {
    /// A tracker that considers the user active right now.
    pub fn new(clock: Clock) -> Self {
        Self {
            last_ms: Arc::new(AtomicU64::new(clock.elapsed_ms())),
            clock,
        }
    }

    pub fn record(&self) {
        self.last_ms
            .fetch_max(self.clock.elapsed_ms(), Ordering::Relaxed);
    }

    pub fn last_activity_at(&self) -> DateTime<Utc> {
        self.clock.at_offset(self.last_ms.load(Ordering::Relaxed))
    }

    /// Time since the last recorded activity.
    pub fn idle_for(&self) -> Duration {
        let last = self.last_ms.load(Ordering::Relaxed);
        Duration::from_millis(self.clock.elapsed_ms().saturating_sub(last))
    }

    /// Returns `true` if activity was recorded less than `window` ago.
    pub fn is_active_within(&self, window: Duration) -> bool {
        self.idle_for() < window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_clock_now_follows_tokio_time() {
        let clock = Clock::new();
        let start = clock.now();

        tokio::time::advance(Duration::from_secs(90)).await;

        assert_eq!(clock.now() - start, chrono::Duration::seconds(90));
    }

    #[tokio::test(start_paused = true)]
    async fn test_is_active_within_expires_after_window() {
        let tracker = ActivityTracker::new(Clock::new());
        assert!(tracker.is_active_within(Duration::from_secs(300)));

        tokio::time::advance(Duration::from_secs(301)).await;

        assert!(!tracker.is_active_within(Duration::from_secs(300)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_shared_between_clones() {
        let tracker = ActivityTracker::new(Clock::new());
        let input_handler = tracker.clone();
        tokio::time::advance(Duration::from_secs(600)).await;

        input_handler.record();

        assert_eq!(tracker.idle_for(), Duration::ZERO);
        assert_eq!(tracker.last_activity_at(), tracker.clock.now());
    }
}
