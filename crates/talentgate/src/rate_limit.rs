//! Sliding-window limit on destructive admin actions.
//!
//! The admin panel can bulk-delete accounts. A fat-fingered or scripted
//! burst of deletes is stopped client-side before it reaches the backend.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    #[error("delete rate limited ({limit} per window), retry in {retry_after:?}")]
    Limited { limit: usize, retry_after: Duration },
}

/// Returns `true` if fewer than `limit` of `timestamps` fall inside the
/// `window` ending at `now`.
pub fn can_delete_with(
    timestamps: &[DateTime<Utc>],
    now: DateTime<Utc>,
    limit: usize,
    window: Duration,
) -> bool {
    timestamps.iter().filter(|&&t| in_window(t, now, window)).count() < limit
}

fn in_window(t: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    (now - t).num_milliseconds() < window.as_millis() as i64
}

/// Stateful limiter: by default 5 deletes per 60 seconds.
#[derive(Debug, Clone)]
pub struct DeleteRateLimiter {
    limit: usize,
    window: Duration,
    recent: VecDeque<DateTime<Utc>>,
}

impl DeleteRateLimiter {
    pub const DEFAULT_LIMIT: usize = 5;
    pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            recent: VecDeque::new(),
        }
    }

    pub fn can_delete(&mut self, now: DateTime<Utc>) -> bool {
        self.evict(now);
        self.recent.len() < self.limit
    }

    /// Records a delete at `now` if the limit allows it.
    pub fn check_and_record(&mut self, now: DateTime<Utc>) -> Result<(), RateLimitError> {
        if !self.can_delete(now) {
            let retry_after = self
                .recent
                .front()
                .map(|&oldest| {
                    let elapsed_ms = (now - oldest).num_milliseconds().max(0) as u64;
                    self.window.saturating_sub(Duration::from_millis(elapsed_ms))
                })
                .unwrap_or(self.window);
            tracing::warn!(limit = self.limit, ?retry_after, "delete rate limited");
            return Err(RateLimitError::Limited {
                limit: self.limit,
                retry_after,
            });
        }
        self.recent.push_back(now);
        Ok(())
    }

    fn evict(&mut self, now: DateTime<Utc>) {
        while let Some(&oldest) = self.recent.front() {
            if in_window(oldest, now, self.window) {
                break;
            }
            self.recent.pop_front();
        }
    }
}

impl Default for DeleteRateLimiter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIMIT, Self::DEFAULT_WINDOW)
    }
}
