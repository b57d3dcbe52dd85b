//! Refresh scheduling arithmetic.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Delay until the next refresh attempt.
///
/// `max(expires_at - now - margin, floor)`. An expiry in the past, or one
/// inside the margin, yields `floor`.
pub fn refresh_delay(
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
    margin: Duration,
    floor: Duration,
) -> Duration {
    let lead_ms = (expires_at - now)
        .num_milliseconds()
        .saturating_sub(millis(margin));
    let floor_ms = millis(floor);
    Duration::from_millis(u64::try_from(lead_ms.max(floor_ms)).unwrap_or(0))
}

fn millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}
