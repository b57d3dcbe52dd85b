//! Session manager configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use talentgate_timer::RetryBackoff;
use tracing::warn;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Timing knobs for the session lifecycle.
///
/// The defaults match what the hosted auth service expects from a browser
/// client: refresh two minutes ahead of expiry, never sooner than fifteen
/// seconds from now, and a keep-alive check every two minutes while the
/// user has been active in the last five.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long before `expires_at` the refresh is attempted.
    pub refresh_margin: Duration,

    /// Lower bound on any refresh delay, so an already-expired session
    /// doesn't spin.
    pub min_refresh_delay: Duration,

    /// Keep-alive period. Zero disables keep-alive.
    pub keep_alive_interval: Duration,

    /// Activity older than this makes the user idle for keep-alive purposes.
    pub active_window: Duration,

    /// Lifetime of the advisory "session active" marker.
    pub marker_ttl: Duration,

    /// What to do when a refresh fails.
    pub retry: RetryPolicy,
}

impl SessionConfig {
    /// Smallest refresh floor accepted by [`validated`](Self::validated).
    pub const MIN_REFRESH_FLOOR: Duration = Duration::from_secs(1);

    /// Largest margin, floor, keep-alive period, activity window or retry
    /// delay accepted by [`validated`](Self::validated).
    pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

    /// Largest marker lifetime accepted by [`validated`](Self::validated).
    pub const MAX_MARKER_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

    /// Returns a copy with nonsensical values clamped.
    pub fn validated(mut self) -> Self {
        clamp_max(&mut self.refresh_margin, Self::MAX_INTERVAL, "refresh_margin");
        clamp_max(&mut self.min_refresh_delay, Self::MAX_INTERVAL, "min_refresh_delay");
        clamp_max(&mut self.keep_alive_interval, Self::MAX_INTERVAL, "keep_alive_interval");
        clamp_max(&mut self.active_window, Self::MAX_INTERVAL, "active_window");
        clamp_max(&mut self.marker_ttl, Self::MAX_MARKER_TTL, "marker_ttl");
        clamp_max(&mut self.retry.base_delay, Self::MAX_INTERVAL, "retry.base_delay");
        clamp_max(&mut self.retry.max_delay, Self::MAX_INTERVAL, "retry.max_delay");

        if self.min_refresh_delay < Self::MIN_REFRESH_FLOOR {
            warn!(
                floor_ms = self.min_refresh_delay.as_millis() as u64,
                "min_refresh_delay below 1s, clamping"
            );
            self.min_refresh_delay = Self::MIN_REFRESH_FLOOR;
        }
        if self.active_window.is_zero() && !self.keep_alive_interval.is_zero() {
            warn!("active_window is zero, keep-alive will never fire a request");
        }
        if self.retry.max_delay < self.retry.base_delay {
            self.retry.max_delay = self.retry.base_delay;
        }
        self
    }
}

fn clamp_max(value: &mut Duration, max: Duration, field: &'static str) {
    if *value > max {
        warn!(field, max_secs = max.as_secs(), "duration too large, clamping");
        *value = max;
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_margin: Duration::from_secs(2 * 60),
            min_refresh_delay: Duration::from_secs(15),
            keep_alive_interval: Duration::from_secs(2 * 60),
            active_window: Duration::from_secs(5 * 60),
            marker_ttl: Duration::from_secs(24 * 60 * 60),
            retry: RetryPolicy::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// Retry budget for failed refreshes.
///
/// Only transient failures (network errors, 5xx) are retried. A rejected
/// refresh token never is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first failure. Zero turns retrying off.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Log the failure and wait for the next auth event or keep-alive.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_attempts > 0
    }

    pub(crate) fn backoff(&self) -> RetryBackoff {
        if self.is_enabled() {
            RetryBackoff::new(self.base_delay, self.max_delay, self.max_attempts)
        } else {
            RetryBackoff::disabled()
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.refresh_margin, Duration::from_secs(120));
        assert_eq!(config.min_refresh_delay, Duration::from_secs(15));
        assert_eq!(config.keep_alive_interval, Duration::from_secs(120));
        assert_eq!(config.active_window, Duration::from_secs(300));
        assert_eq!(config.marker_ttl, Duration::from_secs(86_400));
        assert!(config.retry.is_enabled());
    }

    #[test]
    fn test_validated_zero_floor_clamped() {
        let config = SessionConfig {
            min_refresh_delay: Duration::ZERO,
            ..SessionConfig::default()
        }
        .validated();

        assert_eq!(config.min_refresh_delay, SessionConfig::MIN_REFRESH_FLOOR);
    }

    #[test]
    fn test_validated_inverted_retry_bounds_fixed() {
        let config = SessionConfig {
            retry: RetryPolicy {
                max_attempts: 2,
                base_delay: Duration::from_secs(30),
                max_delay: Duration::from_secs(10),
            },
            ..SessionConfig::default()
        }
        .validated();

        assert_eq!(config.retry.max_delay, Duration::from_secs(30));
    }

    #[test]
    fn test_validated_huge_durations_clamped() {
        let config = SessionConfig {
            refresh_margin: Duration::MAX,
            min_refresh_delay: Duration::from_secs(u64::MAX),
            keep_alive_interval: Duration::from_secs(u64::MAX),
            active_window: Duration::MAX,
            marker_ttl: Duration::from_secs(20_000_000_000_000),
            retry: RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::MAX,
                max_delay: Duration::MAX,
            },
        }
        .validated();

        assert_eq!(config.refresh_margin, SessionConfig::MAX_INTERVAL);
        assert_eq!(config.min_refresh_delay, SessionConfig::MAX_INTERVAL);
        assert_eq!(config.keep_alive_interval, SessionConfig::MAX_INTERVAL);
        assert_eq!(config.active_window, SessionConfig::MAX_INTERVAL);
        assert_eq!(config.marker_ttl, SessionConfig::MAX_MARKER_TTL);
        assert_eq!(config.retry.base_delay, SessionConfig::MAX_INTERVAL);
        assert_eq!(config.retry.max_delay, SessionConfig::MAX_INTERVAL);
    }

    #[test]
    fn test_validated_defaults_unchanged() {
        assert_eq!(SessionConfig::default().validated(), SessionConfig::default());
    }

    #[test]
    fn test_retry_policy_disabled_yields_no_backoff() {
        let policy = RetryPolicy::disabled();
        assert!(!policy.is_enabled());
        assert!(policy.backoff().is_exhausted());
    }

    #[test]
    fn test_session_config_partial_json_fills_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{ "refresh_margin": { "secs": 60, "nanos": 0 } }"#).unwrap();

        assert_eq!(config.refresh_margin, Duration::from_secs(60));
        assert_eq!(config.min_refresh_delay, Duration::from_secs(15));
    }
}
