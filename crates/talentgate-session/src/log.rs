//! Diagnostic log of session lifecycle events.
//!
//! The manager reports every notable event as a [`LogEntry`] to a
//! [`LogSink`]. [`SessionLog`] is the default sink: it keeps the newest
//! entries in memory for a diagnostics panel and mirrors them to `tracing`.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use talentgate_auth::UserId;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    SessionLoaded,
    SessionMissing,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    KeepAlive,
    RefreshRetryScheduled,
    IgnoredEvent,
    ErrorSessionLoad,
    ErrorRefresh,
    ErrorKeepAlive,
    ErrorMarker,
}

impl LogKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SessionLoaded => "session_loaded",
            Self::SessionMissing => "session_missing",
            Self::SignedIn => "signed_in",
            Self::SignedOut => "signed_out",
            Self::TokenRefreshed => "token_refreshed",
            Self::UserUpdated => "user_updated",
            Self::KeepAlive => "keep_alive",
            Self::RefreshRetryScheduled => "refresh_retry_scheduled",
            Self::IgnoredEvent => "ignored_event",
            Self::ErrorSessionLoad => "error_session_load",
            Self::ErrorRefresh => "error_refresh",
            Self::ErrorKeepAlive => "error_keep_alive",
            Self::ErrorMarker => "error_marker",
        }
    }

    pub fn is_error(self) -> bool {
        matches!(
            self,
            Self::ErrorSessionLoad | Self::ErrorRefresh | Self::ErrorKeepAlive | Self::ErrorMarker
        )
    }
}

impl std::fmt::Display for LogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One diagnostic record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub kind: LogKind,
    pub at: DateTime<Utc>,
    pub user_id: Option<UserId>,
    /// Free-form context (`expires_at`, error message, ...).
    pub details: serde_json::Value,
}

/// Receives diagnostic entries. Must not block.
pub trait LogSink: Send + Sync + 'static {
    fn record(&self, entry: LogEntry);
}

// ---------------------------------------------------------------------------
// SessionLog
// ---------------------------------------------------------------------------

/// Per-kind counters over the retained entries.
#[derive(Debug, Clone, Default)]
pub struct LogStats {
    pub counts: BTreeMap<LogKind, usize>,
    pub total: usize,
    pub last: Option<LogEntry>,
}

impl LogStats {
    pub fn count(&self, kind: LogKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }
}

/// Bounded in-memory log, newest entries kept.
#[derive(Debug)]
pub struct SessionLog {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
}

impl SessionLog {
    pub const DEFAULT_CAPACITY: usize = 500;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Retained entries, oldest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn entries_of(&self, kind: LogKind) -> Vec<LogEntry> {
        self.lock().iter().filter(|e| e.kind == kind).cloned().collect()
    }

    pub fn stats(&self) -> LogStats {
        let entries = self.lock();
        let mut stats = LogStats {
            total: entries.len(),
            last: entries.back().cloned(),
            ..LogStats::default()
        };
        for entry in entries.iter() {
            *stats.counts.entry(entry.kind).or_insert(0) += 1;
        }
        stats
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<LogEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SessionLog {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for SessionLog {
    fn record(&self, entry: LogEntry) {
        let user_id = entry.user_id.as_ref().map(ToString::to_string);
        if entry.kind.is_error() {
            tracing::error!(
                kind = entry.kind.as_str(),
                user_id = user_id.as_deref(),
                details = %entry.details,
                "session event"
            );
        } else {
            tracing::debug!(
                kind = entry.kind.as_str(),
                user_id = user_id.as_deref(),
                details = %entry.details,
                "session event"
            );
        }

        let mut entries = self.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(kind: LogKind) -> LogEntry {
        LogEntry {
            kind,
            at: Utc::now(),
            user_id: Some(UserId::from("u-1")),
            details: json!({}),
        }
    }

    #[test]
    fn test_record_beyond_capacity_drops_oldest() {
        let log = SessionLog::with_capacity(3);
        log.record(entry(LogKind::SessionLoaded));
        for _ in 0..3 {
            log.record(entry(LogKind::KeepAlive));
        }

        let entries = log.entries();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.kind == LogKind::KeepAlive));
    }

    #[test]
    fn test_stats_counts_per_kind() {
        let log = SessionLog::new();
        log.record(entry(LogKind::SessionLoaded));
        log.record(entry(LogKind::KeepAlive));
        log.record(entry(LogKind::KeepAlive));
        log.record(entry(LogKind::ErrorRefresh));

        let stats = log.stats();

        assert_eq!(stats.total, 4);
        assert_eq!(stats.count(LogKind::KeepAlive), 2);
        assert_eq!(stats.count(LogKind::SignedOut), 0);
        assert_eq!(stats.last.map(|e| e.kind), Some(LogKind::ErrorRefresh));
    }

    #[test]
    fn test_clear_empties_log() {
        let log = SessionLog::new();
        log.record(entry(LogKind::SignedIn));

        log.clear();

        assert_eq!(log.stats().total, 0);
        assert!(log.stats().last.is_none());
    }

    #[test]
    fn test_log_kind_names_match_serde() {
        for kind in [LogKind::ErrorKeepAlive, LogKind::RefreshRetryScheduled, LogKind::SessionLoaded] {
            assert_eq!(
                serde_json::to_value(kind).unwrap(),
                json!(kind.as_str())
            );
        }
        assert!(LogKind::ErrorMarker.is_error());
        assert!(!LogKind::TokenRefreshed.is_error());
    }
}
