//! Advisory "session active" marker.
//!
//! The marker tells other parts of the client (a landing page deciding
//! whether to show "log in" or "open dashboard") that a session probably
//! exists. It is a hint with an expiry and nothing more: never check it
//! instead of the session itself.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc, serde::ts_seconds};
use serde::{Deserialize, Serialize};

/// Errors writing or removing the marker.
#[derive(Debug, thiserror::Error)]
pub enum MarkerError {
    #[error("marker I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("marker encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Where the marker lives.
///
/// Calls are synchronous and expected to be quick; the manager logs and
/// swallows any error.
pub trait SessionMarker: Send + Sync + 'static {
    /// Marks the session active for `ttl` starting at `now`.
    ///
    /// `now` comes from the manager's clock so the expiry agrees with the
    /// timestamps on published snapshots.
    fn set_active(&self, now: DateTime<Utc>, ttl: Duration) -> Result<(), MarkerError>;

    /// Removes the marker. Removing a missing marker is not an error.
    fn clear(&self) -> Result<(), MarkerError>;
}

const ACTIVE: &str = "active";

/// On-disk marker contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerRecord {
    pub value: String,
    #[serde(with = "ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl MarkerRecord {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.value == ACTIVE && now < self.expires_at
    }
}

/// Saturates at the end of the calendar instead of overflowing.
fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

// ---------------------------------------------------------------------------
// FileMarker
// ---------------------------------------------------------------------------

/// Marker stored as a small JSON file, readable by other local processes.
#[derive(Debug, Clone)]
pub struct FileMarker {
    path: PathBuf,
}

impl FileMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the marker, if present and well-formed.
    pub fn read(&self) -> Option<MarkerRecord> {
        let raw = std::fs::read(&self.path).ok()?;
        serde_json::from_slice(&raw).ok()
    }

    pub fn is_active(&self) -> bool {
        self.read().is_some_and(|r| r.is_active_at(Utc::now()))
    }

    fn write(&self, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        std::io::Write::write_all(&mut options.open(&self.path)?, bytes)
    }
}

impl SessionMarker for FileMarker {
    fn set_active(&self, now: DateTime<Utc>, ttl: Duration) -> Result<(), MarkerError> {
        let record = MarkerRecord {
            value: ACTIVE.to_string(),
            expires_at: expiry_after(now, ttl),
        };
        self.write(&serde_json::to_vec(&record)?)?;
        tracing::trace!(path = %self.path.display(), "session marker set");
        Ok(())
    }

    fn clear(&self) -> Result<(), MarkerError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryMarker
// ---------------------------------------------------------------------------

/// Marker kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryMarker {
    record: Mutex<Option<MarkerRecord>>,
}

impl MemoryMarker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self) -> Option<MarkerRecord> {
        self.lock().clone()
    }

    pub fn is_active(&self) -> bool {
        self.record().is_some_and(|r| r.is_active_at(Utc::now()))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<MarkerRecord>> {
        self.record.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionMarker for MemoryMarker {
    fn set_active(&self, now: DateTime<Utc>, ttl: Duration) -> Result<(), MarkerError> {
        *self.lock() = Some(MarkerRecord {
            value: ACTIVE.to_string(),
            expires_at: expiry_after(now, ttl),
        });
        Ok(())
    }

    fn clear(&self) -> Result<(), MarkerError> {
        *self.lock() = None;
        Ok(())
    }
}
