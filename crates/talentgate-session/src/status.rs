//! Session status state machine and the snapshot consumers read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use talentgate_auth::{AuthSession, User, UserId};

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// Where the client stands with the auth service.
///
/// ```text
/// Loading ──→ Authenticated ──→ Unauthenticated
///    │          ↺ refresh            ▲
///    └───────────────────────────────┘
/// ```
///
/// `Unauthenticated` is terminal for a mounted manager: signing in again
/// goes through a fresh mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Loading,
    Authenticated,
    Unauthenticated,
}

impl SessionStatus {
    /// Returns `true` if moving to `target` is allowed.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Loading, Self::Authenticated)
                | (Self::Loading, Self::Unauthenticated)
                | (Self::Authenticated, Self::Authenticated)
                | (Self::Authenticated, Self::Unauthenticated)
        )
    }

    pub fn is_loading(self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn is_authenticated(self) -> bool {
        matches!(self, Self::Authenticated)
    }

    /// Returns `true` once the initial fetch has resolved.
    pub fn is_settled(self) -> bool {
        !self.is_loading()
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "loading"),
            Self::Authenticated => write!(f, "authenticated"),
            Self::Unauthenticated => write!(f, "unauthenticated"),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionSnapshot
// ---------------------------------------------------------------------------

/// Immutable view of the session at one point in time.
///
/// `session` and `user` are `Some` exactly when `status` is
/// `Authenticated`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub session: Option<AuthSession>,
    pub user: Option<User>,
    /// When this manager first saw the user authenticated.
    pub login_at: Option<DateTime<Utc>>,
    /// Time of the last successful token refresh.
    pub last_refresh_at: Option<DateTime<Utc>>,
    pub last_activity_at: DateTime<Utc>,
}

impl SessionSnapshot {
    pub(crate) fn loading(now: DateTime<Utc>) -> Self {
        Self {
            status: SessionStatus::Loading,
            session: None,
            user: None,
            login_at: None,
            last_refresh_at: None,
            last_activity_at: now,
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user.as_ref().map(|u| &u.id)
    }

    /// Expiry of the cached access token.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.session.as_ref().map(|s| s.expires_at)
    }
}
