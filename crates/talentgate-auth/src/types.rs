//! Identity and credential types issued by the hosted auth service.
//!
//! These mirror the JSON the service returns, so the same structs are used
//! for decoding responses and for the cached copy the session layer holds.

use std::fmt;

use chrono::{DateTime, Utc, serde::ts_seconds};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The auth service's identifier for a user (a UUID string on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Claims stored on the user by the service operator, not the user.
///
/// Only the fields the client acts on are decoded; the rest is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppMetadata {
    /// Application role granted by an operator (e.g. `"admin"`).
    #[serde(default)]
    pub role: Option<String>,

    /// Identity provider the account was created with (`"email"`, `"github"`).
    #[serde(default)]
    pub provider: Option<String>,
}

/// Identity record owned by the auth service.
///
/// The session layer holds a read-only cached copy; it never edits one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,

    #[serde(default)]
    pub email: Option<String>,

    /// Database role the service assigns (`"authenticated"` for signed-in users).
    #[serde(default)]
    pub role: Option<String>,

    #[serde(default)]
    pub app_metadata: AppMetadata,
}

impl User {
    /// Returns `true` if an operator granted this user the given app role.
    pub fn has_app_role(&self, role: &str) -> bool {
        self.app_metadata.role.as_deref() == Some(role)
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// A bearer token pair plus the identity it was issued for.
///
/// `expires_at` travels as epoch seconds, which is what the service sends
/// and what refresh scheduling is computed from.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(with = "ts_seconds")]
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl AuthSession {
    /// Returns `true` if the access token has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Value for an `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

// Tokens end up in tracing output through `?session` fields, so they are
// never printed.
impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}
