//! Route guard decisions derived from a session snapshot.
//!
//! Guards are pure functions: the UI asks for a decision whenever the
//! snapshot changes and renders, waits, or navigates accordingly.

use serde::{Deserialize, Serialize};

use crate::{SessionSnapshot, SessionStatus};

pub const LOGIN_ROUTE: &str = "/auth?mode=login";
pub const HOME_ROUTE: &str = "/";

/// What a guarded route should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// The initial session fetch hasn't resolved; render nothing yet.
    Pending,
    Allow,
    /// Navigate to `to` (replacing history) and show `notice`.
    Redirect {
        to: &'static str,
        notice: &'static str,
    },
}

impl GuardDecision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }

    fn login() -> Self {
        Self::Redirect {
            to: LOGIN_ROUTE,
            notice: "Please log in to continue.",
        }
    }
}

/// Gate for routes that need any signed-in user.
pub fn require_auth(snapshot: &SessionSnapshot) -> GuardDecision {
    match snapshot.status {
        SessionStatus::Loading => GuardDecision::Pending,
        SessionStatus::Unauthenticated => GuardDecision::login(),
        SessionStatus::Authenticated => GuardDecision::Allow,
    }
}

/// Who counts as an administrator.
///
/// A user is an admin if their email is on the allowlist, ends in
/// `@domain`, or an operator set `app_metadata.role = "admin"`. Matching is
/// case-insensitive. This only decides what the UI shows; the backend
/// enforces the real permission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminPolicy {
    allowlist: Vec<String>,
    domain: Option<String>,
}

impl AdminPolicy {
    /// Builds a policy from a comma-separated allowlist and a domain.
    /// Blank entries are ignored.
    pub fn new(allowlist_csv: &str, domain: &str) -> Self {
        let allowlist = allowlist_csv
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        let domain = Some(domain.trim().to_lowercase()).filter(|d| !d.is_empty());
        Self { allowlist, domain }
    }

    pub fn is_admin(&self, email: Option<&str>) -> bool {
        let email = email.unwrap_or_default().to_lowercase();
        if email.is_empty() {
            return false;
        }
        if self.allowlist.contains(&email) {
            return true;
        }
        self.domain
            .as_ref()
            .is_some_and(|d| email.ends_with(&format!("@{d}")))
    }

    /// Gate for the admin area.
    pub fn require_admin(&self, snapshot: &SessionSnapshot) -> GuardDecision {
        match snapshot.status {
            SessionStatus::Loading => GuardDecision::Pending,
            SessionStatus::Unauthenticated => GuardDecision::login(),
            SessionStatus::Authenticated => {
                let allowed = snapshot.user.as_ref().is_some_and(|user| {
                    self.is_admin(user.email.as_deref()) || user.has_app_role("admin")
                });
                if allowed {
                    GuardDecision::Allow
                } else {
                    GuardDecision::Redirect {
                        to: HOME_ROUTE,
                        notice: "Admin access required",
                    }
                }
            }
        }
    }
}
