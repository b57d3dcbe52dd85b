//! Error types for the session layer.

use talentgate_auth::AuthError;

/// Errors returned to callers of [`SessionHandle`](crate::SessionHandle).
///
/// Lifecycle failures inside the manager are logged, not returned; only
/// explicit requests surface errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    /// The manager was unmounted or its task has stopped.
    #[error("session manager is not running")]
    Unmounted,

    /// The request needs a signed-in user.
    #[error("no authenticated session")]
    NotAuthenticated,

    #[error(transparent)]
    Auth(#[from] AuthError),
}
