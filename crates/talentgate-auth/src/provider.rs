//! The contract the session layer needs from a hosted identity service.
//!
//! talentgate doesn't issue tokens itself; a hosted service does (GoTrue,
//! Auth0, a custom backend). The session manager only needs three things
//! from it, captured by [`AuthProvider`]: read the current session, refresh
//! it, and hear about changes.

use std::future::Future;

use crate::{AuthError, AuthSession, AuthSubscription};

/// A source of sessions and auth state notifications.
///
/// # Trait bounds
///
/// `Send + Sync + 'static` because the provider is shared through an `Arc`
/// with the session manager's task for the whole process lifetime.
///
/// # Example
///
/// ```rust
/// use talentgate_auth::{AuthError, AuthEventBus, AuthProvider, AuthSession, AuthSubscription};
///
/// /// A provider for a kiosk that never has a signed-in user.
/// struct Anonymous {
///     events: AuthEventBus,
/// }
///
/// impl AuthProvider for Anonymous {
///     async fn get_current_session(&self) -> Result<Option<AuthSession>, AuthError> {
///         Ok(None)
///     }
///
///     async fn refresh_session(&self) -> Result<AuthSession, AuthError> {
///         Err(AuthError::NoSession)
///     }
///
///     fn subscribe(&self) -> AuthSubscription {
///         self.events.subscribe()
///     }
/// }
/// ```
pub trait AuthProvider: Send + Sync + 'static {
    /// Returns the provider's current session, if any.
    fn get_current_session(
        &self,
    ) -> impl Future<Output = Result<Option<AuthSession>, AuthError>> + Send;

    /// Exchanges the stored refresh token for a new session.
    ///
    /// # Errors
    /// [`AuthError::InvalidRefreshToken`] if the refresh token was rejected,
    /// [`AuthError::NoSession`] if there is nothing to refresh, or a
    /// transport error.
    fn refresh_session(
        &self,
    ) -> impl Future<Output = Result<AuthSession, AuthError>> + Send;

    /// Starts receiving auth state notifications.
    fn subscribe(&self) -> AuthSubscription;
}
