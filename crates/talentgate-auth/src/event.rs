//! Push-style auth state notifications.
//!
//! Providers publish an [`AuthEvent`] whenever their view of the session
//! changes. Consumers hold an [`AuthSubscription`]; dropping it (or calling
//! [`AuthSubscription::unsubscribe`]) detaches them.

use std::fmt;

use tokio::sync::broadcast;

use crate::AuthSession;

/// Buffered events per subscriber before the slowest one starts lagging.
const EVENT_CAPACITY: usize = 32;

/// A change in the provider's auth state.
///
/// ```text
/// sign in ─────────→ SignedIn(session)
/// refresh ─────────→ TokenRefreshed(session)
/// profile update ──→ UserUpdated(session)
/// sign out ────────→ SignedOut
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(AuthSession),
    SignedOut,
    TokenRefreshed(AuthSession),
    UserUpdated(AuthSession),
    /// A password-recovery link was opened. Carries a short-lived session
    /// that is only good for setting a new password.
    PasswordRecovery(AuthSession),
}

impl AuthEvent {
    /// The provider's tag for this event, e.g. `"TOKEN_REFRESHED"`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SignedIn(_) => "SIGNED_IN",
            Self::SignedOut => "SIGNED_OUT",
            Self::TokenRefreshed(_) => "TOKEN_REFRESHED",
            Self::UserUpdated(_) => "USER_UPDATED",
            Self::PasswordRecovery(_) => "PASSWORD_RECOVERY",
        }
    }

    /// The session carried by the event. `None` for sign-out.
    pub fn session(&self) -> Option<&AuthSession> {
        match self {
            Self::SignedIn(s)
            | Self::TokenRefreshed(s)
            | Self::UserUpdated(s)
            | Self::PasswordRecovery(s) => Some(s),
            Self::SignedOut => None,
        }
    }
}

impl fmt::Display for AuthEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

// ---------------------------------------------------------------------------
// Fan-out
// ---------------------------------------------------------------------------

/// Sending half shared by provider implementations.
#[derive(Debug, Clone)]
pub struct AuthEventBus {
    sender: broadcast::Sender<AuthEvent>,
}

impl AuthEventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    /// Publishes an event to every live subscriber. Having no subscribers
    /// is not an error.
    pub fn emit(&self, event: AuthEvent) {
        tracing::debug!(
            event = event.kind(),
            subscribers = self.sender.receiver_count(),
            "auth event"
        );
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for AuthEventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving half handed to a consumer by `AuthProvider::subscribe`.
#[derive(Debug)]
pub struct AuthSubscription {
    receiver: broadcast::Receiver<AuthEvent>,
}

impl AuthSubscription {
    /// Waits for the next event.
    ///
    /// Returns `None` once the provider is gone. A subscriber that fell
    /// behind skips the events it missed and keeps going; the newest state
    /// always arrives eventually.
    ///
    /// Cancel-safe: usable as a `tokio::select!` branch.
    pub async fn recv(&mut self) -> Option<AuthEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "auth subscriber lagged, skipping events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Detaches from the provider.
    pub fn unsubscribe(self) {
        drop(self);
    }
}
