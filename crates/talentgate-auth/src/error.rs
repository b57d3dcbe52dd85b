//! Error types for the auth layer.

/// Errors returned by an [`AuthProvider`](crate::AuthProvider).
///
/// Every variant carries owned, cloneable data so that scripted providers
/// can hand out the same failure more than once and the session layer can
/// copy a message into its diagnostic log without holding on to the error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The request never produced a response: DNS, connect, TLS, timeout.
    #[error("network error: {0}")]
    Network(String),

    /// The auth service answered with a non-success status.
    #[error("auth service rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The refresh token is unknown, revoked or expired. Only a new
    /// sign-in can recover from this.
    #[error("refresh token is invalid or expired")]
    InvalidRefreshToken,

    /// An operation needed a stored session and there was none.
    #[error("no active session")]
    NoSession,

    /// The response body did not match the expected shape.
    #[error("failed to decode auth response: {0}")]
    Decode(String),

    /// The client was built with unusable settings (bad URL, empty key).
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl AuthError {
    /// Returns `true` for failures that may succeed if tried again later.
    ///
    /// Transport failures and server-side (5xx) rejections qualify; an
    /// invalid refresh token or a 4xx never does.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Decode(err.to_string());
        }
        match err.status() {
            Some(status) => Self::Rejected {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => Self::Network(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
