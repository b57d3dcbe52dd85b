//! Unified error type for talentgate.

use talentgate_auth::AuthError;
use talentgate_session::{MarkerError, SessionError};

use crate::{ConfigError, RateLimitError};

/// Top-level error that wraps every crate-specific error, so `?` works
/// across layers.
#[derive(Debug, thiserror::Error)]
pub enum TalentgateError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Marker(#[from] MarkerError),

    #[error(transparent)]
    RateLimit(#[from] RateLimitError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
