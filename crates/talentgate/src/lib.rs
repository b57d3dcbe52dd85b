//! # talentgate
//!
//! Client-side session management for the talentgate job marketplace.
//!
//! The hosted auth service issues short-lived access tokens. This crate
//! keeps them fresh while the app is open, publishes the session state to
//! views and route guards, and checks in with the service while the user is
//! active so the session doesn't silently lapse.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use talentgate::prelude::*;
//!
//! # async fn run() -> Result<(), TalentgateError> {
//! let config = AppConfig::from_env()?;
//! let client = Arc::new(GoTrueClient::new(&config.auth_url, &config.anon_key)?);
//!
//! let session = SessionManager::builder(client)
//!     .config(config.session.clone())
//!     .marker(Arc::new(FileMarker::new(&config.marker_path)))
//!     .mount();
//!
//! let snapshot = session.settled().await?;
//! println!("{}", snapshot.status);
//! session.unmount().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod rate_limit;
pub mod telemetry;

pub use config::{AppConfig, ConfigError};
pub use error::TalentgateError;
pub use rate_limit::{DeleteRateLimiter, RateLimitError, can_delete_with};

pub use talentgate_auth as auth;
pub use talentgate_session as session;
pub use talentgate_timer as timer;

pub mod prelude {
    pub use crate::{AppConfig, DeleteRateLimiter, TalentgateError};
    pub use talentgate_auth::{
        AuthError, AuthEvent, AuthProvider, AuthSession, GoTrueClient, MemoryAuthProvider, User,
        UserId,
    };
    pub use talentgate_session::{
        ActivityTracker, AdminPolicy, FileMarker, GuardDecision, LogKind, MemoryMarker,
        SessionConfig, SessionError, SessionHandle, SessionLog, SessionManager, SessionSnapshot,
        SessionStatus, require_auth,
    };
}
