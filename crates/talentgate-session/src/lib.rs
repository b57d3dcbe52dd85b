//! Client-side session lifecycle for talentgate.
//!
//! A mounted [`SessionManager`] keeps the signed-in user's access token
//! fresh for as long as the app is open:
//!
//! - fetches the stored session on mount and follows auth events after that
//! - refreshes the token shortly before it expires
//! - checks in with the auth service periodically while the user is active
//! - publishes a [`SessionSnapshot`] that views and route guards read
//!
//! # Key types
//!
//! - [`SessionManager`]: builds and mounts the manager
//! - [`SessionHandle`]: reads snapshots, records activity, unmounts
//! - [`SessionStatus`]: `Loading → Authenticated → Unauthenticated`
//! - [`SessionConfig`]: refresh margin, keep-alive period, retry policy
//! - [`SessionLog`]: diagnostic ring buffer of lifecycle events
//! - [`require_auth`], [`AdminPolicy`]: route guard decisions

mod clock;
mod config;
mod error;
mod guard;
mod log;
mod manager;
mod marker;
mod policy;
mod status;

pub use clock::{ActivityTracker, Clock};
pub use config::{RetryPolicy, SessionConfig};
pub use error::SessionError;
pub use guard::{AdminPolicy, GuardDecision, HOME_ROUTE, LOGIN_ROUTE, require_auth};
pub use log::{LogEntry, LogKind, LogSink, LogStats, SessionLog};
pub use manager::{SessionHandle, SessionManager, SessionManagerBuilder};
pub use marker::{FileMarker, MarkerError, MarkerRecord, MemoryMarker, SessionMarker};
pub use policy::refresh_delay;
pub use status::{SessionSnapshot, SessionStatus};
