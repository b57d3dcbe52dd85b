//! Hosted auth service contract for talentgate.
//!
//! This crate describes the identity service the client talks to and ships
//! two implementations of it:
//!
//! 1. **Contract**: [`AuthProvider`], [`AuthEvent`], [`AuthSession`], [`User`]
//! 2. **Hosted client**: [`GoTrueClient`] (HTTP/JSON against a GoTrue-style service)
//! 3. **In-process**: [`MemoryAuthProvider`] (scripted, for tests and demos)
//!
//! # How it fits in the stack
//!
//! ```text
//! Route guards / views (above)  ← read session snapshots
//!     ↕
//! Session layer  ← schedules refreshes, tracks activity
//!     ↕
//! Auth layer (this crate)  ← talks to the identity service
//! ```

mod error;
mod event;
mod gotrue;
mod memory;
mod provider;
mod types;

pub use error::AuthError;
pub use event::{AuthEvent, AuthEventBus, AuthSubscription};
pub use gotrue::{GoTrueClient, SignUpOutcome};
pub use memory::MemoryAuthProvider;
pub use provider::AuthProvider;
pub use types::{AppMetadata, AuthSession, User, UserId};
