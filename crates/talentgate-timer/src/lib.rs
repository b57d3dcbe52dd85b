//! Scheduled-task primitives for the talentgate session layer.
//!
//! Three small timers, each owned by a single actor and polled from its
//! `tokio::select!` loop:
//!
//! - [`RefreshDeadline`]: a one-shot slot holding at most one pending
//!   deadline. Arming it again replaces (cancels) the previous deadline.
//! - [`KeepAliveTicker`]: a fixed-period tick that never bursts to catch up.
//! - [`RetryBackoff`]: bounded exponential backoff with random jitter.
//!
//! # Integration
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         _ = deadline.fired() => { /* refresh, then deadline.arm_after(..) */ }
//!         _ = ticker.tick() => { /* keep-alive check */ }
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!     }
//! }
//! ```
//!
//! An unarmed deadline or a paused ticker pends forever, so its branch
//! simply never wins the `select!`.

mod backoff;
mod deadline;
mod ticker;

pub use backoff::RetryBackoff;
pub use deadline::{Fired, RefreshDeadline};
pub use ticker::KeepAliveTicker;

use std::time::Duration;

use tokio::time::Instant as TokioInstant;

/// Delays past this are treated as "never" rather than overflowing `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

fn instant_after(delay: Duration) -> TokioInstant {
    let now = TokioInstant::now();
    now.checked_add(delay.min(FAR_FUTURE)).unwrap_or(now)
}
