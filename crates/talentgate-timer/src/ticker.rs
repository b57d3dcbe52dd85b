//! Fixed-period keep-alive ticker.

use std::time::Duration;

use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace};

/// Fires every `period`, starting one period after creation.
///
/// After each tick the next one is scheduled from *now*, not from the
/// missed deadline: a stalled event loop produces one late tick, never a
/// burst. A zero period disables the ticker (it pends forever), which is
/// how keep-alive is switched off.
#[derive(Debug)]
pub struct KeepAliveTicker {
    period: Duration,
    next: TokioInstant,
    paused: bool,
    ticks: u64,
}

impl KeepAliveTicker {
    pub fn new(period: Duration) -> Self {
        if period.is_zero() {
            debug!("keep-alive ticker disabled (zero period)");
        } else {
            debug!(period_ms = period.as_millis() as u64, "keep-alive ticker created");
        }
        Self {
            period,
            next: crate::instant_after(period),
            paused: false,
            ticks: 0,
        }
    }

    /// Waits for the next tick and returns its sequence number (from 1).
    ///
    /// Pends forever while paused or disabled. Cancel-safe.
    pub async fn tick(&mut self) -> u64 {
        if self.paused || self.period.is_zero() {
            return std::future::pending::<u64>().await;
        }

        time::sleep_until(self.next).await;

        self.ticks += 1;
        self.next = crate::instant_after(self.period);
        trace!(tick = self.ticks, "keep-alive tick");
        self.ticks
    }

    /// Stops ticking until [`resume`](Self::resume). Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.ticks, "keep-alive ticker paused");
        }
    }

    /// Resumes ticking; the next tick is one full period from now.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.next = crate::instant_after(self.period);
            debug!(tick = self.ticks, "keep-alive ticker resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_disabled(&self) -> bool {
        self.period.is_zero()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Ticks fired so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
