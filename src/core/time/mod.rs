//! Time management module
//!
//! Provides absolute and relative delays. Ticks are sampled from a
//! [`Clock`] by the scheduler; tasks only ever read the sampled value.

mod clock;

pub use clock::{Clock, SimClock};

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use crate::config::CFG_TICK_RATE_HZ;
use crate::error::{OsError, OsResult};
use crate::kernel::{os_halt, Kernel};
use crate::types::{OsPendStatus, OsTick, TaskId};

impl Kernel {
    /// Block the calling task until the tick reaches `until`
    ///
    /// Completes at once if `until` already passed. Periodic tasks keep an
    /// absolute wake tick and add their period to it, so scheduling jitter
    /// never accumulates.
    pub fn delay_until(&self, until: OsTick) -> Delay<'_> {
        Delay {
            kernel: self,
            until,
            task: None,
        }
    }

    /// Block the calling task for `ticks` ticks
    pub fn delay_for(&self, ticks: OsTick) -> Delay<'_> {
        self.delay_until(self.now().saturating_add(ticks))
    }

    /// Time delay in hours, minutes, seconds, milliseconds
    ///
    /// # Arguments
    /// * `hours` - Hours (0-999)
    /// * `minutes` - Minutes (0-59)
    /// * `seconds` - Seconds (0-59)
    /// * `milliseconds` - Milliseconds (0-999)
    pub fn delay_hmsm(
        &self,
        hours: u16,
        minutes: u8,
        seconds: u8,
        milliseconds: u16,
    ) -> OsResult<Delay<'_>> {
        if hours > 999 || minutes > 59 || seconds > 59 || milliseconds > 999 {
            return Err(OsError::InvalidArgument);
        }

        let total_ms = (hours as u64) * 3_600_000
            + (minutes as u64) * 60_000
            + (seconds as u64) * 1000
            + (milliseconds as u64);

        let ticks = total_ms * CFG_TICK_RATE_HZ as u64 / 1000;

        Ok(self.delay_for(ticks))
    }
}

/// Future returned by [`Kernel::delay_until`] and [`Kernel::delay_for`]
#[must_use = "futures do nothing unless awaited"]
pub struct Delay<'k> {
    kernel: &'k Kernel,
    until: OsTick,
    task: Option<TaskId>,
}

impl Delay<'_> {
    /// Absolute wake tick
    pub fn deadline(&self) -> OsTick {
        self.until
    }
}

impl Future for Delay<'_> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        match self.task {
            None => {
                if self.until <= self.kernel.now() {
                    return Poll::Ready(());
                }
                match self.kernel.block_current(Some(self.until)) {
                    Ok(id) => {
                        self.task = Some(id);
                        Poll::Pending
                    }
                    Err(err) => os_halt(err),
                }
            }
            Some(id) => match self.kernel.pend_status(id) {
                OsPendStatus::Pending => Poll::Pending,
                _ => Poll::Ready(()),
            },
        }
    }
}
