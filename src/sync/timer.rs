//! Software timer service
//!
//! Timers are owned by a [`TimerService`], which runs as its own task at
//! [`CFG_TIMER_TASK_PRIO`](crate::config::CFG_TIMER_TASK_PRIO). Callbacks
//! run synchronously on that task. They are plain `Fn`s, so they can only
//! use the non-blocking kernel operations.
//!
//! Due timers fire in expiry order, ties in creation order. An auto-reload
//! timer is re-armed from its previous expiry, not from the current tick;
//! if the service fell behind, the timer fires once per missed period.

use core::convert::Infallible;

use crate::core::cs_cell::CsCell;
use crate::error::{OsError, OsResult};
use crate::kernel::{os_halt, Kernel};
use crate::sync::pend::pend;
use crate::types::{OsPendStatus, OsTick, TaskId};

/// Timer handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerId(u8);

impl TimerId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Timer callback, run on the timer service task
pub type TimerCallback<'t> = &'t dyn Fn(TimerId);

#[derive(Clone, Copy)]
struct OsTimer<'t> {
    name: &'static str,
    period: OsTick,
    auto_reload: bool,
    /// Next expiry while armed
    expiry: Option<OsTick>,
    callback: TimerCallback<'t>,
}

struct TimerState<'t, const N: usize> {
    timers: [Option<OsTimer<'t>>; N],
    count: usize,
    /// Service task, once it ran
    service: Option<TaskId>,
    /// Service task is blocked waiting for the next expiry
    service_waiting: bool,
}

impl<'t, const N: usize> TimerState<'t, N> {
    fn timer_mut(&mut self, id: TimerId) -> OsResult<&mut OsTimer<'t>> {
        self.timers
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(OsError::InvalidArgument)
    }

    fn timer(&self, id: TimerId) -> OsResult<&OsTimer<'t>> {
        self.timers
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(OsError::InvalidArgument)
    }

    /// Earliest armed timer as (expiry, index)
    fn earliest(&self) -> Option<(OsTick, usize)> {
        self.timers
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.as_ref().and_then(|t| t.expiry).map(|e| (e, i)))
            .min()
    }

    /// Take the earliest timer due at `now`, re-arming or stopping it
    fn take_due(&mut self, now: OsTick) -> Option<(TimerId, TimerCallback<'t>)> {
        let (expiry, idx) = self.earliest().filter(|&(e, _)| e <= now)?;
        let timer = self.timers[idx].as_mut()?;
        timer.expiry = if timer.auto_reload {
            Some(expiry.saturating_add(timer.period))
        } else {
            None
        };
        Some((TimerId(idx as u8), timer.callback))
    }
}

/// Software timer service holding up to `N` timers
pub struct TimerService<'k, 't, const N: usize> {
    kernel: &'k Kernel,
    state: CsCell<TimerState<'t, N>>,
}

impl<'k, 't, const N: usize> TimerService<'k, 't, N> {
    const IDS_FIT: () = assert!(N <= u8::MAX as usize + 1, "timer ids are 8 bits wide");

    /// Create an empty service
    ///
    /// Fails to build when `N` exceeds 256 timers.
    pub fn new(kernel: &'k Kernel) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::IDS_FIT;
        Self {
            kernel,
            state: CsCell::new(TimerState {
                timers: [None; N],
                count: 0,
                service: None,
                service_waiting: false,
            }),
        }
    }

    /// Create a dormant timer
    ///
    /// # Arguments
    /// * `name` - Timer name for debugging
    /// * `period` - Ticks between expiries
    /// * `auto_reload` - Re-arm after each expiry
    /// * `callback` - Called on the service task at each expiry
    ///
    /// # Returns
    /// * `Err(OsError::InvalidArgument)` - `period` is zero
    /// * `Err(OsError::ResourceExhausted)` - All `N` timers in use
    pub fn create_timer(
        &self,
        name: &'static str,
        period: OsTick,
        auto_reload: bool,
        callback: TimerCallback<'t>,
    ) -> OsResult<TimerId> {
        if period == 0 {
            return Err(OsError::InvalidArgument);
        }

        self.state.with(|st| {
            if st.count >= N {
                return Err(OsError::ResourceExhausted);
            }
            let id = TimerId(st.count as u8);
            st.timers[st.count] = Some(OsTimer {
                name,
                period,
                auto_reload,
                expiry: None,
                callback,
            });
            st.count += 1;
            crate::debug!("created timer {} period {}", name, period);
            Ok(id)
        })
    }

    /// Arm a timer to expire one period from now
    pub fn start(&self, id: TimerId) -> OsResult<()> {
        let now = self.kernel.now();
        self.command(|st| {
            let t = st.timer_mut(id)?;
            t.expiry = Some(now.saturating_add(t.period));
            Ok(())
        })
    }

    /// Restart the period from now, discarding the pending expiry
    ///
    /// A dormant timer is started.
    pub fn reset(&self, id: TimerId) -> OsResult<()> {
        self.start(id)
    }

    /// Disarm a timer
    pub fn stop(&self, id: TimerId) -> OsResult<()> {
        self.command(|st| {
            st.timer_mut(id)?.expiry = None;
            Ok(())
        })
    }

    /// Set a new period and arm the timer one new period from now
    pub fn change_period(&self, id: TimerId, period: OsTick) -> OsResult<()> {
        if period == 0 {
            return Err(OsError::InvalidArgument);
        }
        let now = self.kernel.now();
        self.command(|st| {
            let t = st.timer_mut(id)?;
            t.period = period;
            t.expiry = Some(now.saturating_add(period));
            Ok(())
        })
    }

    pub fn is_active(&self, id: TimerId) -> OsResult<bool> {
        self.state.with(|st| st.timer(id).map(|t| t.expiry.is_some()))
    }

    /// Next expiry of an armed timer
    pub fn expiry(&self, id: TimerId) -> OsResult<Option<OsTick>> {
        self.state.with(|st| st.timer(id).map(|t| t.expiry))
    }

    pub fn period(&self, id: TimerId) -> OsResult<OsTick> {
        self.state.with(|st| st.timer(id).map(|t| t.period))
    }

    pub fn name(&self, id: TimerId) -> OsResult<&'static str> {
        self.state.with(|st| st.timer(id).map(|t| t.name))
    }

    /// Apply a change and let the service re-evaluate its next expiry
    fn command(&self, f: impl FnOnce(&mut TimerState<'t, N>) -> OsResult<()>) -> OsResult<()> {
        self.state.with(|st| {
            f(st)?;
            if st.service_waiting {
                if let Some(svc) = st.service {
                    st.service_waiting = false;
                    self.kernel.wake(svc, OsPendStatus::Ok);
                }
            }
            Ok(())
        })
    }

    /// Timer service task body
    ///
    /// Spawn it with [`Scheduler::create_timer_task`](crate::kernel::Scheduler::create_timer_task).
    pub async fn run(&self) -> Infallible {
        loop {
            let now = self.kernel.now();

            // Callbacks may issue timer commands, so run them outside the cell.
            if let Some((id, callback)) = self.state.with(|st| st.take_due(now)) {
                crate::trace!("timer {} fired at {}", id.index(), now);
                callback(id);
                continue;
            }

            let blocked: OsResult<TaskId> = self.state.with(|st| {
                let deadline = st.earliest().map(|(e, _)| e);
                let id = self.kernel.block_current(deadline)?;
                st.service = Some(id);
                st.service_waiting = true;
                Ok(id)
            });

            match blocked {
                Ok(id) => {
                    pend(self.kernel, id).await;
                    self.state.with(|st| st.service_waiting = false);
                }
                Err(err) => os_halt(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: TimerId) {}

    #[test]
    fn due_timers_fire_in_order_and_reload() {
        let kernel = Kernel::new();
        let svc: TimerService<'_, '_, 3> = TimerService::new(&kernel);
        let a = svc.create_timer("a", 10, true, &noop).unwrap();
        let b = svc.create_timer("b", 10, false, &noop).unwrap();
        svc.start(b).unwrap();
        svc.start(a).unwrap();

        let fired = svc.state.with(|st| {
            let first = st.take_due(10).map(|(id, _)| id);
            let second = st.take_due(10).map(|(id, _)| id);
            let third = st.take_due(10).map(|(id, _)| id);
            [first, second, third]
        });
        assert_eq!(fired, [Some(a), Some(b), None]);
        assert_eq!(svc.expiry(a), Ok(Some(20)));
        assert_eq!(svc.is_active(b), Ok(false));
    }

    #[test]
    fn backlog_fires_once_per_period() {
        let kernel = Kernel::new();
        let svc: TimerService<'_, '_, 1> = TimerService::new(&kernel);
        let t = svc.create_timer("t", 5, true, &noop).unwrap();
        svc.start(t).unwrap();

        let count = svc
            .state
            .with(|st| core::iter::from_fn(|| st.take_due(17)).count());
        assert_eq!(count, 3);
        assert_eq!(svc.expiry(t), Ok(Some(20)));
    }

    #[test]
    fn full_id_range_is_usable() {
        let kernel = Kernel::new();
        let svc: TimerService<'_, '_, 256> = TimerService::new(&kernel);
        let ids: Vec<TimerId> = (0..256)
            .map(|_| svc.create_timer("t", 1, false, &noop).unwrap())
            .collect();
        assert_eq!(ids[255].index(), 255);
        assert_eq!(ids.iter().filter(|id| id.index() == 0).count(), 1);
        assert_eq!(
            svc.create_timer("extra", 1, false, &noop),
            Err(OsError::ResourceExhausted)
        );
    }

    #[test]
    fn creation_limits() {
        let kernel = Kernel::new();
        let svc: TimerService<'_, '_, 1> = TimerService::new(&kernel);
        assert_eq!(
            svc.create_timer("zero", 0, false, &noop),
            Err(OsError::InvalidArgument)
        );
        svc.create_timer("t", 1, false, &noop).unwrap();
        assert_eq!(
            svc.create_timer("t2", 1, false, &noop),
            Err(OsError::ResourceExhausted)
        );
        assert_eq!(svc.stop(TimerId(7)), Err(OsError::InvalidArgument));
    }
}
