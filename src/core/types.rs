//! Core type definitions for the kernel
//!
//! These types provide strong typing for RTOS primitives.

use core::fmt;

/// Task priority (higher value = higher priority, 0 = lowest)
pub type OsPrio = u8;

/// Tick counter type
///
/// 64 bits wide so that absolute deadlines never wrap during the lifetime
/// of the system.
pub type OsTick = u64;

/// Handle to a task registered with the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskId(pub(crate) u8);

impl TaskId {
    /// Slot index of the task inside the kernel
    #[inline(always)]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Task state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OsTaskState {
    /// Task is ready to run
    Ready = 0,
    /// Task is currently being executed by the scheduler
    Running = 1,
    /// Task waits for a delay, a kernel object or a timeout
    Blocked = 2,
    /// Task is suspended and not eligible for scheduling
    Suspended = 3,
}

/// Pend status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OsPendStatus {
    /// Still waiting
    Pending = 0,
    /// Wait satisfied by the object
    Ok = 1,
    /// Deadline passed before the object was satisfied
    Timeout = 2,
}

/// How long a blocking call may wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Timeout {
    /// Never suspend; fail with `WouldBlock` instead
    NoWait,
    /// Wait at most this many ticks
    Ticks(OsTick),
    /// Wait indefinitely
    Forever,
}

impl Timeout {
    /// Build a timeout from a tick count, `0` meaning [`Timeout::NoWait`]
    pub const fn from_ticks(ticks: OsTick) -> Self {
        if ticks == 0 {
            Timeout::NoWait
        } else {
            Timeout::Ticks(ticks)
        }
    }

    /// Whether the call must fail instead of suspending
    ///
    /// `Ticks(0)` behaves like [`Timeout::NoWait`].
    pub const fn is_no_wait(self) -> bool {
        matches!(self, Timeout::NoWait | Timeout::Ticks(0))
    }

    /// Absolute deadline for a wait starting at `now`
    ///
    /// `None` means the wait has no deadline.
    pub(crate) fn deadline(self, now: OsTick) -> Option<OsTick> {
        match self {
            Timeout::NoWait => Some(now),
            Timeout::Ticks(t) => Some(now.saturating_add(t)),
            Timeout::Forever => None,
        }
    }
}

impl From<OsTick> for Timeout {
    fn from(ticks: OsTick) -> Self {
        Timeout::from_ticks(ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_ticks_is_no_wait() {
        assert_eq!(Timeout::from_ticks(0), Timeout::NoWait);
        assert_eq!(Timeout::from(5), Timeout::Ticks(5));
        assert!(Timeout::Ticks(0).is_no_wait());
        assert!(!Timeout::Ticks(1).is_no_wait());
        assert!(!Timeout::Forever.is_no_wait());
    }

    #[test]
    fn deadlines() {
        assert_eq!(Timeout::Ticks(10).deadline(100), Some(110));
        assert_eq!(Timeout::Forever.deadline(100), None);
        assert_eq!(Timeout::Ticks(OsTick::MAX).deadline(1), Some(OsTick::MAX));
    }
}
