//! Compile-time configuration for the kernel
//!
//! These constants control the behavior and resource limits of the RTOS.

use crate::types::{OsPrio, OsTick};

/// Maximum number of priority levels
pub const CFG_PRIO_MAX: usize = 32;

/// Maximum number of tasks, the timer service included
pub const CFG_TASK_MAX: usize = 16;

/// System tick rate in Hz
pub const CFG_TICK_RATE_HZ: u32 = 1000;

/// Minimum task stack budget in bytes
pub const CFG_STK_SIZE_MIN: usize = 64;

/// Stack budget used by the demo tasks
pub const CFG_STK_SIZE_DEFAULT: usize = 4096;

/// Timer service priority: above every application priority
pub const CFG_TIMER_TASK_PRIO: OsPrio = (CFG_PRIO_MAX - 1) as OsPrio;

/// Timer service stack budget
pub const CFG_TIMER_TASK_STK_SIZE: usize = 1024;

/// Idle priority
pub const CFG_PRIO_IDLE: OsPrio = 0;

/// Convert milliseconds to ticks, rounding down
#[inline]
pub const fn ms_to_ticks(ms: u64) -> OsTick {
    ms * CFG_TICK_RATE_HZ as u64 / 1000
}
