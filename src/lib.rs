//! tickos: a small real-time kernel in the μC/OS-III mould
//!
//! - Priority-based preemptive scheduling of `async` task bodies
//! - Message queues, mutexes with priority inheritance, software timers
//! - Tick-based absolute and relative delays
//! - Cortex-M SysTick port and a hosted `std` port for simulation
//!
//! All kernel objects are created by the application and shared by
//! reference; there is no global kernel state.

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

// ============ Critical Section ============

#[cfg(target_arch = "arm")]
mod cs_impl {
    use cortex_m::interrupt;
    use cortex_m::register::primask;
    use critical_section::{set_impl, Impl, RawRestoreState};

    struct SingleCoreCriticalSection;
    set_impl!(SingleCoreCriticalSection);

    unsafe impl Impl for SingleCoreCriticalSection {
        unsafe fn acquire() -> RawRestoreState {
            let was_active = primask::read().is_active();
            interrupt::disable();
            was_active
        }

        unsafe fn release(was_active: RawRestoreState) {
            if was_active {
                unsafe { interrupt::enable() }
            }
        }
    }
}

// ============ Modules ============

pub mod log;
mod lang_items;

pub mod core;
pub mod sync;
pub mod port;
pub mod analysis;

#[cfg(all(feature = "mutex", feature = "timers"))]
pub mod blinky;

// ============ Re-exports ============

pub use self::core::config;
pub use self::core::config::*;
pub use self::core::critical;
pub use self::core::error;
pub use self::core::error::{OsError, OsResult};
pub use self::core::kernel;
pub use self::core::kernel::{os_halt, Kernel, Scheduler};
pub use self::core::prio;
pub use self::core::types;
pub use self::core::types::*;
pub use self::core::task;
pub use self::core::sched;
pub use self::core::time;
pub use self::core::time::{Clock, SimClock};

pub use sync::queue;
pub use sync::queue::{Queue, TrySender};
#[cfg(feature = "mutex")]
pub use sync::mutex;
#[cfg(feature = "mutex")]
pub use sync::mutex::Mutex;
#[cfg(feature = "timers")]
pub use sync::timer;
#[cfg(feature = "timers")]
pub use sync::timer::{TimerId, TimerService};
