//! Task management module
//!
//! A task body is a pinned future that never completes. The scheduler
//! polls it whenever the task is the highest priority ready task; every
//! `.await` on a kernel operation is a potential scheduling point.

mod tcb;

pub use tcb::OsTcb;

use core::convert::Infallible;
use core::future::Future;
use core::pin::Pin;
use core::task::{RawWaker, RawWakerVTable, Waker};

use crate::config::{CFG_PRIO_MAX, CFG_STK_SIZE_MIN};
use crate::error::{OsError, OsResult};
use crate::types::OsPrio;

/// Task body as stored by the scheduler
pub type TaskFuture<'t> = Pin<&'t mut (dyn Future<Output = Infallible> + 't)>;

/// Validate task creation parameters
///
/// # Arguments
/// * `prio` - Task priority
/// * `stk_size` - Stack budget in bytes
/// * `body_size` - Size of the task body
pub(crate) fn check_task_params(prio: OsPrio, stk_size: usize, body_size: usize) -> OsResult<()> {
    if prio as usize >= CFG_PRIO_MAX {
        return Err(OsError::InvalidArgument);
    }

    if stk_size < CFG_STK_SIZE_MIN {
        return Err(OsError::InvalidArgument);
    }

    if body_size > stk_size {
        return Err(OsError::ResourceExhausted);
    }

    Ok(())
}

// Kernel objects wake tasks through the scheduler, never through the
// context waker.
const NOOP_VTABLE: RawWakerVTable = RawWakerVTable::new(
    |_| RawWaker::new(core::ptr::null(), &NOOP_VTABLE),
    |_| {},
    |_| {},
    |_| {},
);

/// Waker handed to task bodies
pub(crate) fn noop_waker() -> Waker {
    // SAFETY: every vtable entry ignores the data pointer.
    unsafe { Waker::from_raw(RawWaker::new(core::ptr::null(), &NOOP_VTABLE)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_params() {
        assert_eq!(check_task_params(1, 256, 128), Ok(()));
        assert_eq!(check_task_params(CFG_PRIO_MAX as OsPrio, 256, 128), Err(OsError::InvalidArgument));
        assert_eq!(check_task_params(1, CFG_STK_SIZE_MIN - 1, 0), Err(OsError::InvalidArgument));
        assert_eq!(check_task_params(1, 256, 257), Err(OsError::ResourceExhausted));
    }
}
