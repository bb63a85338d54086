//! Task Control Block (TCB) definition
//!
//! The TCB contains all the information needed to manage a task. The task
//! body itself (its future) is owned by the scheduler, not the TCB.

use crate::types::{OsPendStatus, OsPrio, OsTaskState, OsTick, TaskId};

/// Task Control Block
#[derive(Debug, Clone, Copy)]
pub struct OsTcb {
    // ============ Task identification ============
    /// Task name
    pub name: &'static str,

    // ============ Ready list links ============
    /// Next TCB in ready list
    pub next: Option<TaskId>,
    /// Previous TCB in ready list
    pub prev: Option<TaskId>,

    // ============ Priority ============
    /// Current (possibly inherited) priority
    pub prio: OsPrio,
    /// Base priority
    pub base_prio: OsPrio,

    // ============ State ============
    /// Current task state
    pub task_state: OsTaskState,
    /// Suspension requested while blocked
    pub suspend_pending: bool,

    // ============ Pend / delay ============
    /// Absolute tick at which a blocked task is woken with a timeout
    pub deadline: Option<OsTick>,
    /// Result of the last pend operation
    pub pend_status: OsPendStatus,
    /// Order in which the task blocked, breaks deadline ties
    pub block_seq: u32,

    // ============ Stack ============
    /// Bytes reserved for the task body
    pub stk_size: usize,
}

impl OsTcb {
    /// Create a new, uninitialized TCB
    pub const fn new() -> Self {
        OsTcb {
            name: "",
            next: None,
            prev: None,
            prio: 0,
            base_prio: 0,
            task_state: OsTaskState::Suspended,
            suspend_pending: false,
            deadline: None,
            pend_status: OsPendStatus::Ok,
            block_seq: 0,
            stk_size: 0,
        }
    }

    /// Check if task sits in a ready list
    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self.task_state, OsTaskState::Ready | OsTaskState::Running)
    }

    /// Check if task is blocked
    #[inline]
    pub fn is_blocked(&self) -> bool {
        self.task_state == OsTaskState::Blocked
    }
}

impl Default for OsTcb {
    fn default() -> Self {
        Self::new()
    }
}
