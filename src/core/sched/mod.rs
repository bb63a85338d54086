//! Scheduler module
//!
//! Strict priority scheduling with FIFO order among equal priorities.
//!
//! The running task stays linked at the head of its ready list. A task
//! that becomes ready is appended to the tail of its list, so among equal
//! priorities the task that became ready first runs first, and a task that
//! is preempted resumes before its peers.

mod rdy_list;

pub use rdy_list::ReadyList;

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use crate::config::{CFG_PRIO_MAX, CFG_TASK_MAX};
use crate::error::{OsError, OsResult};
use crate::kernel::Kernel;
use crate::prio::PrioTable;
use crate::task::OsTcb;
use crate::types::{OsPendStatus, OsPrio, OsTaskState, OsTick, TaskId};

/// Scheduler state: TCB table, ready lists and the running task
pub(crate) struct SchedState {
    pub(crate) tcbs: [OsTcb; CFG_TASK_MAX],
    pub(crate) task_count: usize,
    prio_tbl: PrioTable,
    rdy_list: [ReadyList; CFG_PRIO_MAX],
    /// Task currently being polled
    pub(crate) cur: Option<TaskId>,
    block_seq: u32,
}

impl SchedState {
    pub(crate) const fn new() -> Self {
        Self {
            tcbs: [OsTcb::new(); CFG_TASK_MAX],
            task_count: 0,
            prio_tbl: PrioTable::new(),
            rdy_list: [ReadyList::new(); CFG_PRIO_MAX],
            cur: None,
            block_seq: 0,
        }
    }

    #[inline]
    pub(crate) fn tcb(&self, id: TaskId) -> OsResult<&OsTcb> {
        if id.index() < self.task_count {
            Ok(&self.tcbs[id.index()])
        } else {
            Err(OsError::TaskInvalid)
        }
    }

    #[inline]
    fn tcb_mut(&mut self, id: TaskId) -> OsResult<&mut OsTcb> {
        if id.index() < self.task_count {
            Ok(&mut self.tcbs[id.index()])
        } else {
            Err(OsError::TaskInvalid)
        }
    }

    /// Register a new ready task
    pub(crate) fn add_task(
        &mut self,
        name: &'static str,
        prio: OsPrio,
        stk_size: usize,
    ) -> OsResult<TaskId> {
        if prio as usize >= CFG_PRIO_MAX {
            return Err(OsError::InvalidArgument);
        }
        if self.task_count >= CFG_TASK_MAX {
            return Err(OsError::ResourceExhausted);
        }

        let id = TaskId(self.task_count as u8);
        self.tcbs[id.index()] = OsTcb {
            name,
            prio,
            base_prio: prio,
            task_state: OsTaskState::Ready,
            stk_size,
            ..OsTcb::new()
        };
        self.task_count += 1;
        self.rdy_insert(id);
        Ok(id)
    }

    /// Make a task ready
    fn rdy_insert(&mut self, id: TaskId) {
        let prio = self.tcbs[id.index()].prio;
        self.rdy_list[prio as usize].insert_tail(&mut self.tcbs, id);
        self.prio_tbl.insert(prio);
    }

    /// Put a task back at the head of its ready list
    fn rdy_insert_head(&mut self, id: TaskId) {
        let prio = self.tcbs[id.index()].prio;
        self.rdy_list[prio as usize].insert_head(&mut self.tcbs, id);
        self.prio_tbl.insert(prio);
    }

    /// Remove a task from ready list
    fn rdy_remove(&mut self, id: TaskId) {
        let prio = self.tcbs[id.index()].prio;
        let rdy_list = &mut self.rdy_list[prio as usize];
        rdy_list.remove(&mut self.tcbs, id);
        if rdy_list.is_empty() {
            self.prio_tbl.remove(prio);
        }
    }

    /// Head of the highest non-empty ready list
    pub(crate) fn highest_ready(&self) -> Option<TaskId> {
        let prio = self.prio_tbl.get_highest()?;
        self.rdy_list[prio as usize].head()
    }

    /// Pick the task to poll next and mark it running
    pub(crate) fn select_next(&mut self) -> Option<TaskId> {
        let id = self.highest_ready()?;
        self.tcbs[id.index()].task_state = OsTaskState::Running;
        self.cur = Some(id);
        Some(id)
    }

    /// Bookkeeping after the polled task handed control back
    pub(crate) fn finish_poll(&mut self, id: TaskId) {
        let tcb = &mut self.tcbs[id.index()];
        if tcb.task_state == OsTaskState::Running {
            tcb.task_state = OsTaskState::Ready;
        }
        self.cur = None;
    }

    /// Move the running task to the tail of its ready list
    pub(crate) fn rotate_current(&mut self) {
        if let Some(cur) = self.cur {
            if self.tcbs[cur.index()].task_state == OsTaskState::Running {
                self.rdy_remove(cur);
                self.rdy_insert(cur);
            }
        }
    }

    /// Block the running task until woken or until `deadline`
    pub(crate) fn block_current(&mut self, deadline: Option<OsTick>) -> OsResult<TaskId> {
        let id = self.cur.ok_or(OsError::NotInTask)?;
        if self.tcbs[id.index()].task_state != OsTaskState::Running {
            return Err(OsError::NotInTask);
        }
        self.rdy_remove(id);

        let seq = self.block_seq;
        self.block_seq = self.block_seq.wrapping_add(1);

        let tcb = &mut self.tcbs[id.index()];
        tcb.task_state = OsTaskState::Blocked;
        tcb.deadline = deadline;
        tcb.pend_status = OsPendStatus::Pending;
        tcb.block_seq = seq;
        Ok(id)
    }

    /// End the wait of a blocked task
    ///
    /// A task that already timed out but has not run yet gets its status
    /// upgraded when the object it waited on was satisfied after all.
    pub(crate) fn wake(&mut self, id: TaskId, status: OsPendStatus) {
        let tcb = &mut self.tcbs[id.index()];
        match tcb.task_state {
            OsTaskState::Blocked => {
                tcb.deadline = None;
                tcb.pend_status = status;
                if tcb.suspend_pending {
                    tcb.suspend_pending = false;
                    tcb.task_state = OsTaskState::Suspended;
                } else {
                    tcb.task_state = OsTaskState::Ready;
                    self.rdy_insert(id);
                }
            }
            _ => {
                if status == OsPendStatus::Ok && tcb.pend_status == OsPendStatus::Timeout {
                    tcb.pend_status = OsPendStatus::Ok;
                }
            }
        }
    }

    /// Wake every blocked task whose deadline is at or before `now`
    ///
    /// Tasks are woken in deadline order, ties in the order they blocked.
    /// Returns the number of tasks woken.
    pub(crate) fn expire(&mut self, now: OsTick) -> usize {
        let mut woken = 0;
        loop {
            let next = self.tcbs[..self.task_count]
                .iter()
                .enumerate()
                .filter(|(_, t)| t.is_blocked())
                .filter_map(|(i, t)| t.deadline.map(|d| (d, t.block_seq, i)))
                .filter(|&(d, _, _)| d <= now)
                .min();

            match next {
                Some((_, _, idx)) => {
                    self.wake(TaskId(idx as u8), OsPendStatus::Timeout);
                    woken += 1;
                }
                None => return woken,
            }
        }
    }

    /// Earliest deadline among blocked tasks
    pub(crate) fn next_deadline(&self) -> Option<OsTick> {
        self.tcbs[..self.task_count]
            .iter()
            .filter(|t| t.is_blocked())
            .filter_map(|t| t.deadline)
            .min()
    }

    /// Change the effective priority of a task
    ///
    /// The running task keeps the head of its new list, so it still
    /// resumes before its peers once it is preempted.
    pub(crate) fn set_prio(&mut self, id: TaskId, prio: OsPrio) {
        if self.tcbs[id.index()].prio == prio {
            return;
        }
        match self.tcbs[id.index()].task_state {
            OsTaskState::Running => {
                self.rdy_remove(id);
                self.tcbs[id.index()].prio = prio;
                self.rdy_insert_head(id);
            }
            OsTaskState::Ready => {
                self.rdy_remove(id);
                self.tcbs[id.index()].prio = prio;
                self.rdy_insert(id);
            }
            OsTaskState::Blocked | OsTaskState::Suspended => self.tcbs[id.index()].prio = prio,
        }
    }

    pub(crate) fn suspend(&mut self, id: TaskId) -> OsResult<()> {
        let tcb = self.tcb(id)?;
        if tcb.is_ready() {
            self.rdy_remove(id);
            self.tcbs[id.index()].task_state = OsTaskState::Suspended;
        } else if tcb.is_blocked() {
            self.tcbs[id.index()].suspend_pending = true;
        }
        Ok(())
    }

    pub(crate) fn resume(&mut self, id: TaskId) -> OsResult<()> {
        let tcb = self.tcb_mut(id)?;
        match (tcb.task_state, tcb.suspend_pending) {
            (OsTaskState::Suspended, _) => {
                tcb.task_state = OsTaskState::Ready;
                self.rdy_insert(id);
                Ok(())
            }
            (OsTaskState::Blocked, true) => {
                tcb.suspend_pending = false;
                Ok(())
            }
            _ => Err(OsError::TaskNotSuspended),
        }
    }
}

/// Future returned by [`Kernel::preemption_point`]
///
/// Hands control back to the scheduler once. The scheduler samples the
/// clock, wakes tasks whose deadline passed and then resumes the highest
/// priority ready task; that is the caller again, still at the head of
/// its list, unless something more urgent became ready.
#[must_use = "futures do nothing unless awaited"]
pub struct PreemptionPoint {
    yielded: bool,
}

impl PreemptionPoint {
    pub(crate) fn new() -> Self {
        Self { yielded: false }
    }
}

impl Future for PreemptionPoint {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            Poll::Pending
        }
    }
}

/// Future returned by [`Kernel::yield_now`]
#[must_use = "futures do nothing unless awaited"]
pub struct YieldNow<'k> {
    kernel: &'k Kernel,
    yielded: bool,
}

impl<'k> YieldNow<'k> {
    pub(crate) fn new(kernel: &'k Kernel) -> Self {
        Self {
            kernel,
            yielded: false,
        }
    }
}

impl Future for YieldNow<'_> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        self.kernel.rotate_current();
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highest_priority_first_then_fifo() {
        let mut s = SchedState::new();
        let low = s.add_task("low", 1, 64).unwrap();
        let a = s.add_task("a", 3, 64).unwrap();
        let b = s.add_task("b", 3, 64).unwrap();

        assert_eq!(s.select_next(), Some(a));
        s.finish_poll(a);
        assert_eq!(s.select_next(), Some(a));
        s.block_current(None).unwrap();
        s.finish_poll(a);
        assert_eq!(s.select_next(), Some(b));
        s.block_current(None).unwrap();
        s.finish_poll(b);
        assert_eq!(s.select_next(), Some(low));

        s.wake(b, OsPendStatus::Ok);
        s.wake(a, OsPendStatus::Ok);
        assert_eq!(s.highest_ready(), Some(b));
        s.finish_poll(low);
        assert_eq!(s.select_next(), Some(b));
    }

    #[test]
    fn expire_wakes_in_deadline_order() {
        let mut s = SchedState::new();
        let ids = [
            s.add_task("t0", 2, 64).unwrap(),
            s.add_task("t1", 2, 64).unwrap(),
            s.add_task("t2", 2, 64).unwrap(),
        ];
        let deadlines = [30, 10, 20];
        for (id, d) in ids.iter().zip(deadlines) {
            assert_eq!(s.select_next(), Some(*id));
            s.block_current(Some(d)).unwrap();
            s.finish_poll(*id);
        }
        assert_eq!(s.next_deadline(), Some(10));
        assert_eq!(s.expire(25), 2);
        assert_eq!(s.tcbs[1].pend_status, OsPendStatus::Timeout);
        assert_eq!(s.select_next(), Some(ids[1]));
        s.finish_poll(ids[1]);
        assert_eq!(s.next_deadline(), Some(30));
    }

    #[test]
    fn suspend_blocked_task_defers_until_wake() {
        let mut s = SchedState::new();
        let t = s.add_task("t", 1, 64).unwrap();
        s.select_next();
        s.block_current(Some(5)).unwrap();
        s.finish_poll(t);
        s.suspend(t).unwrap();
        s.expire(5);
        assert_eq!(s.tcbs[0].task_state, OsTaskState::Suspended);
        assert_eq!(s.select_next(), None);
        s.resume(t).unwrap();
        assert_eq!(s.select_next(), Some(t));
        assert_eq!(s.resume(t), Err(OsError::TaskNotSuspended));
    }

    #[test]
    fn priority_change_moves_ready_task() {
        let mut s = SchedState::new();
        let a = s.add_task("a", 1, 64).unwrap();
        let b = s.add_task("b", 2, 64).unwrap();
        assert_eq!(s.highest_ready(), Some(b));
        s.set_prio(a, 5);
        assert_eq!(s.highest_ready(), Some(a));
        s.set_prio(a, 1);
        assert_eq!(s.highest_ready(), Some(b));
    }

    #[test]
    fn running_task_keeps_its_turn_across_priority_changes() {
        let mut s = SchedState::new();
        let owner = s.add_task("owner", 1, 64).unwrap();
        let peer = s.add_task("peer", 1, 64).unwrap();

        assert_eq!(s.select_next(), Some(owner));
        s.set_prio(owner, 5);
        s.set_prio(owner, 1);
        s.finish_poll(owner);
        assert_eq!(s.select_next(), Some(owner));
        s.finish_poll(owner);

        // A ready task that is not running goes to the tail
        s.set_prio(owner, 2);
        s.set_prio(owner, 1);
        assert_eq!(s.select_next(), Some(peer));
    }

    #[test]
    fn creation_limits() {
        let mut s = SchedState::new();
        assert_eq!(
            s.add_task("bad", CFG_PRIO_MAX as OsPrio, 64),
            Err(OsError::InvalidArgument)
        );
        for _ in 0..CFG_TASK_MAX {
            s.add_task("t", 1, 64).unwrap();
        }
        assert_eq!(s.add_task("t", 1, 64), Err(OsError::ResourceExhausted));
    }
}
