//! Pend plumbing shared by the kernel objects
//!
//! Every object keeps its own [`WaitList`], ordered by priority. A blocked task is woken
//! either by the object (which removes it from the list first) or by a
//! timeout (which leaves it in the list). Once the [`Pend`] future resolves
//! the object checks list membership: still listed means the wait timed out.

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use crate::config::CFG_TASK_MAX;
use crate::kernel::Kernel;
use crate::types::{OsPendStatus, OsPrio, TaskId};

/// Tasks waiting on an object, highest priority first
#[derive(Debug, Clone, Copy)]
pub(crate) struct WaitList {
    ids: [TaskId; CFG_TASK_MAX],
    len: usize,
}

impl WaitList {
    pub(crate) const fn new() -> Self {
        Self {
            ids: [TaskId(0); CFG_TASK_MAX],
            len: 0,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Insert behind every task of the same or higher priority
    ///
    /// The list stays ordered by priority, FIFO among equal priorities. A
    /// task only ever waits on one object at a time, so the list can
    /// neither overflow nor hold an id twice.
    pub(crate) fn push(&mut self, id: TaskId, prio_of: impl Fn(TaskId) -> OsPrio) {
        debug_assert!(!self.contains(id), "{} queued twice", id);
        if self.len >= CFG_TASK_MAX {
            return;
        }
        let prio = prio_of(id);
        let pos = self
            .iter()
            .position(|t| prio_of(t) < prio)
            .unwrap_or(self.len);
        self.ids.copy_within(pos..self.len, pos + 1);
        self.ids[pos] = id;
        self.len += 1;
    }

    /// Remove the longest waiting task
    pub(crate) fn pop_front(&mut self) -> Option<TaskId> {
        if self.len == 0 {
            return None;
        }
        let id = self.ids[0];
        self.ids.copy_within(1..self.len, 0);
        self.len -= 1;
        Some(id)
    }

    /// Remove `id`, keeping the order of the others
    pub(crate) fn remove(&mut self, id: TaskId) -> bool {
        let found = self.iter().position(|t| t == id);
        match found {
            Some(pos) => {
                self.ids.copy_within(pos + 1..self.len, pos);
                self.len -= 1;
                true
            }
            None => false,
        }
    }

    pub(crate) fn contains(&self, id: TaskId) -> bool {
        self.iter().any(|t| t == id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.ids[..self.len].iter().copied()
    }
}

/// Resolves once the wait of `id` has ended, with its pend status
#[must_use = "futures do nothing unless awaited"]
pub(crate) struct Pend<'k> {
    kernel: &'k Kernel,
    id: TaskId,
}

pub(crate) fn pend(kernel: &Kernel, id: TaskId) -> Pend<'_> {
    Pend { kernel, id }
}

impl Future for Pend<'_> {
    type Output = OsPendStatus;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<OsPendStatus> {
        match self.kernel.pend_status(self.id) {
            OsPendStatus::Pending => Poll::Pending,
            status => Poll::Ready(status),
        }
    }
}
