//! Ready list - doubly linked list of TCBs at a given priority
//!
//! Each priority level has its own ready list. Tasks are added to the
//! tail (FIFO) and scheduled from the head. Links are task indices stored
//! in the TCB table.

use crate::task::OsTcb;
use crate::types::TaskId;

/// Ready list for a single priority level
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadyList {
    head: Option<TaskId>,
    tail: Option<TaskId>,
}

impl ReadyList {
    /// Create a new empty ready list
    pub const fn new() -> Self {
        ReadyList {
            head: None,
            tail: None,
        }
    }

    /// Get head of list (first to be scheduled)
    #[inline]
    pub fn head(&self) -> Option<TaskId> {
        self.head
    }

    /// Get tail of list
    #[inline]
    pub fn tail(&self) -> Option<TaskId> {
        self.tail
    }

    /// Check if list is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Insert TCB at the tail of the list (FIFO order)
    ///
    /// `id` must not already be linked in any ready list.
    pub fn insert_tail(&mut self, tcbs: &mut [OsTcb], id: TaskId) {
        tcbs[id.index()].next = None;
        tcbs[id.index()].prev = self.tail;

        match self.tail {
            Some(tail) => tcbs[tail.index()].next = Some(id),
            None => self.head = Some(id),
        }

        self.tail = Some(id);
    }

    /// Insert TCB at the head of the list
    ///
    /// `id` must not already be linked in any ready list.
    pub fn insert_head(&mut self, tcbs: &mut [OsTcb], id: TaskId) {
        tcbs[id.index()].prev = None;
        tcbs[id.index()].next = self.head;

        match self.head {
            Some(head) => tcbs[head.index()].prev = Some(id),
            None => self.tail = Some(id),
        }

        self.head = Some(id);
    }

    /// Remove a TCB from the list
    ///
    /// `id` must be linked in this list.
    pub fn remove(&mut self, tcbs: &mut [OsTcb], id: TaskId) {
        let (prev, next) = (tcbs[id.index()].prev, tcbs[id.index()].next);

        match prev {
            Some(prev) => tcbs[prev.index()].next = next,
            None => self.head = next,
        }

        match next {
            Some(next) => tcbs[next.index()].prev = prev,
            None => self.tail = prev,
        }

        tcbs[id.index()].prev = None;
        tcbs[id.index()].next = None;
    }

    /// Iterate task ids from head to tail
    pub fn iter<'a>(&self, tcbs: &'a [OsTcb]) -> impl Iterator<Item = TaskId> + 'a {
        let mut cur = self.head;
        core::iter::from_fn(move || {
            let id = cur?;
            cur = tcbs[id.index()].next;
            Some(id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &ReadyList, tcbs: &[OsTcb]) -> [Option<TaskId>; 4] {
        let mut out = [None; 4];
        for (slot, id) in out.iter_mut().zip(list.iter(tcbs)) {
            *slot = Some(id);
        }
        out
    }

    #[test]
    fn fifo_order_and_removal() {
        let mut tcbs = [OsTcb::new(); 4];
        let mut list = ReadyList::new();

        for i in 0..3 {
            list.insert_tail(&mut tcbs, TaskId(i));
        }
        assert_eq!(list.head(), Some(TaskId(0)));
        assert_eq!(list.tail(), Some(TaskId(2)));

        list.remove(&mut tcbs, TaskId(1));
        assert_eq!(ids(&list, &tcbs), [Some(TaskId(0)), Some(TaskId(2)), None, None]);

        list.remove(&mut tcbs, TaskId(0));
        list.insert_tail(&mut tcbs, TaskId(0));
        assert_eq!(ids(&list, &tcbs), [Some(TaskId(2)), Some(TaskId(0)), None, None]);

        list.insert_head(&mut tcbs, TaskId(3));
        assert_eq!(ids(&list, &tcbs), [Some(TaskId(3)), Some(TaskId(2)), Some(TaskId(0)), None]);

        list.remove(&mut tcbs, TaskId(3));
        list.remove(&mut tcbs, TaskId(2));
        list.remove(&mut tcbs, TaskId(0));
        assert!(list.is_empty());
        assert_eq!(list.tail(), None);
    }
}
