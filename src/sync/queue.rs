//! Message queue
//!
//! Fixed capacity FIFO of `Copy` messages. Messages are copied in and out
//! by value. A message sent while a receiver is blocked goes straight to
//! the highest priority, longest waiting receiver; a message from a blocked
//! sender waits in that sender's slot until a receiver frees room in the
//! buffer.

use crate::config::CFG_TASK_MAX;
use crate::core::cs_cell::CsCell;
use crate::error::{OsError, OsResult};
use crate::kernel::Kernel;
use crate::sync::pend::{pend, WaitList};
use crate::types::{OsPendStatus, Timeout};

struct QueueState<T: Copy, const N: usize> {
    buf: [Option<T>; N],
    head: usize,
    len: usize,
    /// Tasks blocked on an empty queue
    receivers: WaitList,
    /// Tasks blocked on a full queue
    senders: WaitList,
    /// Message handed to a blocked receiver, by task index
    handoff: [Option<T>; CFG_TASK_MAX],
    /// Message of a blocked sender, by task index
    parked: [Option<T>; CFG_TASK_MAX],
}

impl<T: Copy, const N: usize> QueueState<T, N> {
    const fn new() -> Self {
        Self {
            buf: [None; N],
            head: 0,
            len: 0,
            receivers: WaitList::new(),
            senders: WaitList::new(),
            handoff: [None; CFG_TASK_MAX],
            parked: [None; CFG_TASK_MAX],
        }
    }

    fn push_back(&mut self, msg: T) {
        let tail = (self.head + self.len) % N;
        self.buf[tail] = Some(msg);
        self.len += 1;
    }

    fn pop_front(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let msg = self.buf[self.head].take();
        self.head = (self.head + 1) % N;
        self.len -= 1;
        msg
    }

    /// Deliver without blocking
    fn deliver(&mut self, kernel: &Kernel, msg: T) -> OsResult<()> {
        if let Some(rx) = self.receivers.pop_front() {
            self.handoff[rx.index()] = Some(msg);
            kernel.wake(rx, OsPendStatus::Ok);
            return Ok(());
        }
        if self.len < N {
            self.push_back(msg);
            return Ok(());
        }
        Err(OsError::WouldBlock)
    }

    /// Take the oldest message without blocking
    ///
    /// The freed slot goes to the first sender in wait order.
    fn accept(&mut self, kernel: &Kernel) -> OsResult<T> {
        let msg = self.pop_front().ok_or(OsError::WouldBlock)?;
        if let Some(tx) = self.senders.pop_front() {
            if let Some(parked) = self.parked[tx.index()].take() {
                self.push_back(parked);
            }
            kernel.wake(tx, OsPendStatus::Ok);
        }
        Ok(msg)
    }
}

/// Bounded FIFO channel between tasks
pub struct Queue<'k, T: Copy, const N: usize> {
    kernel: &'k Kernel,
    state: CsCell<QueueState<T, N>>,
}

impl<'k, T: Copy, const N: usize> Queue<'k, T, N> {
    /// Create a queue holding at most `N` messages
    ///
    /// # Returns
    /// * `Err(OsError::InvalidArgument)` - `N` is zero
    pub fn create(kernel: &'k Kernel) -> OsResult<Self> {
        if N == 0 {
            return Err(OsError::InvalidArgument);
        }
        Ok(Self {
            kernel,
            state: CsCell::new(QueueState::new()),
        })
    }

    /// Send a message, waiting up to `timeout` for room
    ///
    /// # Returns
    /// * `Ok(())` - Message is in the queue or with a receiver
    /// * `Err(OsError::WouldBlock)` - Queue full and `timeout` is zero
    /// * `Err(OsError::TimedOut)` - Still full when the timeout elapsed
    pub async fn send(&self, msg: T, timeout: Timeout) -> OsResult<()> {
        let now = self.kernel.now();
        let blocked = self.state.with(|st| match st.deliver(self.kernel, msg) {
            Ok(()) => Ok(None),
            Err(OsError::WouldBlock) if !timeout.is_no_wait() => {
                let id = self.kernel.block_current(timeout.deadline(now))?;
                st.parked[id.index()] = Some(msg);
                st.senders.push(id, |t| self.kernel.prio_of(t));
                Ok(Some(id))
            }
            Err(err) => Err(err),
        })?;

        let Some(id) = blocked else {
            self.kernel.preemption_point().await;
            return Ok(());
        };

        pend(self.kernel, id).await;
        self.state.with(|st| {
            if st.senders.remove(id) {
                st.parked[id.index()] = None;
                Err(OsError::TimedOut)
            } else {
                Ok(())
            }
        })
    }

    /// Receive a message, waiting up to `timeout` for one
    ///
    /// # Returns
    /// * `Ok(msg)` - Oldest message
    /// * `Err(OsError::WouldBlock)` - Queue empty and `timeout` is zero
    /// * `Err(OsError::TimedOut)` - Still empty when the timeout elapsed
    pub async fn receive(&self, timeout: Timeout) -> OsResult<T> {
        let now = self.kernel.now();
        let blocked = self.state.with(|st| match st.accept(self.kernel) {
            Ok(msg) => Ok(Ok(msg)),
            Err(OsError::WouldBlock) if !timeout.is_no_wait() => {
                let id = self.kernel.block_current(timeout.deadline(now))?;
                st.receivers.push(id, |t| self.kernel.prio_of(t));
                Ok(Err(id))
            }
            Err(err) => Err(err),
        })?;

        let id = match blocked {
            Ok(msg) => {
                self.kernel.preemption_point().await;
                return Ok(msg);
            }
            Err(id) => id,
        };

        pend(self.kernel, id).await;
        self.state.with(|st| {
            if st.receivers.remove(id) {
                return Err(OsError::TimedOut);
            }
            st.handoff[id.index()].take().ok_or(OsError::TimedOut)
        })
    }

    /// Non-blocking send, usable from timer callbacks and interrupts
    pub fn try_send(&self, msg: T) -> OsResult<()> {
        self.state.with(|st| st.deliver(self.kernel, msg))
    }

    /// Non-blocking receive
    pub fn try_receive(&self) -> OsResult<T> {
        self.state.with(|st| st.accept(self.kernel))
    }

    /// Handle that can only send without blocking
    pub fn try_sender(&self) -> TrySender<'_, 'k, T, N> {
        TrySender { queue: self }
    }

    /// Number of buffered messages
    pub fn len(&self) -> usize {
        self.state.with(|st| st.len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == N
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of tasks blocked on this queue, senders and receivers
    pub fn waiting(&self) -> usize {
        self.state.with(|st| st.senders.len() + st.receivers.len())
    }
}

/// Sending half restricted to [`Queue::try_send`]
///
/// This is what timer callbacks get: it has no blocking operation.
pub struct TrySender<'q, 'k, T: Copy, const N: usize> {
    queue: &'q Queue<'k, T, N>,
}

impl<T: Copy, const N: usize> Clone for TrySender<'_, '_, T, N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Copy, const N: usize> Copy for TrySender<'_, '_, T, N> {}

impl<T: Copy, const N: usize> TrySender<'_, '_, T, N> {
    /// Send without blocking
    ///
    /// # Returns
    /// * `Err(OsError::WouldBlock)` - Queue full, message dropped
    pub fn try_send(&self, msg: T) -> OsResult<()> {
        self.queue.try_send(msg)
    }
}
