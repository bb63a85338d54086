//! Mutex implementation with priority inheritance
//!
//! Mutexes provide mutual exclusion with automatic priority boosting
//! to prevent priority inversion. Waiters are admitted by priority, FIFO
//! among equals, and ownership moves directly from the releasing task to
//! the next waiter, so a third task never sees the mutex free in between.

use crate::core::cs_cell::CsCell;
use crate::error::{OsError, OsResult};
use crate::kernel::Kernel;
use crate::sync::pend::{pend, WaitList};
use crate::types::{OsPendStatus, OsPrio, TaskId, Timeout};

struct MutexState {
    /// Task that owns the mutex
    owner: Option<TaskId>,
    /// List of tasks waiting on this mutex
    waiters: WaitList,
}

impl MutexState {
    /// Run `owner` at the highest of its base priority and its waiters'
    fn update_inheritance(&self, kernel: &Kernel) {
        let Some(owner) = self.owner else {
            return;
        };
        let base = kernel.task_base_prio(owner).unwrap_or(0);
        let inherited = self
            .waiters
            .iter()
            .filter_map(|id| kernel.task_prio(id).ok())
            .fold(base, OsPrio::max);
        kernel.set_prio(owner, inherited);
    }
}

/// Mutex with priority inheritance
pub struct Mutex<'k> {
    kernel: &'k Kernel,
    name: &'static str,
    state: CsCell<MutexState>,
}

impl<'k> Mutex<'k> {
    /// Create a new, unowned mutex
    pub fn create(kernel: &'k Kernel, name: &'static str) -> OsResult<Self> {
        Ok(Self {
            kernel,
            name,
            state: CsCell::new(MutexState {
                owner: None,
                waiters: WaitList::new(),
            }),
        })
    }

    /// Acquire the mutex
    ///
    /// If the mutex is owned by a lower-priority task, the owner's priority
    /// is temporarily boosted to prevent priority inversion.
    ///
    /// # Returns
    /// * `Ok(())` - Caller owns the mutex
    /// * `Err(OsError::MutexOwner)` - Caller already owns it
    /// * `Err(OsError::WouldBlock)` - Owned elsewhere and `timeout` is zero
    /// * `Err(OsError::TimedOut)` - Not granted before the timeout
    pub async fn take(&self, timeout: Timeout) -> OsResult<()> {
        let cur = self.kernel.current()?;
        let now = self.kernel.now();

        let blocked = self.state.with(|st| match st.owner {
            None => {
                st.owner = Some(cur);
                Ok(false)
            }
            Some(owner) if owner == cur => Err(OsError::MutexOwner),
            Some(_) if timeout.is_no_wait() => Err(OsError::WouldBlock),
            Some(_) => {
                self.kernel.block_current(timeout.deadline(now))?;
                st.waiters.push(cur, |t| self.kernel.prio_of(t));
                st.update_inheritance(self.kernel);
                Ok(true)
            }
        })?;

        if !blocked {
            return Ok(());
        }

        crate::trace!("{} waits on {}", cur, self.name);
        pend(self.kernel, cur).await;

        self.state.with(|st| {
            if st.waiters.remove(cur) {
                st.update_inheritance(self.kernel);
                Err(OsError::TimedOut)
            } else {
                Ok(())
            }
        })
    }

    /// Release the mutex
    ///
    /// If the current task's priority was boosted due to priority inheritance,
    /// it is restored to its base priority. The highest priority waiter, the
    /// longest waiting one among equals, becomes the owner.
    ///
    /// # Returns
    /// * `Err(OsError::NotOwner)` - Caller does not own the mutex
    pub async fn give(&self) -> OsResult<()> {
        let cur = self.kernel.current()?;

        self.state.with(|st| {
            if st.owner != Some(cur) {
                crate::warn!("{} released {} without owning it", cur, self.name);
                return Err(OsError::NotOwner);
            }

            if let Ok(base) = self.kernel.task_base_prio(cur) {
                self.kernel.set_prio(cur, base);
            }

            st.owner = st.waiters.pop_front();
            if let Some(next) = st.owner {
                self.kernel.wake(next, OsPendStatus::Ok);
                st.update_inheritance(self.kernel);
            }
            Ok(())
        })?;

        self.kernel.preemption_point().await;
        Ok(())
    }

    /// Check if mutex is owned
    #[inline]
    pub fn is_owned(&self) -> bool {
        self.owner().is_some()
    }

    /// Current owner
    pub fn owner(&self) -> Option<TaskId> {
        self.state.with(|st| st.owner)
    }

    /// Get owner's priority
    pub fn owner_prio(&self) -> Option<OsPrio> {
        self.owner().and_then(|id| self.kernel.task_prio(id).ok())
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
