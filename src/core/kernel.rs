//! Kernel state and the scheduler loop
//!
//! [`Kernel`] holds the state shared by tasks and kernel objects: the TCB
//! table, ready lists and the sampled tick. [`Scheduler`] owns the task
//! bodies and drives them. Kernel objects (queues, mutexes, the timer
//! service) keep a reference to the kernel they were created with.

use core::convert::Infallible;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use portable_atomic::{AtomicBool, AtomicU64, Ordering};

use crate::config::{CFG_PRIO_IDLE, CFG_TASK_MAX, CFG_TIMER_TASK_PRIO, CFG_TIMER_TASK_STK_SIZE};
use crate::core::cs_cell::CsCell;
use crate::critical::is_isr_context;
use crate::error::{OsError, OsResult};
use crate::sched::{PreemptionPoint, SchedState, YieldNow};
use crate::task::{check_task_params, noop_waker, TaskFuture};
use crate::time::Clock;
use crate::types::{OsPendStatus, OsPrio, OsTaskState, OsTick, TaskId};

// ============ Kernel State Structures ============

/// Atomic kernel flags
pub struct KernelFlags {
    running: AtomicBool,
    tick_counter: AtomicU64,
}

impl KernelFlags {
    const fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            tick_counter: AtomicU64::new(0),
        }
    }

    /// Check if the OS is running
    #[inline(always)]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Get current tick count
    #[inline(always)]
    pub fn tick_get(&self) -> OsTick {
        self.tick_counter.load(Ordering::Relaxed)
    }

    /// Record a clock sample, refusing to go backwards
    pub(crate) fn tick_update(&self, sample: OsTick) -> OsTick {
        let prev = self.tick_counter.fetch_max(sample, Ordering::Relaxed);
        if sample < prev {
            crate::warn!("clock went backwards: {} < {}", sample, prev);
            prev
        } else {
            sample
        }
    }

    /// Set running flag, failing if it was already set
    pub(crate) fn try_set_running(&self) -> OsResult<()> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| OsError::OsRunning)
    }

    #[inline(always)]
    pub(crate) fn clear_running(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Kernel shared by every task and kernel object
pub struct Kernel {
    pub(crate) flags: KernelFlags,
    sched: CsCell<SchedState>,
}

impl Kernel {
    /// Initialize the RTOS kernel
    ///
    /// No task exists yet; create them through a [`Scheduler`].
    pub const fn new() -> Self {
        Self {
            flags: KernelFlags::new(),
            sched: CsCell::new(SchedState::new()),
        }
    }

    /// Current tick, as last sampled by the scheduler
    #[inline]
    pub fn now(&self) -> OsTick {
        self.flags.tick_get()
    }

    /// Check if the scheduler loop is running
    #[inline]
    pub fn is_running(&self) -> bool {
        self.flags.is_running()
    }

    /// Task currently being executed
    ///
    /// Interrupt handlers are never "in" a task, even when one was
    /// interrupted.
    pub fn current(&self) -> OsResult<TaskId> {
        if is_isr_context() {
            return Err(OsError::NotInTask);
        }
        self.sched.with(|s| s.cur).ok_or(OsError::NotInTask)
    }

    /// Number of created tasks
    pub fn task_count(&self) -> usize {
        self.sched.with(|s| s.task_count)
    }

    /// State of a task
    pub fn task_state(&self, id: TaskId) -> OsResult<OsTaskState> {
        self.sched.with(|s| s.tcb(id).map(|t| t.task_state))
    }

    /// Effective (possibly inherited) priority of a task
    pub fn task_prio(&self, id: TaskId) -> OsResult<OsPrio> {
        self.sched.with(|s| s.tcb(id).map(|t| t.prio))
    }

    /// Priority the task was created with
    pub fn task_base_prio(&self, id: TaskId) -> OsResult<OsPrio> {
        self.sched.with(|s| s.tcb(id).map(|t| t.base_prio))
    }

    /// Name of a task
    pub fn task_name(&self, id: TaskId) -> OsResult<&'static str> {
        self.sched.with(|s| s.tcb(id).map(|t| t.name))
    }

    /// Suspend a task
    ///
    /// A ready task stops being scheduled; a blocked task finishes its wait
    /// in the suspended state. A task suspending itself should `.await`
    /// [`Kernel::yield_now`] right after.
    pub fn suspend(&self, id: TaskId) -> OsResult<()> {
        let name = self.task_name(id)?;
        self.sched.with(|s| s.suspend(id))?;
        crate::debug!("suspended {} ({})", name, id);
        Ok(())
    }

    /// Resume a suspended task
    pub fn resume(&self, id: TaskId) -> OsResult<()> {
        let name = self.task_name(id)?;
        self.sched.with(|s| s.resume(id))?;
        crate::debug!("resumed {} ({})", name, id);
        Ok(())
    }

    /// Hand the processor to the next ready task of the same priority
    pub fn yield_now(&self) -> YieldNow<'_> {
        YieldNow::new(self)
    }

    /// Let the scheduler catch up with the clock and with tasks made ready
    ///
    /// A higher priority task that became ready, or whose delay expired,
    /// runs before the caller continues.
    pub fn preemption_point(&self) -> PreemptionPoint {
        PreemptionPoint::new()
    }

    // ============ Internal accessors for other modules ============

    pub(crate) fn register_task(
        &self,
        name: &'static str,
        prio: OsPrio,
        stk_size: usize,
    ) -> OsResult<TaskId> {
        self.sched.with(|s| s.add_task(name, prio, stk_size))
    }

    pub(crate) fn block_current(&self, deadline: Option<OsTick>) -> OsResult<TaskId> {
        if is_isr_context() {
            return Err(OsError::NotInTask);
        }
        self.sched.with(|s| s.block_current(deadline))
    }

    pub(crate) fn wake(&self, id: TaskId, status: OsPendStatus) {
        self.sched.with(|s| s.wake(id, status))
    }

    pub(crate) fn pend_status(&self, id: TaskId) -> OsPendStatus {
        self.sched.with(|s| s.tcbs[id.index()].pend_status)
    }

    pub(crate) fn rotate_current(&self) {
        self.sched.with(|s| s.rotate_current())
    }

    /// Effective priority used to order wait lists
    pub(crate) fn prio_of(&self, id: TaskId) -> OsPrio {
        self.task_prio(id).unwrap_or(CFG_PRIO_IDLE)
    }

    pub(crate) fn set_prio(&self, id: TaskId, prio: OsPrio) {
        self.sched.with(|s| s.set_prio(id, prio))
    }

    fn select_next(&self) -> Option<TaskId> {
        self.sched.with(|s| s.select_next())
    }

    fn finish_poll(&self, id: TaskId) {
        self.sched.with(|s| s.finish_poll(id))
    }

    fn expire(&self, now: OsTick) -> usize {
        self.sched.with(|s| s.expire(now))
    }

    fn next_deadline(&self) -> Option<OsTick> {
        self.sched.with(|s| s.next_deadline())
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

// ============ Scheduler ============

/// Owner of the task bodies
///
/// ```ignore
/// let kernel = Kernel::new();
/// let queue = Queue::<u32, 2>::create(&kernel)?;
///
/// let consumer = pin!(consumer_task(&queue));
/// let mut sched = Scheduler::new(&kernel);
/// sched.create_task("Rx", consumer, 2, CFG_STK_SIZE_DEFAULT)?;
/// sched.start(&mut clock);
/// ```
pub struct Scheduler<'k, 't> {
    kernel: &'k Kernel,
    tasks: [Option<TaskFuture<'t>>; CFG_TASK_MAX],
    /// Tasks created through `create_task`, the timer service excluded
    app_tasks: usize,
}

impl<'k, 't> Scheduler<'k, 't> {
    /// Create a scheduler for `kernel`
    pub fn new(kernel: &'k Kernel) -> Self {
        Self {
            kernel,
            tasks: core::array::from_fn(|_| None),
            app_tasks: 0,
        }
    }

    /// Kernel driven by this scheduler
    pub fn kernel(&self) -> &'k Kernel {
        self.kernel
    }

    /// Create a new ready task
    ///
    /// # Arguments
    /// * `name` - Task name for debugging
    /// * `body` - Pinned task body
    /// * `prio` - Task priority (higher value runs first), below
    ///   `CFG_TIMER_TASK_PRIO`
    /// * `stack_budget` - Bytes the body may occupy
    ///
    /// # Returns
    /// * `Err(OsError::InvalidArgument)` - Priority out of range or budget too small
    /// * `Err(OsError::ResourceExhausted)` - No TCB left or body larger than the budget
    pub fn create_task<F>(
        &mut self,
        name: &'static str,
        body: Pin<&'t mut F>,
        prio: OsPrio,
        stack_budget: usize,
    ) -> OsResult<TaskId>
    where
        F: Future<Output = Infallible> + 't,
    {
        // The timer service priority is reserved
        if prio >= CFG_TIMER_TASK_PRIO {
            return Err(OsError::InvalidArgument);
        }
        let id = self.spawn(name, body, prio, stack_budget)?;
        self.app_tasks += 1;
        Ok(id)
    }

    /// Create the timer service task at the fixed timer priority
    pub fn create_timer_task<F>(&mut self, body: Pin<&'t mut F>) -> OsResult<TaskId>
    where
        F: Future<Output = Infallible> + 't,
    {
        self.spawn("Tmr Svc", body, CFG_TIMER_TASK_PRIO, CFG_TIMER_TASK_STK_SIZE)
    }

    fn spawn<F>(
        &mut self,
        name: &'static str,
        body: Pin<&'t mut F>,
        prio: OsPrio,
        stack_budget: usize,
    ) -> OsResult<TaskId>
    where
        F: Future<Output = Infallible> + 't,
    {
        check_task_params(prio, stack_budget, core::mem::size_of::<F>())?;

        let id = self.kernel.register_task(name, prio, stack_budget)?;
        self.tasks[id.index()] = Some(body);

        crate::info!("created task {} ({}) prio {}", name, id, prio);
        Ok(id)
    }

    /// Start multitasking
    ///
    /// Never returns. Halts the system if no application task was created.
    pub fn start<C: Clock>(mut self, clock: &mut C) -> ! {
        match self.run(clock, None) {
            Ok(()) => unreachable!("unbounded scheduler loop returned"),
            Err(err) => os_halt(err),
        }
    }

    /// Run the scheduler until the clock passes `until`
    ///
    /// Every event due at or before `until` is processed. Can be called
    /// repeatedly to advance a simulation in steps.
    pub fn run_until<C: Clock>(&mut self, clock: &mut C, until: OsTick) -> OsResult<()> {
        self.run(clock, Some(until))
    }

    fn run<C: Clock>(&mut self, clock: &mut C, until: Option<OsTick>) -> OsResult<()> {
        if self.app_tasks == 0 {
            return Err(OsError::NoAppTask);
        }
        self.kernel.flags.try_set_running()?;
        crate::debug!("scheduler running");

        loop {
            let now = self.kernel.flags.tick_update(clock.now());
            if until.is_some_and(|u| now > u) {
                break;
            }

            self.kernel.expire(now);

            match self.kernel.select_next() {
                Some(id) => self.poll_task(id),
                None => {
                    let limit = until.map(|u| u.saturating_add(1));
                    let target = match (self.kernel.next_deadline(), limit) {
                        (Some(d), Some(l)) => d.min(l),
                        (Some(d), None) => d,
                        (None, Some(l)) => l,
                        (None, None) => now.saturating_add(1),
                    };
                    clock.idle_until(target.max(now.saturating_add(1)));
                }
            }
        }

        self.kernel.flags.clear_running();
        Ok(())
    }

    fn poll_task(&mut self, id: TaskId) {
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);

        if let Some(task) = self.tasks[id.index()].as_mut() {
            if let Poll::Ready(never) = task.as_mut().poll(&mut cx) {
                match never {}
            }
        }

        self.kernel.finish_poll(id);
    }
}

/// Fatal-halt signal
///
/// Logs the error and panics; on target the panic handler stops the core.
#[cold]
pub fn os_halt(err: OsError) -> ! {
    crate::error!("fatal: {}", err);
    panic!("kernel halted: {}", err)
}
