//! Blinky demo application
//!
//! A periodic producer and a software timer feed one queue; a consumer
//! reports where each message came from. A guard task reads integers from
//! an input source under a mutex; entering `1` resets the software timer.
//!
//! Every priority, period and value comes from [`BlinkyConfig`].

mod io;
mod tasks;

pub use io::{scan_int, InputError, InputSource, LineBuf, OutputSink, Scan};
pub use tasks::{
    classify, queue_receive_task, queue_send_task, reset_task, timer_send, MessageSource,
    ResetHandles,
};

use core::pin::pin;

use crate::config::CFG_STK_SIZE_DEFAULT;
use crate::error::OsResult;
use crate::kernel::{Kernel, Scheduler};
use crate::sync::mutex::Mutex;
use crate::sync::queue::Queue;
use crate::sync::timer::{TimerId, TimerService};
use crate::time::Clock;
use crate::types::{OsPrio, OsTick};

/// Default queue length
pub const QUEUE_LENGTH: usize = 2;

/// Application configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BlinkyConfig {
    pub queue_receive_prio: OsPrio,
    pub queue_send_prio: OsPrio,
    pub reset_prio: OsPrio,
    /// Ticks between two producer sends
    pub send_period: OsTick,
    /// Software timer period in ticks
    pub timer_period: OsTick,
    /// Ticks the guard task idles after releasing the mutex
    pub reset_idle: OsTick,
    pub value_from_task: u32,
    pub value_from_timer: u32,
    /// Stack budget of every application task
    pub stack_budget: usize,
}

impl Default for BlinkyConfig {
    fn default() -> Self {
        Self {
            queue_receive_prio: 2,
            queue_send_prio: 1,
            reset_prio: 2,
            send_period: 200,
            timer_period: 2000,
            reset_idle: 200,
            value_from_task: 100,
            value_from_timer: 200,
            stack_budget: CFG_STK_SIZE_DEFAULT,
        }
    }
}

/// Build the demo on `kernel` and run it
///
/// With `until` set the scheduler returns once the clock passes that tick;
/// otherwise it runs forever. Construction failures are returned before
/// any task runs.
pub fn run<const N: usize, C, S, I>(
    kernel: &Kernel,
    cfg: &BlinkyConfig,
    clock: &mut C,
    sink: &S,
    input: &I,
    until: Option<OsTick>,
) -> OsResult<()>
where
    C: Clock,
    S: OutputSink,
    I: InputSource,
{
    let queue = Queue::<u32, N>::create(kernel)?;
    let mutex = Mutex::create(kernel, "input")?;
    let tx = queue.try_sender();

    let send_from_timer = |_: TimerId| timer_send(&tx, cfg.value_from_timer);
    let timers: TimerService<'_, '_, 1> = TimerService::new(kernel);
    let timer = timers.create_timer("Timer", cfg.timer_period, true, &send_from_timer)?;

    let reset = ResetHandles {
        mutex: &mutex,
        timers: &timers,
        timer,
    };

    let consumer = pin!(queue_receive_task(&queue, cfg, sink));
    let producer = pin!(queue_send_task(kernel, &queue, cfg));
    let guard = pin!(reset_task(kernel, reset, input, sink, cfg));
    let service = pin!(timers.run());

    let mut sched = Scheduler::new(kernel);
    sched.create_task("Rx", consumer, cfg.queue_receive_prio, cfg.stack_budget)?;
    sched.create_task("TX", producer, cfg.queue_send_prio, cfg.stack_budget)?;
    sched.create_task("Reset", guard, cfg.reset_prio, cfg.stack_budget)?;
    sched.create_timer_task(service)?;

    timers.start(timer)?;

    match until {
        Some(tick) => sched.run_until(clock, tick),
        None => sched.start(clock),
    }
}
