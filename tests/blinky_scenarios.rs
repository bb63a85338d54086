//! End-to-end runs of the blinky demo on the virtual clock

use core::cell::RefCell;
use core::future::Future;
use core::pin::pin;
use std::collections::VecDeque;

use tickos::blinky::{
    self, reset_task, scan_int, BlinkyConfig, InputError, InputSource, OutputSink, ResetHandles,
    Scan, QUEUE_LENGTH,
};
use tickos::{Kernel, Mutex, OsTick, Scheduler, SimClock, TimerId, TimerService};

const PROMPT: &str = "Enter '1' to RESET, or '0' to continue: ";
const FROM_TASK: &str = "Message received from task";
const FROM_TIMER: &str = "Message received from software timer";

/// Records every printed line with the tick it was printed at
struct RecordingSink<'k> {
    kernel: &'k Kernel,
    lines: RefCell<Vec<(OsTick, String)>>,
}

impl<'k> RecordingSink<'k> {
    fn new(kernel: &'k Kernel) -> Self {
        Self {
            kernel,
            lines: RefCell::new(Vec::new()),
        }
    }

    fn ticks_of(&self, text: &str) -> Vec<OsTick> {
        self.lines
            .borrow()
            .iter()
            .filter(|(_, l)| l == text)
            .map(|(t, _)| *t)
            .collect()
    }

    fn texts(&self) -> Vec<String> {
        self.lines.borrow().iter().map(|(_, l)| l.clone()).collect()
    }
}

impl OutputSink for RecordingSink<'_> {
    fn print(&self, line: &str) {
        self.lines
            .borrow_mut()
            .push((self.kernel.now(), line.to_string()));
    }
}

/// Lines that become available at given ticks, closed once exhausted
struct ScriptedInput<'k> {
    kernel: &'k Kernel,
    script: RefCell<VecDeque<(OsTick, &'static str)>>,
    pending: RefCell<String>,
}

impl<'k> ScriptedInput<'k> {
    fn new(kernel: &'k Kernel, script: &[(OsTick, &'static str)]) -> Self {
        Self {
            kernel,
            script: RefCell::new(script.iter().copied().collect()),
            pending: RefCell::new(String::new()),
        }
    }
}

impl InputSource for ScriptedInput<'_> {
    fn read_int(&self) -> impl Future<Output = Result<i64, InputError>> {
        async move {
            loop {
                let scan = scan_int(&self.pending.borrow());
                match scan {
                    Scan::Int(value, used) => {
                        self.pending.borrow_mut().drain(..used);
                        return Ok(value);
                    }
                    Scan::Malformed => {
                        self.pending.borrow_mut().clear();
                        return Err(InputError::Malformed);
                    }
                    Scan::Empty => {
                        let next = self.script.borrow_mut().pop_front();
                        let Some((at, line)) = next else {
                            return Err(InputError::Closed);
                        };
                        self.kernel.delay_until(at).await;
                        *self.pending.borrow_mut() = line.to_string();
                    }
                }
            }
        }
    }
}

#[test]
fn two_seconds_of_blinky() {
    let kernel = Kernel::new();
    let sink = RecordingSink::new(&kernel);
    let input = ScriptedInput::new(&kernel, &[]);
    let cfg = BlinkyConfig::default();

    blinky::run::<QUEUE_LENGTH, _, _, _>(
        &kernel,
        &cfg,
        &mut SimClock::new(),
        &sink,
        &input,
        Some(2000),
    )
    .unwrap();

    let expected: Vec<OsTick> = (1..=10).map(|i| i * 200).collect();
    assert_eq!(sink.ticks_of(FROM_TASK), expected);
    assert_eq!(sink.ticks_of(FROM_TIMER), [2000]);

    // The timer service outranks the producer at tick 2000
    let texts = sink.texts();
    let timer_at = texts.iter().position(|l| l == FROM_TIMER).unwrap();
    let last_task_at = texts.iter().rposition(|l| l == FROM_TASK).unwrap();
    assert!(timer_at < last_task_at);

    // The guard prompts once per idle period, input being closed
    let prompts: Vec<OsTick> = (0..=10).map(|i| i * 200).collect();
    assert_eq!(sink.ticks_of(PROMPT), prompts);
}

#[test]
fn reset_postpones_the_timer() {
    let kernel = Kernel::new();
    let sink = RecordingSink::new(&kernel);
    let input = ScriptedInput::new(&kernel, &[(0, "0"), (0, "abc"), (1500, "1")]);
    let cfg = BlinkyConfig::default();

    blinky::run::<QUEUE_LENGTH, _, _, _>(
        &kernel,
        &cfg,
        &mut SimClock::new(),
        &sink,
        &input,
        Some(3500),
    )
    .unwrap();

    assert_eq!(sink.ticks_of("Reset value: 0"), [0]);
    assert_eq!(
        sink.ticks_of("Invalid input. Please enter a valid number."),
        [200]
    );
    assert_eq!(sink.ticks_of("Reset received: 1"), [1500]);

    // Reset at 1500 moves the expiry from 2000 to 3500
    assert_eq!(sink.ticks_of(FROM_TIMER), [3500]);
    assert_eq!(sink.ticks_of(FROM_TASK).len(), 17);
}

#[test]
fn several_values_on_one_line() {
    let kernel = Kernel::new();
    let sink = RecordingSink::new(&kernel);
    let input = ScriptedInput::new(&kernel, &[(0, "  42 -7")]);
    let cfg = BlinkyConfig::default();

    blinky::run::<QUEUE_LENGTH, _, _, _>(
        &kernel,
        &cfg,
        &mut SimClock::new(),
        &sink,
        &input,
        Some(500),
    )
    .unwrap();

    assert_eq!(sink.ticks_of("Reset value: 42"), [0]);
    assert_eq!(sink.ticks_of("Reset value: -7"), [200]);
    assert_eq!(sink.ticks_of(PROMPT), [0, 200, 400]);
}

#[test]
fn guards_never_interleave_on_the_console() {
    let kernel = Kernel::new();
    let sink = RecordingSink::new(&kernel);
    let input = ScriptedInput::new(&kernel, &[(10, "5"), (50, "6"), (100, "7"), (150, "8")]);
    let cfg = BlinkyConfig::default();

    let noop = |_: TimerId| {};
    let mutex = Mutex::create(&kernel, "input").unwrap();
    let timers: TimerService<'_, '_, 1> = TimerService::new(&kernel);
    let timer = timers.create_timer("Timer", 2000, true, &noop).unwrap();
    let handles = ResetHandles {
        mutex: &mutex,
        timers: &timers,
        timer,
    };

    let first = pin!(reset_task(&kernel, handles, &input, &sink, &cfg));
    let second = pin!(reset_task(&kernel, handles, &input, &sink, &cfg));
    let service = pin!(timers.run());
    let mut sched = Scheduler::new(&kernel);
    sched.create_task("Reset1", first, 2, cfg.stack_budget).unwrap();
    sched.create_task("Reset2", second, 2, cfg.stack_budget).unwrap();
    sched.create_timer_task(service).unwrap();
    sched.run_until(&mut SimClock::new(), 300).unwrap();

    assert_eq!(
        sink.texts(),
        [
            PROMPT,
            "Reset value: 5",
            PROMPT,
            "Reset value: 6",
            PROMPT,
            "Reset value: 7",
            PROMPT,
            "Reset value: 8",
        ]
    );
    assert_eq!(sink.ticks_of(PROMPT), [0, 10, 210, 250]);
}
