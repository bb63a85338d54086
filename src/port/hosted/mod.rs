//! Hosted port
//!
//! Runs the kernel inside a normal process: wall clock ticks, stdout as
//! the output sink and stdin, read on a helper thread, as the input source.

use std::thread;
use std::time::{Duration, Instant};

#[cfg(all(feature = "mutex", feature = "timers"))]
use std::{
    cell::RefCell,
    future::Future,
    io::BufRead,
    sync::mpsc::{self, Receiver, TryRecvError},
};

use crate::config::CFG_TICK_RATE_HZ;
use crate::time::Clock;
use crate::types::OsTick;

#[cfg(all(feature = "mutex", feature = "timers"))]
use crate::blinky::{scan_int, InputError, InputSource, OutputSink, Scan};
#[cfg(all(feature = "mutex", feature = "timers"))]
use crate::kernel::Kernel;

/// Install `env_logger`, defaulting to `info`
pub fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

/// Wall clock ticking at `CFG_TICK_RATE_HZ`
#[derive(Debug, Clone)]
pub struct StdClock {
    origin: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    fn instant_of(&self, tick: OsTick) -> Instant {
        let nanos = u128::from(tick) * 1_000_000_000 / u128::from(CFG_TICK_RATE_HZ);
        self.origin + Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now(&self) -> OsTick {
        let nanos = self.origin.elapsed().as_nanos();
        let ticks = nanos * u128::from(CFG_TICK_RATE_HZ) / 1_000_000_000;
        OsTick::try_from(ticks).unwrap_or(OsTick::MAX)
    }

    fn idle_until(&mut self, tick: OsTick) {
        let target = self.instant_of(tick);
        let now = Instant::now();
        if target > now {
            thread::sleep(target - now);
        }
    }
}

/// Prints every line to stdout
#[cfg(all(feature = "mutex", feature = "timers"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

#[cfg(all(feature = "mutex", feature = "timers"))]
impl OutputSink for StdoutSink {
    fn print(&self, line: &str) {
        println!("{}", line);
    }
}

/// Stdin lines delivered by a reader thread
///
/// While no line is available the reading task sleeps one tick at a time.
#[cfg(all(feature = "mutex", feature = "timers"))]
pub struct StdinInput<'k> {
    kernel: &'k Kernel,
    lines: Receiver<String>,
    /// Unconsumed rest of the current line
    pending: RefCell<String>,
}

#[cfg(all(feature = "mutex", feature = "timers"))]
impl<'k> StdinInput<'k> {
    pub fn new(kernel: &'k Kernel) -> Self {
        let (tx, lines) = mpsc::channel();
        thread::Builder::new()
            .name("stdin".into())
            .spawn(move || {
                for line in std::io::stdin().lock().lines() {
                    let Ok(line) = line else { break };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            })
            .map_err(|err| crate::warn!("no stdin reader: {}", err))
            .ok();

        Self {
            kernel,
            lines,
            pending: RefCell::new(String::new()),
        }
    }

    /// Wait for the next line
    async fn next_line(&self) -> Option<String> {
        loop {
            match self.lines.try_recv() {
                Ok(line) => return Some(line),
                Err(TryRecvError::Disconnected) => return None,
                Err(TryRecvError::Empty) => self.kernel.delay_for(1).await,
            }
        }
    }
}

#[cfg(all(feature = "mutex", feature = "timers"))]
impl StdinInput<'_> {
    async fn read(&self) -> Result<i64, InputError> {
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
                Scan::Empty => match self.next_line().await {
                    Some(line) => *self.pending.borrow_mut() = line,
                    None => return Err(InputError::Closed),
                },
            }
        }
    }
}

#[cfg(all(feature = "mutex", feature = "timers"))]
impl InputSource for StdinInput<'_> {
    fn read_int(&self) -> impl Future<Output = Result<i64, InputError>> {
        self.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std_clock_is_monotonic() {
        let mut clock = StdClock::new();
        let a = clock.now();
        clock.idle_until(a + 2);
        assert!(clock.now() >= a + 2);
    }
}
