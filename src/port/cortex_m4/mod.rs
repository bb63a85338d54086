//! Cortex-M4 port implementation
//!
//! Provides the SysTick tick source and a semihosting console.

use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::SYST;
use cortex_m_rt::exception;
use portable_atomic::{AtomicU64, Ordering};

use crate::config::CFG_TICK_RATE_HZ;
use crate::time::Clock;
use crate::types::OsTick;

/// Ticks counted by the SysTick handler
static TICKS: AtomicU64 = AtomicU64::new(0);

/// Ticks since SysTick was started
#[inline]
pub fn ticks() -> OsTick {
    TICKS.load(Ordering::Relaxed)
}

/// SysTick driven tick source
pub struct SysTickClock {
    _syst: SYST,
}

impl SysTickClock {
    /// Initialize SysTick timer for system tick generation
    ///
    /// # Arguments
    /// * `syst` - SysTick peripheral
    /// * `core_clock_hz` - Processor clock
    ///
    /// # Example
    /// For 16MHz clock with 1000Hz tick rate the reload is 16_000 - 1.
    pub fn new(mut syst: SYST, core_clock_hz: u32) -> Self {
        let reload = (core_clock_hz / CFG_TICK_RATE_HZ).saturating_sub(1);

        syst.set_reload(reload);
        syst.clear_current();
        syst.set_clock_source(SystClkSource::Core);
        syst.enable_interrupt();
        syst.enable_counter();

        Self { _syst: syst }
    }
}

impl Clock for SysTickClock {
    fn now(&self) -> OsTick {
        ticks()
    }

    fn idle_until(&mut self, tick: OsTick) {
        // A SysTick pending while PRIMASK is set still ends the WFI.
        cortex_m::interrupt::free(|_| {
            if ticks() < tick {
                cortex_m::asm::wfi();
            }
        });
    }
}

#[exception]
fn SysTick() {
    TICKS.fetch_add(1, Ordering::Relaxed);
}

/// Console on the debugger through semihosting
#[cfg(all(feature = "mutex", feature = "timers"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct SemihostingSink;

#[cfg(all(feature = "mutex", feature = "timers"))]
impl crate::blinky::OutputSink for SemihostingSink {
    fn print(&self, line: &str) {
        cortex_m_semihosting::hprintln!("{}", line);
    }
}
