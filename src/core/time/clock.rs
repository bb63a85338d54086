//! Tick sources

use crate::types::OsTick;

/// Monotonic tick source driving the scheduler
pub trait Clock {
    /// Current tick
    fn now(&self) -> OsTick;

    /// Wait until the tick reaches `tick` or an interrupt may have made a
    /// task ready, whichever comes first
    fn idle_until(&mut self, tick: OsTick);
}

/// Virtual clock for simulation
///
/// Time only moves while the system is idle, and then jumps straight to
/// the next deadline. A task that never blocks therefore stops the clock.
#[derive(Debug, Default, Clone)]
pub struct SimClock {
    now: OsTick,
}

impl SimClock {
    pub const fn new() -> Self {
        Self { now: 0 }
    }

    pub const fn starting_at(tick: OsTick) -> Self {
        Self { now: tick }
    }

    /// Move time forward by `ticks`
    pub fn advance(&mut self, ticks: OsTick) {
        self.now = self.now.saturating_add(ticks);
    }
}

impl Clock for SimClock {
    fn now(&self) -> OsTick {
        self.now
    }

    fn idle_until(&mut self, tick: OsTick) {
        self.now = self.now.max(tick);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_clock_never_goes_back() {
        let mut clock = SimClock::starting_at(10);
        clock.idle_until(5);
        assert_eq!(clock.now(), 10);
        clock.idle_until(25);
        clock.advance(5);
        assert_eq!(clock.now(), 30);
    }
}
