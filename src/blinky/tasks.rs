//! Demo task bodies

use core::convert::Infallible;

use super::io::{InputError, InputSource, OutputSink};
use super::BlinkyConfig;
use crate::kernel::Kernel;
use crate::sync::mutex::Mutex;
use crate::sync::queue::{Queue, TrySender};
use crate::sync::timer::{TimerId, TimerService};
use crate::types::Timeout;

const PROMPT: &str = "Enter '1' to RESET, or '0' to continue: ";

/// Origin of a received value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MessageSource {
    Task,
    Timer,
    Unexpected,
}

impl MessageSource {
    pub fn message(self) -> &'static str {
        match self {
            MessageSource::Task => "Message received from task",
            MessageSource::Timer => "Message received from software timer",
            MessageSource::Unexpected => "Unexpected message",
        }
    }
}

pub fn classify(value: u32, cfg: &BlinkyConfig) -> MessageSource {
    if value == cfg.value_from_task {
        MessageSource::Task
    } else if value == cfg.value_from_timer {
        MessageSource::Timer
    } else {
        MessageSource::Unexpected
    }
}

/// Periodic producer
///
/// The wake tick is computed once and advanced by the period, so the sends
/// land on exact multiples of the period whatever the scheduling delay.
pub async fn queue_send_task<const N: usize>(
    kernel: &Kernel,
    queue: &Queue<'_, u32, N>,
    cfg: &BlinkyConfig,
) -> Infallible {
    let mut next_wake = kernel.now();
    loop {
        next_wake = next_wake.saturating_add(cfg.send_period);
        kernel.delay_until(next_wake).await;

        if let Err(err) = queue.send(cfg.value_from_task, Timeout::NoWait).await {
            crate::debug!("TX dropped a message: {}", err);
        }
    }
}

/// Software timer callback body
pub fn timer_send<const N: usize>(tx: &TrySender<'_, '_, u32, N>, value: u32) {
    if let Err(err) = tx.try_send(value) {
        crate::debug!("timer dropped a message: {}", err);
    }
}

/// Consumer: report where each message came from
pub async fn queue_receive_task<const N: usize, S: OutputSink>(
    queue: &Queue<'_, u32, N>,
    cfg: &BlinkyConfig,
    sink: &S,
) -> Infallible {
    loop {
        match queue.receive(Timeout::Forever).await {
            Ok(value) => sink.print(classify(value, cfg).message()),
            Err(err) => crate::warn!("Rx: {}", err),
        }
    }
}

/// What the guard task needs to reach
#[derive(Clone, Copy)]
pub struct ResetHandles<'a, 'k, 't, const T: usize> {
    pub mutex: &'a Mutex<'k>,
    pub timers: &'a TimerService<'k, 't, T>,
    pub timer: TimerId,
}

/// Guard task: read the console under the mutex
pub async fn reset_task<const T: usize, I: InputSource, S: OutputSink>(
    kernel: &Kernel,
    handles: ResetHandles<'_, '_, '_, T>,
    input: &I,
    sink: &S,
    cfg: &BlinkyConfig,
) -> Infallible {
    loop {
        match handles.mutex.take(Timeout::Forever).await {
            Ok(()) => {
                sink.print(PROMPT);
                match input.read_int().await {
                    Ok(1) => {
                        sink.print("Reset received: 1");
                        if let Err(err) = handles.timers.reset(handles.timer) {
                            crate::error!("timer reset failed: {}", err);
                        }
                    }
                    Ok(value) => sink.print_fmt(format_args!("Reset value: {}", value)),
                    Err(InputError::Malformed) => {
                        sink.print("Invalid input. Please enter a valid number.")
                    }
                    Err(InputError::Closed) => crate::trace!("input closed"),
                }

                if let Err(err) = handles.mutex.give().await {
                    crate::error!("Reset: {}", err);
                }
            }
            Err(err) => crate::warn!("Reset: {}", err),
        }

        kernel.delay_for(cfg.reset_idle).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_values() {
        let cfg = BlinkyConfig::default();
        assert_eq!(classify(100, &cfg), MessageSource::Task);
        assert_eq!(classify(200, &cfg), MessageSource::Timer);
        assert_eq!(classify(7, &cfg), MessageSource::Unexpected);
        assert_eq!(
            MessageSource::Timer.message(),
            "Message received from software timer"
        );
    }
}
