//! Console blinky demo on the hosted port

use tickos::blinky::{self, BlinkyConfig, QUEUE_LENGTH};
use tickos::port::hosted::{init_logger, StdClock, StdinInput, StdoutSink};
use tickos::{os_halt, Kernel};

fn main() {
    init_logger();

    let kernel = Kernel::new();
    let cfg = BlinkyConfig::default();
    let input = StdinInput::new(&kernel);
    let mut clock = StdClock::new();

    log::info!("starting blinky: {:?}", cfg);

    if let Err(err) =
        blinky::run::<QUEUE_LENGTH, _, _, _>(&kernel, &cfg, &mut clock, &StdoutSink, &input, None)
    {
        os_halt(err);
    }
}
