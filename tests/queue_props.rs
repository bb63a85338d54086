//! Queue properties checked against a `VecDeque` model

use core::cell::RefCell;
use core::convert::Infallible;
use core::pin::pin;
use std::collections::VecDeque;

use quickcheck_macros::quickcheck;
use tickos::{Kernel, OsError, OsTick, Queue, Scheduler, SimClock, Timeout};

const CAP: usize = 4;

#[quickcheck]
fn try_ops_match_model(ops: Vec<(bool, u8)>) -> bool {
    let kernel = Kernel::new();
    let q = Queue::<u8, CAP>::create(&kernel).unwrap();
    let mut model = VecDeque::new();

    for (send, value) in ops {
        let ok = if send {
            let expected = if model.len() < CAP {
                model.push_back(value);
                Ok(())
            } else {
                Err(OsError::WouldBlock)
            };
            q.try_send(value) == expected
        } else {
            q.try_receive() == model.pop_front().ok_or(OsError::WouldBlock)
        };
        if !ok || q.len() != model.len() || q.len() > CAP {
            return false;
        }
    }
    true
}

#[quickcheck]
fn fifo_order_is_kept(values: Vec<u8>) -> bool {
    let kernel = Kernel::new();
    let q = Queue::<u8, CAP>::create(&kernel).unwrap();

    let sent: Vec<u8> = values
        .iter()
        .copied()
        .filter(|&v| q.try_send(v).is_ok())
        .collect();
    let received: Vec<u8> = core::iter::from_fn(|| q.try_receive().ok()).collect();

    sent.len() == values.len().min(CAP) && received == sent
}

async fn producer(
    kernel: &Kernel,
    q: &Queue<'_, u32, 2>,
    id: u32,
    delays: &[u8],
) -> Infallible {
    for (seq, &d) in delays.iter().enumerate() {
        kernel.delay_for(OsTick::from(d)).await;
        q.send(id * 1000 + seq as u32, Timeout::Forever)
            .await
            .unwrap();
    }
    loop {
        kernel.delay_for(OsTick::MAX).await;
    }
}

async fn consumer(
    kernel: &Kernel,
    q: &Queue<'_, u32, 2>,
    pace: OsTick,
    got: &RefCell<Vec<u32>>,
) -> Infallible {
    loop {
        kernel.delay_for(pace).await;
        if let Ok(v) = q.receive(Timeout::Forever).await {
            got.borrow_mut().push(v);
        }
    }
}

/// Whatever the interleaving, each producer's messages arrive in order
#[quickcheck]
fn producers_keep_their_order(a: Vec<u8>, b: Vec<u8>, pace: u8, high_consumer: bool) -> bool {
    let a = &a[..a.len().min(20)];
    let b = &b[..b.len().min(20)];

    let kernel = Kernel::new();
    let q = Queue::<u32, 2>::create(&kernel).unwrap();
    let got = RefCell::new(Vec::new());

    let pa = pin!(producer(&kernel, &q, 1, a));
    let pb = pin!(producer(&kernel, &q, 2, b));
    let rx = pin!(consumer(&kernel, &q, OsTick::from(pace % 8), &got));
    let mut sched = Scheduler::new(&kernel);
    sched.create_task("A", pa, 2, 4096).unwrap();
    sched.create_task("B", pb, 2, 4096).unwrap();
    let rx_prio = if high_consumer { 3 } else { 1 };
    sched.create_task("rx", rx, rx_prio, 4096).unwrap();
    sched.run_until(&mut SimClock::new(), 100_000).unwrap();

    let got = got.borrow();
    let seqs = |id: u32| -> Vec<u32> {
        got.iter()
            .filter(|&&v| v / 1000 == id)
            .map(|&v| v % 1000)
            .collect()
    };
    let in_order = |n: usize, s: Vec<u32>| s == (0..n as u32).collect::<Vec<_>>();

    in_order(a.len(), seqs(1)) && in_order(b.len(), seqs(2)) && q.is_empty()
}
