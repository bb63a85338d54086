//! Synchronization primitives
//!
//! Contains message queues, mutexes and the software timer service.

pub(crate) mod pend;

pub mod queue;

#[cfg(feature = "mutex")]
pub mod mutex;

#[cfg(feature = "timers")]
pub mod timer;
