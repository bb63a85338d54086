//! Error types for the kernel
//!
//! Uses Rust's Result pattern instead of C-style error pointers.

use core::fmt;

/// RTOS error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum OsError {
    // ============ Creation errors ============
    /// No task slot, timer slot or stack budget left
    ResourceExhausted = 12001,
    /// Malformed construction parameter (zero capacity, zero period, ...)
    InvalidArgument = 12002,

    // ============ Blocking call outcomes ============
    /// The deadline of a blocking call passed
    TimedOut = 29401,
    /// A non-blocking attempt could not complete
    WouldBlock = 25008,

    // ============ Mutex errors ============
    /// Caller is not the mutex owner
    NotOwner = 22401,
    /// Task already owns the mutex
    MutexOwner = 22402,

    // ============ OS state errors ============
    /// OS is already running
    OsRunning = 24202,
    /// No application task created
    NoAppTask = 24204,
    /// Blocking call made outside of a task
    NotInTask = 24205,

    // ============ Task errors ============
    /// Task handle does not name a created task
    TaskInvalid = 29007,
    /// Task is not suspended
    TaskNotSuspended = 29011,
}

/// Result type alias for RTOS operations
pub type OsResult<T> = Result<T, OsError>;

impl OsError {
    /// Numeric error code
    #[inline]
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Whether the caller may reasonably retry or carry on
    ///
    /// Creation failures and logic errors are not recoverable.
    #[inline]
    pub fn is_recoverable(self) -> bool {
        matches!(self, OsError::TimedOut | OsError::WouldBlock)
    }
}

impl fmt::Display for OsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            OsError::ResourceExhausted => "resource exhausted",
            OsError::InvalidArgument => "invalid argument",
            OsError::TimedOut => "timed out",
            OsError::WouldBlock => "operation would block",
            OsError::NotOwner => "mutex released by a task that does not own it",
            OsError::MutexOwner => "mutex already owned by the caller",
            OsError::OsRunning => "scheduler already running",
            OsError::NoAppTask => "no application task created",
            OsError::NotInTask => "blocking call outside of a task",
            OsError::TaskInvalid => "invalid task handle",
            OsError::TaskNotSuspended => "task is not suspended",
        };
        write!(f, "{} (E{})", msg, self.code())
    }
}

impl core::error::Error for OsError {}
