//! Critical section protected cell
//!
//! Kernel and object state shared between tasks, timer callbacks and
//! interrupt handlers lives in one of these.

use core::cell::RefCell;

use crate::critical::critical_section;

/// A cell that can only be accessed within a critical section.
pub struct CsCell<T>(critical_section::Mutex<RefCell<T>>);

impl<T> CsCell<T> {
    /// Create a new CsCell
    #[inline(always)]
    pub const fn new(value: T) -> Self {
        Self(critical_section::Mutex::new(RefCell::new(value)))
    }

    /// Run `f` on the inner value inside a fresh critical section
    ///
    /// `f` must not re-enter the same cell.
    #[inline]
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        critical_section(|cs| f(&mut self.0.borrow_ref_mut(cs)))
    }
}
