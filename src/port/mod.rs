//! Port layer - platform-specific implementations
//!
//! Tick sources and console collaborators for the supported platforms.

#[cfg(target_arch = "arm")]
pub mod cortex_m4;

#[cfg(target_arch = "arm")]
pub use cortex_m4::*;

#[cfg(feature = "std")]
pub mod hosted;

#[cfg(feature = "std")]
pub use hosted::*;
