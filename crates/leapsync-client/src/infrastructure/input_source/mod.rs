//! Input sources: where each tick's [`InputSample`] comes from.
//!
//! On the handheld the sample is read straight from the input hardware.  On
//! a desktop host there is no such hardware, so the binary replays a
//! recorded script instead, and tests feed samples directly.
//!
//! # Testability
//!
//! The [`InputSource`] trait lets the tick loop run against
//! [`mock::ScriptedInputSource`] without any device or file.

use leapsync_core::InputSample;

pub mod mock;
pub mod replay;

pub use mock::ScriptedInputSource;
pub use replay::{ReplayError, ReplayInputSource};

/// Produces one input sample per tick.
pub trait InputSource: Send {
    /// Reads the next sample, or `None` once the source is exhausted.
    fn next_sample(&mut self) -> Option<InputSample>;
}
