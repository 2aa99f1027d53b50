//! Change-detection domain model.
//!
//! This module contains pure logic with no infrastructure dependencies: the
//! shape of one tick's raw input ([`sample`]) and the component that compares
//! consecutive samples ([`diff`]).
//!
//! # Why diff at all? (for beginners)
//!
//! The device is polled roughly sixty times a second, but most of the time
//! nothing moves.  Sending every sample would flood the listener with
//! identical readings.  Instead the client remembers what it last saw on each
//! channel and only sends an event when the new reading is different.

/// Raw per-tick input values.
pub mod sample;

/// The per-channel previous-value cache and change detection.
pub mod diff;
