//! leapsync-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does leapsync-client do? (for beginners)
//!
//! The client watches a handheld's buttons, sticks, touch screen and motion
//! sensors, and forwards every *change* to a listener on another machine.
//! The listener turns those changes back into input on its side, so the
//! handheld behaves like a remote controller.
//!
//! The client application:
//!
//! 1. Works out where the listener lives (by default, by deriving an address
//!    from its own IPv4 address) and opens one TCP connection to it.
//! 2. Reads one [`InputSample`](leapsync_core::InputSample) per tick from an
//!    input source.
//! 3. Compares the sample with the previous one and builds an event for each
//!    channel that changed.
//! 4. Frames each event with SLIP and writes it to the socket immediately.
//! 5. Stops when the exit chord is pressed, the source runs dry, or Ctrl-C is
//!    received, then releases the socket and network service.

/// Application layer: the per-tick mirroring use case.
pub mod application;

/// Infrastructure layer: network, input sources, and configuration.
pub mod infrastructure;
