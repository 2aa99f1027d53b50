//! Infrastructure layer for the client application.
//!
//! Contains the adapters that touch the outside world: sockets, the host
//! network service, input sources and the configuration file.
//!
//! **Dependency rule**: this layer may depend on `leapsync_core`, but the
//! `application` layer only sees it through the [`FrameSink`](network::FrameSink)
//! trait.
//!
//! # Sub-modules
//!
//! - **`network`** – the connection state machine, target derivation, the
//!   frame transport and the traits that let tests swap out real sockets.
//!
//! - **`input_source`** – where samples come from.  A scripted source for
//!   tests and a TOML replay source for running the binary without hardware.
//!
//! - **`storage`** – TOML configuration loading and saving.

pub mod input_source;
pub mod network;
pub mod storage;
