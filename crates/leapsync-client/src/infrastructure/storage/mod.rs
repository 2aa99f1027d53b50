//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads the TOML configuration file from the
//! platform-appropriate directory (or an explicit path), fills in defaults
//! for anything missing, and converts the result into the settings the
//! network and application layers take.

pub mod config;
