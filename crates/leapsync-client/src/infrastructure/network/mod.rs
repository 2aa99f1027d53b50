//! Network infrastructure for the client application.
//!
//! # Sub-modules
//!
//! - **`connection_manager`** – The socket lifecycle state machine:
//!   acquire the network service, derive the target, connect with a bounded
//!   number of attempts each under a timeout, and release everything on
//!   shutdown or failure.
//!
//! - **`connector`** – The [`Connector`] seam and its TCP implementation.
//!
//! - **`service`** – The [`NetworkService`] seam (service + working memory)
//!   and its host implementation.
//!
//! - **`target`** – Server address derivation from the client's own address.
//!
//! - **`transport`** – Writes one frame to a connected stream, plus the
//!   [`FrameSink`] / [`EventEmitter`] traits used by the application layer.

pub mod connection_manager;
pub mod connector;
pub mod service;
pub mod target;
pub mod transport;

pub use connection_manager::{
    CancellationFlag, ConnectError, ConnectionConfig, ConnectionManager, ConnectionPhase,
    OpenError,
};
pub use connector::{Connector, TcpConnector};
pub use service::{HostNetworkService, NetworkService, ResourceError};
pub use target::TargetPolicy;
pub use transport::{EventEmitter, FrameSink, Transport, TransportError};
