//! The network service seam.
//!
//! Before a socket can be opened the platform network service has to be
//! started and handed a working memory region.  [`NetworkService`] groups
//! those steps so the connection manager can drive them in order and tests
//! can replace them.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

use thiserror::Error;
use tracing::{debug, info};

/// Size of the working memory region handed to the service (1 MiB).
pub const DEFAULT_SERVICE_BUFFER_SIZE: usize = 0x10_0000;

/// Destination used to learn which local interface routes outward.
///
/// Connecting a UDP socket only selects a route; no packet is sent.
/// 192.0.2.0/24 is reserved for documentation and never answers.
const ROUTE_PROBE_ADDR: &str = "192.0.2.1:9";

/// Errors raised while acquiring the network service.  None are retried.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The working memory region could not be reserved.
    #[error("could not reserve {size} bytes of service memory")]
    OutOfMemory { size: usize },

    /// The service refused to start.
    #[error("network service failed to start: {0}")]
    ServiceInit(String),

    /// The client's own address could not be determined.
    #[error("could not determine the local IPv4 address: {0}")]
    LocalAddress(#[source] std::io::Error),

    /// The routed interface has no IPv4 address.
    #[error("local address {0} is not a usable IPv4 address")]
    NotIpv4(IpAddr),
}

/// Platform network service lifecycle.
///
/// Release methods must tolerate being called when nothing is held.
#[cfg_attr(test, mockall::automock)]
pub trait NetworkService: Send {
    /// Reserves the working memory region and starts the service.
    fn acquire(&mut self) -> Result<(), ResourceError>;

    /// The IPv4 address assigned to this client.
    fn local_ipv4(&self) -> Result<Ipv4Addr, ResourceError>;

    /// Stops the service.
    fn shutdown(&mut self);

    /// Frees the working memory region.
    fn free_memory(&mut self);
}

/// [`NetworkService`] for a desktop host.
///
/// The host OS already runs its network stack, so "starting the service"
/// amounts to reserving the working buffer.  The local address comes from
/// a configured override or from the interface the OS would route through.
#[derive(Debug)]
pub struct HostNetworkService {
    buffer_size: usize,
    buffer: Option<Vec<u8>>,
    running: bool,
    local_override: Option<Ipv4Addr>,
}

impl HostNetworkService {
    /// Creates a stopped service that will reserve `buffer_size` bytes.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size,
            buffer: None,
            running: false,
            local_override: None,
        }
    }

    /// Reports `addr` from [`local_ipv4`](NetworkService::local_ipv4)
    /// instead of probing the routing table.
    pub fn with_local_address(mut self, addr: Option<Ipv4Addr>) -> Self {
        self.local_override = addr;
        self
    }

    /// `true` while the service is started.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// `true` while the working buffer is reserved.
    pub fn holds_memory(&self) -> bool {
        self.buffer.is_some()
    }
}

impl Default for HostNetworkService {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_BUFFER_SIZE)
    }
}

impl NetworkService for HostNetworkService {
    fn acquire(&mut self) -> Result<(), ResourceError> {
        if self.buffer_size == 0 {
            return Err(ResourceError::ServiceInit(
                "service buffer size must be non-zero".to_string(),
            ));
        }
        if self.buffer.is_none() {
            let mut buffer = Vec::new();
            buffer
                .try_reserve_exact(self.buffer_size)
                .map_err(|_| ResourceError::OutOfMemory {
                    size: self.buffer_size,
                })?;
            self.buffer = Some(buffer);
        }
        self.running = true;
        info!(buffer_size = self.buffer_size, "network service started");
        Ok(())
    }

    fn local_ipv4(&self) -> Result<Ipv4Addr, ResourceError> {
        if let Some(addr) = self.local_override {
            return Ok(addr);
        }
        if !self.running {
            return Err(ResourceError::ServiceInit(
                "network service is not started".to_string(),
            ));
        }

        let probe = UdpSocket::bind(("0.0.0.0", 0)).map_err(ResourceError::LocalAddress)?;
        probe
            .connect(ROUTE_PROBE_ADDR)
            .map_err(ResourceError::LocalAddress)?;
        match probe.local_addr().map_err(ResourceError::LocalAddress)? {
            SocketAddr::V4(v4) if !v4.ip().is_unspecified() => {
                debug!(addr = %v4.ip(), "local address discovered");
                Ok(*v4.ip())
            }
            other => Err(ResourceError::NotIpv4(other.ip())),
        }
    }

    fn shutdown(&mut self) {
        if self.running {
            self.running = false;
            info!("network service stopped");
        }
    }

    fn free_memory(&mut self) {
        if self.buffer.take().is_some() {
            debug!("service memory released");
        }
    }
}
