//! The connector seam: turns a socket address into a writable stream.

use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::io::AsyncWrite;
use tokio::net::{TcpSocket, TcpStream};

/// Opens one outbound stream per call.
///
/// A connector performs a single attempt and never retries; the connection
/// manager owns the retry count and the per-attempt timeout.
#[async_trait]
pub trait Connector: Send + Sync {
    /// The stream produced by a successful attempt.
    type Stream: AsyncWrite + Unpin + Send;

    /// Attempts one connection to `addr`.
    async fn connect(&self, addr: SocketAddr) -> std::io::Result<Self::Stream>;
}

/// [`Connector`] backed by a non-blocking tokio [`TcpSocket`].
///
/// `TCP_NODELAY` is enabled on the resulting stream: frames are tiny and
/// latency matters more than packet count.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, addr: SocketAddr) -> std::io::Result<TcpStream> {
        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4()?,
            SocketAddr::V6(_) => TcpSocket::new_v6()?,
        };
        let stream = socket.connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}
