//! ConnectionManager: owns the socket lifecycle from service start-up to shutdown.
//!
//! ```text
//!  Uninitialized ──acquire──▶ ServiceReady ──▶ Connecting ──ok──▶ Connected ──close──▶ Closed
//!        │                                       │    ▲                │
//!        │ ResourceError                         │    │ retry          │ send error
//!        ▼                                       ▼    │                ▼
//!      Failed ◀──────────── attempts exhausted ──┘────┘              Closed
//! ```
//!
//! `Failed` is terminal and is only entered after every acquired resource
//! has been released.  There is no automatic reconnect: once a live socket
//! fails, the manager closes and the caller decides whether to restart.
//!
//! # Why a timeout per attempt? (for beginners)
//!
//! A TCP connect to an address where nothing answers can hang for minutes
//! before the OS gives up.  The client cannot sample input while it waits, so
//! each attempt is wrapped in [`tokio::time::timeout`].  If the timer wins,
//! the half-open socket is dropped and a fresh one is used for the next try.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::time;
use tracing::{debug, error, info, warn};

use super::connector::Connector;
use super::service::{NetworkService, ResourceError};
use super::target::TargetPolicy;
use super::transport::{FrameSink, Transport, TransportError};

/// Default TCP port of the listener.
pub const DEFAULT_SERVER_PORT: u16 = 9001;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Failure of a single connect attempt, or of the whole retry sequence.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The attempt did not complete within the per-attempt timeout.
    #[error("connect to {addr} timed out after {timeout:?}")]
    Timeout { addr: SocketAddr, timeout: Duration },

    /// The attempt failed immediately (refused, unreachable, ...).
    #[error("connect to {addr} failed: {source}")]
    Io {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Every allowed attempt failed.  `last` is the final attempt's error.
    #[error("gave up after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<ConnectError>,
    },

    /// The caller raised the [`CancellationFlag`] during the sequence.
    #[error("connection attempt cancelled")]
    Cancelled,
}

/// Errors returned by [`ConnectionManager::open`].
#[derive(Debug, Error)]
pub enum OpenError {
    /// The network service or its memory could not be acquired.
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// No connection could be established.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// `open` was called on a manager that is not freshly created.
    #[error("cannot open a connection from phase {0:?}")]
    InvalidPhase(ConnectionPhase),
}

// ── State ─────────────────────────────────────────────────────────────────────

/// Lifecycle phase of a [`ConnectionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Uninitialized,
    ServiceReady,
    Connecting,
    Connected,
    Closed,
    Failed,
}

/// Settings for one connection lifecycle.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Listener port.
    pub port: u16,
    /// How the listener's address is chosen.
    pub policy: TargetPolicy,
    /// Upper bound on a single connect attempt.
    pub connect_timeout: Duration,
    /// Number of attempts before giving up.  Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Pause between a failed attempt and the next one.
    pub retry_delay: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERVER_PORT,
            policy: TargetPolicy::default(),
            connect_timeout: Duration::from_secs(10),
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Cooperative stop signal.
///
/// Clones share the same flag, so one can be handed to a Ctrl-C handler
/// while the other is passed to [`ConnectionManager::open_with_cancel`].
/// Raising it wakes every task parked in [`cancelled`](Self::cancelled), so
/// an in-flight connect attempt or retry pause ends straight away.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<CancelState>);

#[derive(Debug, Default)]
struct CancelState {
    raised: AtomicBool,
    notify: Notify,
}

impl CancellationFlag {
    /// Creates a flag that is not raised.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag.
    pub fn cancel(&self) {
        self.0.raised.store(true, Ordering::Release);
        self.0.notify.notify_waiters();
    }

    /// `true` once [`cancel`](Self::cancel) has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.0.raised.load(Ordering::Acquire)
    }

    /// Completes once the flag is raised.  Returns immediately if it already
    /// is.
    pub async fn cancelled(&self) {
        let notified = self.0.notify.notified();
        tokio::pin!(notified);
        // Register before checking, so a cancel between the two is not missed.
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

/// The connection manager.
///
/// Generic over the [`NetworkService`] and [`Connector`] so the whole state
/// machine can run against fakes.
pub struct ConnectionManager<S: NetworkService, C: Connector> {
    config: ConnectionConfig,
    service: S,
    connector: C,
    phase: ConnectionPhase,
    target: Option<SocketAddrV4>,
    attempts: u32,
    stream: Option<C::Stream>,
    service_held: bool,
}

impl<S: NetworkService, C: Connector> ConnectionManager<S, C> {
    /// Creates a manager in [`ConnectionPhase::Uninitialized`].
    pub fn new(config: ConnectionConfig, service: S, connector: C) -> Self {
        Self {
            config,
            service,
            connector,
            phase: ConnectionPhase::Uninitialized,
            target: None,
            attempts: 0,
            stream: None,
            service_held: false,
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    /// The address computed by the last `open`, if it got that far.
    pub fn target(&self) -> Option<SocketAddrV4> {
        self.target
    }

    /// Number of connect attempts made by the last `open`.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// `true` while a live stream is held.
    pub fn is_connected(&self) -> bool {
        self.phase == ConnectionPhase::Connected && self.stream.is_some()
    }

    /// Acquires the service, derives the target and connects.
    ///
    /// # Errors
    ///
    /// - [`OpenError::Resource`] if the service cannot be started.
    /// - [`OpenError::Connect`] with [`ConnectError::Exhausted`] once every
    ///   attempt has failed.
    /// - [`OpenError::InvalidPhase`] if called more than once.
    ///
    /// Every error path leaves the manager in [`ConnectionPhase::Failed`]
    /// with all resources released (except `InvalidPhase`, which changes
    /// nothing).
    pub async fn open(&mut self) -> Result<(), OpenError> {
        self.open_with_cancel(&CancellationFlag::new()).await
    }

    /// Same as [`open`](Self::open), but gives up as soon as `cancel` is
    /// raised, returning [`ConnectError::Cancelled`].  An attempt or retry
    /// pause in progress is abandoned rather than waited out.
    pub async fn open_with_cancel(&mut self, cancel: &CancellationFlag) -> Result<(), OpenError> {
        if self.phase != ConnectionPhase::Uninitialized {
            return Err(OpenError::InvalidPhase(self.phase));
        }

        self.service_held = true;
        if let Err(e) = self.service.acquire() {
            error!("network service acquisition failed: {e}");
            self.fail();
            return Err(e.into());
        }
        self.phase = ConnectionPhase::ServiceReady;

        let local = if self.config.policy.needs_local_address() {
            match self.service.local_ipv4() {
                Ok(addr) => addr,
                Err(e) => {
                    error!("could not determine local address: {e}");
                    self.fail();
                    return Err(e.into());
                }
            }
        } else {
            Ipv4Addr::UNSPECIFIED
        };
        let target = self.config.policy.resolve(local, self.config.port);
        self.target = Some(target);
        debug!(%local, %target, "server target resolved");

        self.phase = ConnectionPhase::Connecting;
        match self.connect_with_retry(SocketAddr::V4(target), cancel).await {
            Ok(stream) => {
                self.stream = Some(stream);
                self.phase = ConnectionPhase::Connected;
                info!(%target, attempts = self.attempts, "connected to server");
                Ok(())
            }
            Err(e) => {
                error!("could not connect to server: {e}");
                self.fail();
                Err(e.into())
            }
        }
    }

    /// Drops the socket, stops the service and frees its memory, in that
    /// order.  Safe to call any number of times.
    pub fn close(&mut self) {
        self.release_all();
        if matches!(
            self.phase,
            ConnectionPhase::ServiceReady | ConnectionPhase::Connecting | ConnectionPhase::Connected
        ) {
            self.phase = ConnectionPhase::Closed;
            info!("connection closed");
        }
    }

    async fn connect_with_retry(
        &mut self,
        addr: SocketAddr,
        cancel: &CancellationFlag,
    ) -> Result<C::Stream, ConnectError> {
        let max_attempts = self.config.max_attempts.max(1);
        let timeout = self.config.connect_timeout;
        self.attempts = 0;

        loop {
            if cancel.is_cancelled() {
                warn!("connect cancelled after {} attempt(s)", self.attempts);
                return Err(ConnectError::Cancelled);
            }
            self.attempts += 1;
            let attempt = self.attempts;
            info!(attempt, max_attempts, %addr, "connecting to server");

            let outcome = tokio::select! {
                outcome = time::timeout(timeout, self.connector.connect(addr)) => outcome,
                () = cancel.cancelled() => {
                    warn!(attempt, "connect cancelled mid-attempt");
                    return Err(ConnectError::Cancelled);
                }
            };
            let err = match outcome {
                Ok(Ok(stream)) => return Ok(stream),
                Ok(Err(source)) => ConnectError::Io { addr, source },
                Err(_) => ConnectError::Timeout { addr, timeout },
            };
            warn!(attempt, "connect attempt failed: {err}");

            if attempt >= max_attempts {
                return Err(ConnectError::Exhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }
            tokio::select! {
                () = time::sleep(self.config.retry_delay) => {}
                () = cancel.cancelled() => {
                    warn!(attempt, "connect cancelled during retry delay");
                    return Err(ConnectError::Cancelled);
                }
            }
        }
    }

    fn fail(&mut self) {
        self.release_all();
        self.phase = ConnectionPhase::Failed;
    }

    fn release_all(&mut self) {
        if self.stream.take().is_some() {
            debug!("socket closed");
        }
        if self.service_held {
            self.service.shutdown();
            self.service.free_memory();
            self.service_held = false;
        }
    }
}

impl<S: NetworkService, C: Connector> Drop for ConnectionManager<S, C> {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[async_trait]
impl<S: NetworkService, C: Connector> FrameSink for ConnectionManager<S, C> {
    /// Writes `frame` to the live socket.  A write failure closes the
    /// connection; it is not retried.
    async fn send_frame(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(TransportError::NotConnected);
        };
        let result = Transport::new(stream).send(frame).await;
        if let Err(e) = &result {
            error!("transport failure, closing connection: {e}");
            self.close();
        }
        result
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
