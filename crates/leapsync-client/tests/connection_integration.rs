//! Integration tests for the connection lifecycle and the tick pipeline.
//!
//! # Purpose
//!
//! These tests drive `ConnectionManager` and `MirrorInputUseCase` through
//! their public API the same way `main.rs` does.  They verify:
//!
//! - Retry bounds: a connector that always refuses is tried exactly
//!   `max_attempts` times and every resource is released afterwards.
//! - Timeouts: a connector that never answers cannot stall `open` past
//!   `max_attempts × connect_timeout` plus the retry delays.
//! - Cleanup: `close` releases service then memory, once, however often it
//!   is called.
//! - End to end: samples go in on one side of a real loopback TCP socket and
//!   the expected SLIP frames come out on the other.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use leapsync_client::application::mirror_input::{MirrorInputUseCase, StopReason};
use leapsync_client::infrastructure::input_source::ScriptedInputSource;
use leapsync_client::infrastructure::network::{
    CancellationFlag, ConnectError, ConnectionConfig, ConnectionManager, ConnectionPhase,
    Connector, FrameSink, HostNetworkService, NetworkService, OpenError, ResourceError,
    TargetPolicy, TcpConnector, TransportError,
};
use leapsync_core::domain::sample::StickPosition;
use leapsync_core::protocol::slip::FrameDecoder;
use leapsync_core::{ChannelTag, ConsoleKey, InputSample, PayloadFormat};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

// ── Fakes ─────────────────────────────────────────────────────────────────────

/// Records the order of release calls.
#[derive(Clone, Default)]
struct RecordingService {
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingService {
    fn calls(&self) -> Vec<&'static str> {
        self.log.lock().unwrap().clone()
    }
}

impl NetworkService for RecordingService {
    fn acquire(&mut self) -> Result<(), ResourceError> {
        self.log.lock().unwrap().push("acquire");
        Ok(())
    }

    fn local_ipv4(&self) -> Result<Ipv4Addr, ResourceError> {
        Ok(Ipv4Addr::new(10, 0, 1, 55))
    }

    fn shutdown(&mut self) {
        self.log.lock().unwrap().push("shutdown");
    }

    fn free_memory(&mut self) {
        self.log.lock().unwrap().push("free_memory");
    }
}

/// Always refuses.
struct RefusingConnector {
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl Connector for RefusingConnector {
    type Stream = tokio::io::Sink;

    async fn connect(&self, _addr: SocketAddr) -> std::io::Result<tokio::io::Sink> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ))
    }
}

/// Never completes.
struct SilentConnector;

#[async_trait]
impl Connector for SilentConnector {
    type Stream = tokio::io::Sink;

    async fn connect(&self, _addr: SocketAddr) -> std::io::Result<tokio::io::Sink> {
        std::future::pending().await
    }
}

/// Always succeeds with a sink that discards writes.
struct SinkConnector;

#[async_trait]
impl Connector for SinkConnector {
    type Stream = tokio::io::Sink;

    async fn connect(&self, _addr: SocketAddr) -> std::io::Result<tokio::io::Sink> {
        Ok(tokio::io::sink())
    }
}

fn fast_config(max_attempts: u32) -> ConnectionConfig {
    ConnectionConfig {
        max_attempts,
        connect_timeout: Duration::from_millis(100),
        retry_delay: Duration::from_millis(5),
        ..ConnectionConfig::default()
    }
}

// ── Lifecycle ─────────────────────────────────────────────────────────────────

/// A refusing server is tried exactly `max_attempts` times, and the failure
/// path releases the service and its memory before returning.
#[tokio::test]
async fn test_refused_connection_exhausts_attempts_and_releases() {
    // Arrange
    let service = RecordingService::default();
    let calls = Arc::new(AtomicU32::new(0));
    let connector = RefusingConnector {
        calls: Arc::clone(&calls),
    };
    let mut mgr = ConnectionManager::new(fast_config(4), service.clone(), connector);

    // Act
    let err = mgr.open().await.unwrap_err();

    // Assert
    match err {
        OpenError::Connect(ConnectError::Exhausted { attempts, last }) => {
            assert_eq!(attempts, 4);
            assert!(matches!(*last, ConnectError::Io { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(mgr.attempts(), 4);
    assert_eq!(mgr.phase(), ConnectionPhase::Failed);
    assert_eq!(service.calls(), vec!["acquire", "shutdown", "free_memory"]);
    assert_eq!(mgr.target().unwrap().to_string(), "55.1.0.1:9001");
}

/// With paused time, a connector that never answers is abandoned after
/// exactly the configured timeout on every attempt.
#[tokio::test(start_paused = true)]
async fn test_unresponsive_server_is_bounded_by_timeout() {
    let config = ConnectionConfig {
        max_attempts: 3,
        connect_timeout: Duration::from_secs(10),
        retry_delay: Duration::from_secs(1),
        ..ConnectionConfig::default()
    };
    let mut mgr = ConnectionManager::new(config, RecordingService::default(), SilentConnector);
    let started = tokio::time::Instant::now();

    let err = mgr.open().await.unwrap_err();

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(32), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(33), "elapsed {elapsed:?}");
    assert!(matches!(
        err,
        OpenError::Connect(ConnectError::Exhausted { attempts: 3, .. })
    ));
}

/// `close` releases socket, service and memory once, in that order, no
/// matter how many times it is called.
#[tokio::test]
async fn test_close_is_idempotent_and_ordered() {
    let service = RecordingService::default();
    let mut mgr = ConnectionManager::new(fast_config(1), service.clone(), SinkConnector);
    mgr.open().await.expect("open must succeed");
    assert_eq!(mgr.phase(), ConnectionPhase::Connected);

    mgr.close();
    mgr.close();
    mgr.close();

    assert_eq!(mgr.phase(), ConnectionPhase::Closed);
    assert_eq!(service.calls(), vec!["acquire", "shutdown", "free_memory"]);
}

/// A cancellation raised before `open` stops it before any attempt.
#[tokio::test]
async fn test_cancelled_open_makes_no_attempts() {
    let service = RecordingService::default();
    let calls = Arc::new(AtomicU32::new(0));
    let connector = RefusingConnector {
        calls: Arc::clone(&calls),
    };
    let mut mgr = ConnectionManager::new(fast_config(3), service.clone(), connector);
    let cancel = CancellationFlag::new();
    cancel.cancel();

    let err = mgr.open_with_cancel(&cancel).await.unwrap_err();

    assert!(matches!(err, OpenError::Connect(ConnectError::Cancelled)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(service.calls(), vec!["acquire", "shutdown", "free_memory"]);
}

// ── End to end ────────────────────────────────────────────────────────────────

/// Samples fed to the use case arrive at a real TCP listener as SLIP frames
/// in channel order.
#[tokio::test]
async fn test_samples_arrive_as_frames_over_loopback() {
    // Arrange – listener that collects everything until the client hangs up
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        socket.read_to_end(&mut received).await.unwrap();
        received
    });

    let config = ConnectionConfig {
        port,
        policy: TargetPolicy::Fixed {
            host: Ipv4Addr::LOCALHOST,
        },
        ..fast_config(3)
    };
    let mut mgr = ConnectionManager::new(config, HostNetworkService::new(4096), TcpConnector);
    mgr.open().await.expect("open must succeed");

    // The stick stays where the second tick left it, so the chord tick only
    // carries the R press.
    let moved = StickPosition { dx: 12, dy: -7 };
    let chord = InputSample {
        circle_pad: moved,
        ..InputSample::with_buttons(
            ConsoleKey::R.mask(),
            ConsoleKey::Start.mask() | ConsoleKey::DDown.mask(),
            0,
        )
    };
    let mut source = ScriptedInputSource::new([
        InputSample::with_buttons(ConsoleKey::A.mask(), 0, 0),
        InputSample {
            circle_pad: moved,
            ..InputSample::with_buttons(0, 0, ConsoleKey::A.mask())
        },
        chord,
    ]);
    let mut use_case = MirrorInputUseCase::new(PayloadFormat::default());

    // Act
    let summary = use_case
        .run(
            &mut source,
            &mut mgr,
            Duration::from_millis(1),
            &CancellationFlag::new(),
        )
        .await
        .expect("run must succeed");
    mgr.close();
    let received = server.await.unwrap();

    // Assert
    assert_eq!(summary.stop, StopReason::ExitChord);
    assert_eq!(summary.frames_sent, 4);

    let mut decoder = FrameDecoder::new();
    decoder.push(&received);
    let payloads: Vec<Vec<u8>> = std::iter::from_fn(|| decoder.next_frame())
        .map(|frame| frame.expect("frame must decode"))
        .collect();

    let mut circle = b"(0012,-007)".to_vec();
    circle.push(ChannelTag::CirclePad as u8);
    assert_eq!(
        payloads,
        vec![
            vec![ConsoleKey::A.code(), ChannelTag::Pressed as u8],
            vec![ConsoleKey::A.code(), ChannelTag::Released as u8],
            circle,
            vec![ConsoleKey::R.code(), ChannelTag::Pressed as u8],
        ]
    );
}

/// Once closed, the manager refuses to send rather than reconnecting.
#[tokio::test]
async fn test_send_after_close_is_not_connected() {
    let service = RecordingService::default();
    let mut mgr = ConnectionManager::new(fast_config(1), service, SinkConnector);
    mgr.open().await.unwrap();
    mgr.close();

    let result = mgr.send_frame(&[0x00, 0xF1, 0xC0]).await;

    assert!(matches!(result, Err(TransportError::NotConnected)));
}

/// Raising the flag while an attempt is still waiting on the listener ends
/// `open` at once instead of after the attempt's timeout.
#[tokio::test(start_paused = true)]
async fn test_cancel_during_attempt_returns_promptly() {
    // Arrange
    let service = RecordingService::default();
    let config = ConnectionConfig::default();
    let mut mgr = ConnectionManager::new(config, service.clone(), SilentConnector);
    let cancel = CancellationFlag::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        ctrl_c.cancel();
    });
    let started = tokio::time::Instant::now();

    // Act
    let err = mgr.open_with_cancel(&cancel).await.unwrap_err();

    // Assert
    let elapsed = started.elapsed();
    assert!(elapsed < Duration::from_secs(1), "elapsed {elapsed:?}");
    assert!(matches!(err, OpenError::Connect(ConnectError::Cancelled)));
    assert_eq!(mgr.attempts(), 1);
    assert_eq!(service.calls(), vec!["acquire", "shutdown", "free_memory"]);
}
