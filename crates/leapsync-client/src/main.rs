//! LeapSync client entry point.
//!
//! Loads configuration, opens the connection to the listener, then runs the
//! tick loop until the exit chord, the end of the replay script, or Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()                 -- TOML file + CLI overrides
//!  └─ ConnectionManager::open()     -- service, target, bounded connect
//!  └─ MirrorInputUseCase::run()     -- sample → diff → frame → socket
//!  └─ ConnectionManager::close()    -- socket, service, memory
//! ```
//!
//! # Usage
//!
//! ```text
//! leapsync-client --replay demo.toml [OPTIONS]
//!
//! Options:
//!   --config  <PATH>   Config file [default: platform config dir]
//!   --server  <IPV4>   Connect to this host instead of the derived gateway
//!   --port    <PORT>   Listener port [default: from config, 9001]
//!   --replay  <PATH>   Replay script supplying input samples
//!   --tick-ms <MS>     Sampling interval [default: from config, 16]
//! ```
//!
//! A failed connection is not retried after `open` gives up: the error is
//! logged and the process exits non-zero.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use leapsync_client::application::mirror_input::MirrorInputUseCase;
use leapsync_client::infrastructure::input_source::ReplayInputSource;
use leapsync_client::infrastructure::network::{
    CancellationFlag, ConnectionManager, HostNetworkService, TcpConnector,
};
use leapsync_client::infrastructure::storage::config::{
    load_config, load_config_from, ClientConfig, TargetKind,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Mirrors handheld input to a remote listener over TCP.
#[derive(Debug, Parser)]
#[command(name = "leapsync-client", version, about)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, env = "LEAPSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Listener IPv4 address.  Overrides gateway derivation.
    #[arg(long, env = "LEAPSYNC_SERVER")]
    server: Option<Ipv4Addr>,

    /// Listener TCP port.
    #[arg(long, env = "LEAPSYNC_PORT")]
    port: Option<u16>,

    /// Replay script supplying one input sample per tick.
    #[arg(long, env = "LEAPSYNC_REPLAY")]
    replay: PathBuf,

    /// Sampling interval in milliseconds.
    #[arg(long)]
    tick_ms: Option<u64>,
}

impl Cli {
    /// Loads the config file and applies the command-line overrides.
    fn resolve_config(&self) -> anyhow::Result<ClientConfig> {
        let mut cfg = match &self.config {
            Some(path) => load_config_from(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => load_config().context("loading config")?,
        };
        if let Some(host) = self.server {
            cfg.network.target = TargetKind::Fixed;
            cfg.network.server_host = Some(host);
        }
        if let Some(port) = self.port {
            cfg.network.server_port = port;
        }
        if let Some(ms) = self.tick_ms {
            cfg.client.tick_interval_ms = ms;
        }
        Ok(cfg)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = cli.resolve_config()?;

    // Initialise structured logging.  RUST_LOG wins over the config file.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.client.log_level)),
        )
        .init();

    info!("LeapSync client starting");

    let mut source = ReplayInputSource::from_path(&cli.replay)
        .with_context(|| format!("loading replay script {}", cli.replay.display()))?;
    info!(ticks = source.len(), "replay script ready");

    // ── Ctrl-C handler ────────────────────────────────────────────────────────
    let cancel = CancellationFlag::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            cancel_on_signal.cancel();
        }
    });

    // ── Connection ────────────────────────────────────────────────────────────
    let connection_config = cfg.network.connection_config()?;
    let service = HostNetworkService::new(cfg.network.service_buffer_size)
        .with_local_address(cfg.network.local_address);
    let mut connection = ConnectionManager::new(connection_config, service, TcpConnector);

    if let Err(e) = connection.open_with_cancel(&cancel).await {
        error!("could not reach the server: {e}");
        return Err(e).context("opening connection");
    }

    // ── Tick loop ─────────────────────────────────────────────────────────────
    let mut use_case = MirrorInputUseCase::new(cfg.input.payload_format());
    let result = use_case
        .run(
            &mut source,
            &mut connection,
            cfg.client.tick_interval(),
            &cancel,
        )
        .await;
    connection.close();

    match result {
        Ok(summary) => {
            if use_case.frames_dropped() > 0 {
                warn!(
                    dropped = use_case.frames_dropped(),
                    "some events did not fit their fields"
                );
            }
            info!(
                ticks = summary.ticks,
                frames = summary.frames_sent,
                reason = ?summary.stop,
                "LeapSync client stopped"
            );
            Ok(())
        }
        Err(e) => {
            error!("connection lost: {e}");
            Err(e).context("sending input")
        }
    }
}
