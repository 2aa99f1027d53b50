//! TOML-based configuration for the client.
//!
//! Reads and writes `ClientConfig` at the platform-appropriate location:
//! - Windows:  `%APPDATA%\LeapSync\config.toml`
//! - Linux:    `~/.config/leapsync/config.toml`
//! - macOS:    `~/Library/Application Support/LeapSync/config.toml`
//!
//! A missing file is not an error: every field has a default, so the client
//! runs with the deployed settings (gateway target, port 9001) out of the
//! box.  Example:
//!
//! ```toml
//! [client]
//! log_level = "debug"
//!
//! [network]
//! target = "fixed"
//! server_host = "192.168.1.20"
//! max_attempts = 5
//!
//! [input]
//! accel_width = "narrow"
//! ```

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use leapsync_core::protocol::payload::{FieldWidth, PayloadFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::network::connection_manager::{ConnectionConfig, DEFAULT_SERVER_PORT};
use crate::infrastructure::network::service::DEFAULT_SERVICE_BUFFER_SIZE;
use crate::infrastructure::network::target::{TargetPolicy, DEFAULT_GATEWAY_OCTET};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// `target = "fixed"` was chosen without a `server_host`.
    #[error("network.target is \"fixed\" but network.server_host is not set")]
    MissingServerHost,
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub client: ClientSection,
    #[serde(default)]
    pub network: NetworkSection,
    #[serde(default)]
    pub input: InputSection,
}

/// General client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSection {
    /// Log filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Time between input samples.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

/// How the server address is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Derive from the client's own address.
    #[default]
    Gateway,
    /// Use `server_host`.
    Fixed,
}

/// Connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSection {
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    #[serde(default)]
    pub target: TargetKind,
    #[serde(default = "default_gateway_octet")]
    pub gateway_octet: u8,
    /// Required when `target = "fixed"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_host: Option<Ipv4Addr>,
    /// Replaces local address discovery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_address: Option<Ipv4Addr>,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_service_buffer_size")]
    pub service_buffer_size: usize,
}

/// Payload encoding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSection {
    #[serde(default = "default_gyro_width")]
    pub gyro_width: FieldWidth,
    #[serde(default = "default_accel_width")]
    pub accel_width: FieldWidth,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_tick_interval_ms() -> u64 {
    16
}
fn default_server_port() -> u16 {
    DEFAULT_SERVER_PORT
}
fn default_gateway_octet() -> u8 {
    DEFAULT_GATEWAY_OCTET
}
fn default_connect_timeout_ms() -> u64 {
    10_000
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    1_000
}
fn default_service_buffer_size() -> usize {
    DEFAULT_SERVICE_BUFFER_SIZE
}
fn default_gyro_width() -> FieldWidth {
    PayloadFormat::default().gyro
}
fn default_accel_width() -> FieldWidth {
    PayloadFormat::default().accel
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            server_port: default_server_port(),
            target: TargetKind::default(),
            gateway_octet: default_gateway_octet(),
            server_host: None,
            local_address: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            service_buffer_size: default_service_buffer_size(),
        }
    }
}

impl Default for InputSection {
    fn default() -> Self {
        Self {
            gyro_width: default_gyro_width(),
            accel_width: default_accel_width(),
        }
    }
}

impl ClientSection {
    /// The sampling interval as a [`Duration`], never shorter than 1 ms.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

impl NetworkSection {
    /// The target policy these settings select.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingServerHost`] for a fixed target without
    /// a host.
    pub fn target_policy(&self) -> Result<TargetPolicy, ConfigError> {
        match self.target {
            TargetKind::Gateway => Ok(TargetPolicy::Gateway {
                octet: self.gateway_octet,
            }),
            TargetKind::Fixed => self
                .server_host
                .map(|host| TargetPolicy::Fixed { host })
                .ok_or(ConfigError::MissingServerHost),
        }
    }

    /// Converts to the connection manager's settings.
    ///
    /// # Errors
    ///
    /// See [`target_policy`](Self::target_policy).
    pub fn connection_config(&self) -> Result<ConnectionConfig, ConfigError> {
        Ok(ConnectionConfig {
            port: self.server_port,
            policy: self.target_policy()?,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            max_attempts: self.max_attempts,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        })
    }
}

impl InputSection {
    /// The payload widths these settings select.
    pub fn payload_format(&self) -> PayloadFormat {
        PayloadFormat {
            gyro: self.gyro_width,
            accel: self.accel_width,
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `ClientConfig` from the default location, returning defaults if
/// the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `ClientConfig` from `path`, returning defaults if it does not exist.
///
/// # Errors
///
/// Same as [`load_config`].
pub fn load_config_from(path: &Path) -> Result<ClientConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ClientConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(config: &ClientConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config base directory including the `LeapSync`
/// subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("LeapSync"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("LeapSync")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("leapsync"))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
