//! Relay configuration.
//!
//! [`RelayConfig`] is the single source of truth for runtime settings.  It is
//! assembled in `main.rs` from three layers, later layers winning:
//!
//! 1. Built-in defaults ([`FileConfig::default`]).
//! 2. An optional TOML file passed with `--config`.
//! 3. Individual CLI flags / `FPSCAN_*` environment variables.
//!
//! # File format
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! port = 5000
//! outbound_queue = 16
//! log_level = "info"
//!
//! [capture]
//! device_index = 0
//! width = 300
//! height = 400
//! poll_interval_ms = 100
//! template_capacity = 2048
//! ```
//!
//! Every field is optional; missing fields take the defaults above.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use fpscan_core::domain::config::{
    DEFAULT_DEVICE_INDEX, DEFAULT_HEIGHT, DEFAULT_POLL_INTERVAL, DEFAULT_TEMPLATE_CAPACITY,
    DEFAULT_WIDTH,
};
use fpscan_core::{CaptureConfig, ConfigError};
use serde::Deserialize;
use thiserror::Error;

/// Error type for loading and validating relay configuration.
#[derive(Debug, Error)]
pub enum RelayConfigError {
    /// The config file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// `bind_address` is not an IP address.
    #[error("invalid bind address '{0}'")]
    InvalidBindAddress(String),

    /// Outbound queues need room for at least one frame.
    #[error("outbound queue length must be greater than zero")]
    ZeroOutboundQueue,

    /// The capture section failed validation.
    #[error(transparent)]
    Capture(#[from] ConfigError),
}

/// Validated runtime configuration for the relay.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    /// Address the WebSocket server listens on.
    pub bind_addr: SocketAddr,
    /// Frames buffered per client before new frames are dropped for it.
    pub outbound_queue: usize,
    /// `tracing` filter used when `RUST_LOG` is not set.
    pub log_level: String,
    /// Scanner and polling settings.
    pub capture: CaptureConfig,
}

impl Default for RelayConfig {
    /// | Field          | Default        |
    /// |----------------|----------------|
    /// | bind_addr      | `0.0.0.0:5000` |
    /// | outbound_queue | 16             |
    /// | log_level      | `info`         |
    /// | capture        | 300x400, 100 ms, device 0 |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), default_port()),
            outbound_queue: default_outbound_queue(),
            log_level: default_log_level(),
            capture: CaptureConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Checks every setting once, before anything is started.
    ///
    /// # Errors
    ///
    /// [`RelayConfigError::ZeroOutboundQueue`] or
    /// [`RelayConfigError::Capture`].
    pub fn validate(&self) -> Result<(), RelayConfigError> {
        if self.outbound_queue == 0 {
            return Err(RelayConfigError::ZeroOutboundQueue);
        }
        self.capture.validate()?;
        Ok(())
    }
}

// ── File schema ───────────────────────────────────────────────────────────────

/// On-disk configuration, mirroring the TOML layout.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub capture: CaptureSection,
}

/// `[server]` table.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServerSection {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// `[capture]` table.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CaptureSection {
    #[serde(default = "default_device_index")]
    pub device_index: u32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_template_capacity")]
    pub template_capacity: usize,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5000
}
fn default_outbound_queue() -> usize {
    16
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_device_index() -> u32 {
    DEFAULT_DEVICE_INDEX
}
fn default_width() -> u32 {
    DEFAULT_WIDTH
}
fn default_height() -> u32 {
    DEFAULT_HEIGHT
}
fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}
fn default_template_capacity() -> usize {
    DEFAULT_TEMPLATE_CAPACITY
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            outbound_queue: default_outbound_queue(),
            log_level: default_log_level(),
        }
    }
}

impl Default for CaptureSection {
    fn default() -> Self {
        Self {
            device_index: default_device_index(),
            width: default_width(),
            height: default_height(),
            poll_interval_ms: default_poll_interval_ms(),
            template_capacity: default_template_capacity(),
        }
    }
}

impl FileConfig {
    /// Parses TOML text.
    ///
    /// # Errors
    ///
    /// [`RelayConfigError::Parse`] if the TOML is malformed or has wrongly
    /// typed fields.
    pub fn from_toml(content: &str) -> Result<Self, RelayConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Reads and parses the file at `path`.
    ///
    /// # Errors
    ///
    /// [`RelayConfigError::Io`] if the file cannot be read (including when it
    /// does not exist) and [`RelayConfigError::Parse`] if it is malformed.
    pub fn load(path: &Path) -> Result<Self, RelayConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| RelayConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Converts the file schema into a validated [`RelayConfig`].
    ///
    /// # Errors
    ///
    /// [`RelayConfigError::InvalidBindAddress`] or any validation error from
    /// [`RelayConfig::validate`].
    pub fn into_relay_config(self) -> Result<RelayConfig, RelayConfigError> {
        let ip: IpAddr = self
            .server
            .bind_address
            .parse()
            .map_err(|_| RelayConfigError::InvalidBindAddress(self.server.bind_address.clone()))?;

        let config = RelayConfig {
            bind_addr: SocketAddr::new(ip, self.server.port),
            outbound_queue: self.server.outbound_queue,
            log_level: self.server.log_level,
            capture: CaptureConfig {
                device_index: self.capture.device_index,
                width: self.capture.width,
                height: self.capture.height,
                poll_interval: Duration::from_millis(self.capture.poll_interval_ms),
                template_capacity: self.capture.template_capacity,
            },
        };
        config.validate()?;
        Ok(config)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_relay_config_listens_on_port_5000() {
        let cfg = RelayConfig::default();
        assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:5000");
        assert_eq!(cfg.outbound_queue, 16);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn test_default_file_config_matches_default_relay_config() {
        let cfg = FileConfig::default().into_relay_config().unwrap();
        assert_eq!(cfg, RelayConfig::default());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let file = FileConfig::from_toml("").unwrap();
        assert_eq!(file, FileConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides_only_given_fields() {
        // Arrange
        let toml = r#"
            [server]
            port = 9001

            [capture]
            width = 256
            poll_interval_ms = 50
        "#;

        // Act
        let cfg = FileConfig::from_toml(toml)
            .unwrap()
            .into_relay_config()
            .unwrap();

        // Assert
        assert_eq!(cfg.bind_addr.port(), 9001);
        assert_eq!(cfg.bind_addr.ip().to_string(), "0.0.0.0");
        assert_eq!(cfg.capture.width, 256);
        assert_eq!(cfg.capture.height, 400);
        assert_eq!(cfg.capture.poll_interval, Duration::from_millis(50));
    }

    #[test]
    fn test_malformed_toml_is_a_parse_error() {
        let result = FileConfig::from_toml("[server]\nport = \"not a number\"");
        assert!(matches!(result, Err(RelayConfigError::Parse(_))));
    }

    #[test]
    fn test_invalid_bind_address_is_rejected() {
        let mut file = FileConfig::default();
        file.server.bind_address = "not.an.ip".to_string();

        let result = file.into_relay_config();

        assert!(matches!(result, Err(RelayConfigError::InvalidBindAddress(a)) if a == "not.an.ip"));
    }

    #[test]
    fn test_zero_outbound_queue_is_rejected() {
        let mut file = FileConfig::default();
        file.server.outbound_queue = 0;
        assert!(matches!(
            file.into_relay_config(),
            Err(RelayConfigError::ZeroOutboundQueue)
        ));
    }

    #[test]
    fn test_invalid_capture_section_is_rejected() {
        let mut file = FileConfig::default();
        file.capture.height = 0;
        assert!(matches!(
            file.into_relay_config(),
            Err(RelayConfigError::Capture(ConfigError::ZeroDimension { .. }))
        ));
    }

    #[test]
    fn test_load_reads_file_from_disk() {
        // Arrange
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[capture]\ndevice_index = 2").unwrap();

        // Act
        let cfg = FileConfig::load(file.path()).unwrap();

        // Assert
        assert_eq!(cfg.capture.device_index, 2);
    }

    #[test]
    fn test_load_missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let result = FileConfig::load(&path);

        assert!(matches!(result, Err(RelayConfigError::Io { path: p, .. }) if p == path));
    }
}
