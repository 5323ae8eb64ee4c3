//! Client configuration.
//!
//! [`ClientConfig`] holds every runtime setting the controller needs: where
//! the amplifier lives, which ports it listens on, and how long to wait for
//! it.  The file is optional and read-only; the CLI never writes it back.
//!
//! # What does the file look like? (for beginners)
//!
//! ```toml
//! [device]
//! host = "192.168.1.50"
//! control_port = 8899
//! skip_handshake = false
//!
//! [timeouts]
//! response_secs = 2
//! init_secs = 5
//!
//! [logging]
//! log_level = "debug"
//! ```
//!
//! Every field carries `#[serde(default = "...")]`, so a file containing only
//! `[device]\nhost = "..."` is valid and a missing file is equivalent to an
//! empty one.  CLI flags and `MATRIO_*` environment variables override the
//! file in `main.rs`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

/// Error type for reading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error other than "not found".
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the amplifier is and how to reach it.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Hostname or IP address.  `None` means "must be given on the command line".
    #[serde(default)]
    pub host: Option<String>,
    /// TCP port of the binary control channel.
    #[serde(default = "default_control_port")]
    pub control_port: u16,
    /// TCP port of the UPnP HTTP server used by the handshake.
    #[serde(default = "default_upnp_port")]
    pub upnp_port: u16,
    /// Port announced in the SUBSCRIBE `CALLBACK` header.
    #[serde(default = "default_callback_port")]
    pub callback_port: u16,
    /// Skip the UPnP handshake and open the control channel directly.
    #[serde(default)]
    pub skip_handshake: bool,
}

/// Timeouts, in whole seconds except the handshake step delay.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TimeoutConfig {
    #[serde(default = "default_connect_secs")]
    pub connect_secs: u64,
    /// How long a command waits for the device to answer.
    #[serde(default = "default_response_secs")]
    pub response_secs: u64,
    /// How long initialization waits for the sync and names frames.
    #[serde(default = "default_init_secs")]
    pub init_secs: u64,
    /// Pause between consecutive handshake requests.
    #[serde(default = "default_handshake_step_ms")]
    pub handshake_step_ms: u64,
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_control_port() -> u16 {
    8899
}
fn default_upnp_port() -> u16 {
    59152
}
fn default_callback_port() -> u16 {
    22809
}
fn default_connect_secs() -> u64 {
    10
}
fn default_response_secs() -> u64 {
    2
}
fn default_init_secs() -> u64 {
    5
}
fn default_handshake_step_ms() -> u64 {
    500
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: None,
            control_port: default_control_port(),
            upnp_port: default_upnp_port(),
            callback_port: default_callback_port(),
            skip_handshake: false,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: default_connect_secs(),
            response_secs: default_response_secs(),
            init_secs: default_init_secs(),
            handshake_step_ms: default_handshake_step_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn response(&self) -> Duration {
        Duration::from_secs(self.response_secs)
    }

    pub fn init(&self) -> Duration {
        Duration::from_secs(self.init_secs)
    }

    pub fn handshake_step(&self) -> Duration {
        Duration::from_millis(self.handshake_step_ms)
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Parses a configuration from TOML text.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the TOML is malformed or a field has the
/// wrong type.
pub fn parse_config(content: &str) -> Result<ClientConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Loads the configuration at `path`, returning `ClientConfig::default()` if
/// the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_config(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "config file not found, using defaults");
            Ok(ClientConfig::default())
        }
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports_match_device_firmware() {
        // Arrange / Act
        let cfg = ClientConfig::default();

        // Assert
        assert_eq!(cfg.device.control_port, 8899);
        assert_eq!(cfg.device.upnp_port, 59152);
        assert_eq!(cfg.device.callback_port, 22809);
        assert!(cfg.device.host.is_none());
        assert!(!cfg.device.skip_handshake);
    }

    #[test]
    fn test_default_timeouts() {
        let cfg = TimeoutConfig::default();
        assert_eq!(cfg.connect(), Duration::from_secs(10));
        assert_eq!(cfg.response(), Duration::from_secs(2));
        assert_eq!(cfg.init(), Duration::from_secs(5));
        assert_eq!(cfg.handshake_step(), Duration::from_millis(500));
    }

    #[test]
    fn test_default_log_level_is_info() {
        assert_eq!(LoggingConfig::default().log_level, "info");
    }

    #[test]
    fn test_empty_file_yields_defaults() {
        // Arrange / Act
        let cfg = parse_config("").expect("empty TOML is valid");

        // Assert
        assert_eq!(cfg, ClientConfig::default());
    }

    #[test]
    fn test_partial_file_fills_missing_fields_with_defaults() {
        // Arrange
        let text = "[device]\nhost = \"10.0.0.7\"\n\n[timeouts]\nresponse_secs = 4\n";

        // Act
        let cfg = parse_config(text).expect("parse");

        // Assert
        assert_eq!(cfg.device.host.as_deref(), Some("10.0.0.7"));
        assert_eq!(cfg.device.control_port, 8899);
        assert_eq!(cfg.timeouts.response_secs, 4);
        assert_eq!(cfg.timeouts.init_secs, 5);
        assert_eq!(cfg.logging.log_level, "info");
    }

    #[test]
    fn test_malformed_toml_is_a_parse_error() {
        let result = parse_config("[device\nhost = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_wrong_field_type_is_a_parse_error() {
        let result = parse_config("[device]\ncontrol_port = \"eighty\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file_returns_defaults() {
        // Arrange
        let path = std::env::temp_dir().join("matrio-config-that-does-not-exist.toml");

        // Act
        let cfg = load_config(&path).expect("missing file is not an error");

        // Assert
        assert_eq!(cfg, ClientConfig::default());
    }

    #[test]
    fn test_load_config_reads_file_from_disk() {
        // Arrange
        let path = std::env::temp_dir().join(format!("matrio-config-{}.toml", std::process::id()));
        std::fs::write(&path, "[device]\nskip_handshake = true\n").expect("write temp config");

        // Act
        let cfg = load_config(&path);
        let _ = std::fs::remove_file(&path);

        // Assert
        assert!(cfg.expect("load").device.skip_handshake);
    }
}
