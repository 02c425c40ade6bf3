//! # Time-Sync Configuration
//!
//! Serial, synchronization and output settings for the sender. Every field
//! has a default, so an empty file (or no file at all) yields a working
//! configuration for an Arduino-style board on `/dev/ttyUSB0`.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [serial]
//! device = "/dev/ttyACM0"
//! baud = 115200
//! read_timeout_ms = 1000
//! write_timeout_ms = 1000
//!
//! [sync]
//! settle_ms = 3000
//! compensation_secs = 0.55
//!
//! [output]
//! format = "raw"
//! ```
//!
//! ## Example: Rust Usage
//!
//! ```rust
//! use mcu_timesync::config::{Config, EchoFormat};
//! let toml_str = r#"
//! [serial]
//! device = "/dev/ttyACM0"
//!
//! [output]
//! format = "raw"
//! "#;
//! let config: Config = toml::from_str(toml_str).unwrap();
//! assert_eq!(config.serial.device, "/dev/ttyACM0");
//! assert_eq!(config.serial.baud, 115200);
//! assert_eq!(config.output.format, EchoFormat::Raw);
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration struct: serial channel, sync timing and echo output.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Serial channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SerialConfig {
    #[serde(default = "default_device")]
    pub device: String,
    #[serde(default = "default_baud")]
    pub baud: u32,
    #[serde(default = "default_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub write_timeout_ms: u64,
    /// Upper bound on bytes returned by a single read.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            baud: default_baud(),
            read_timeout_ms: default_timeout_ms(),
            write_timeout_ms: default_timeout_ms(),
            buffer_size: default_buffer_size(),
        }
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

/// Timing of the one-shot sync command.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Pause after opening the port so the board's reset chatter can finish.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Seconds added to the clock reading to cover transmit and processing latency.
    #[serde(default = "default_compensation_secs")]
    pub compensation_secs: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
            compensation_secs: default_compensation_secs(),
        }
    }
}

impl SyncConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EchoFormat {
    /// One `b'...'` line per read, empty reads included.
    #[default]
    Escaped,
    /// Bytes passed through untouched.
    Raw,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: EchoFormat,
}

impl Config {
    /// Reject values the sender cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serial.device.trim().is_empty() {
            return Err(ConfigError::Invalid("serial.device must not be empty".to_string()));
        }
        if self.serial.baud == 0 {
            return Err(ConfigError::Invalid("serial.baud must be > 0".to_string()));
        }
        if self.serial.read_timeout_ms == 0 || self.serial.write_timeout_ms == 0 {
            return Err(ConfigError::Invalid("serial timeouts must be > 0 ms".to_string()));
        }
        if self.serial.buffer_size == 0 {
            return Err(ConfigError::Invalid("serial.buffer_size must be > 0".to_string()));
        }
        if !self.sync.compensation_secs.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "sync.compensation_secs must be finite, got {}",
                self.sync.compensation_secs
            )));
        }
        Ok(())
    }
}

// Default value functions
fn default_device() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud() -> u32 { 115200 }
fn default_timeout_ms() -> u64 { 1000 }
fn default_buffer_size() -> usize { 256 }
fn default_settle_ms() -> u64 { 3000 }
fn default_compensation_secs() -> f64 { 0.55 }

/// Load configuration from a TOML file at the given path.
pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    let config: Config = match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("Failed to parse config TOML: {}", e);
                return Err(ConfigError::Toml(e));
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path, e);
            return Err(ConfigError::Io(e));
        }
    };
    config.validate()?;
    Ok(config)
}
