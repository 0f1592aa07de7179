//! Host configuration
//!
//! Loaded from a TOML file. Every key is optional; missing keys take the
//! defaults below, and command-line flags override what the file says.
//!
//! ```toml
//! port = "/dev/ttyACM0"
//! baud_rate = 115200
//!
//! [transfer]
//! handshake_timeout_ms = 2000
//! handshake_attempts = 5
//! handshake_backoff_ms = 2000
//! chunk_timeout_ms = 3000
//! # completion_timeout_ms = 60000
//! poll_interval_ms = 1
//! ```

use std::fs;
use std::path::Path;

use inkwire_protocol::BAUDRATE;
use serde::Deserialize;

use crate::client::TransferConfig;
use crate::error::ConfigError;

/// Serial port the Pico shows up as by default
pub const DEFAULT_PORT: &str = "/dev/ttyACM0";

/// Host configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Serial port path
    pub port: String,
    /// Link speed
    pub baud_rate: u32,
    /// Transfer timing
    pub transfer: TransferConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: BAUDRATE,
            transfer: TransferConfig::default(),
        }
    }
}

impl HostConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }
}
