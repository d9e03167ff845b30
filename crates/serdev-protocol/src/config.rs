//! Emulator configuration
//!
//! The configuration is a flat JSON document:
//!
//! ```json
//! {
//!     "port": "socket://0.0.0.0:5000",
//!     "baudrate": 115200,
//!     "data_bits": 8,
//!     "parity": "N",
//!     "stop_bits": 1,
//!     "echo_mode": false,
//!     "response_rules": [
//!         { "request_pattern": "AT", "response_data": "OK\r\n", "delay_ms": 0 }
//!     ]
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::rules::RuleSet;
use crate::target::TransportTarget;

/// Serial line parameters
///
/// Stored as given in the config file. They are only checked when a line
/// transport is opened, since listener targets never use them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineParams {
    /// Baud rate
    pub baudrate: u32,
    /// Data bits per character (5-8)
    pub data_bits: u8,
    /// Parity letter: N, E or O
    pub parity: String,
    /// Stop bits (1 or 2)
    pub stop_bits: u8,
}

impl Default for LineParams {
    fn default() -> Self {
        Self {
            baudrate: 9600,
            data_bits: 8,
            parity: "N".to_string(),
            stop_bits: 1,
        }
    }
}

/// Configuration file contents
///
/// The port is kept as written. It is only resolved into a
/// [`TransportTarget`] after any command line override has been applied, so
/// a file may carry a placeholder port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device or listen address, overridable from the command line
    pub port: String,
    /// Line parameters for serial targets
    #[serde(flatten)]
    pub line: LineParams,
    /// Echo flag and response rules
    #[serde(flatten)]
    pub rules: RuleSet,
}

impl DeviceConfig {
    /// Parse a configuration from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Replace the port, e.g. from a command line override
    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = port.into();
        self
    }

    /// Resolve the port into a transport target
    pub fn resolve(self) -> Result<EmulatorConfig, ConfigError> {
        let target = self.port.parse()?;
        Ok(EmulatorConfig {
            target,
            line: self.line,
            rules: self.rules,
        })
    }
}

/// Resolved emulator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmulatorConfig {
    /// Where the emulator attaches to
    pub target: TransportTarget,
    /// Line parameters for serial targets
    pub line: LineParams,
    /// Echo flag and response rules
    pub rules: RuleSet,
}

impl EmulatorConfig {
    /// Config for the given target with default line parameters
    pub fn new(target: TransportTarget, rules: RuleSet) -> Self {
        Self {
            target,
            line: LineParams::default(),
            rules,
        }
    }

    /// Replace the target
    pub fn with_target(mut self, target: TransportTarget) -> Self {
        self.target = target;
        self
    }

    /// Whether requests are echoed instead of matched
    pub fn echo_mode(&self) -> bool {
        self.rules.echo_mode
    }
}

/// Loads emulator configurations from JSON files
#[derive(Debug, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn new() -> Self {
        Self
    }

    /// Read and parse a configuration file
    pub fn load(&self, path: impl AsRef<Path>) -> Result<DeviceConfig, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        debug!("Reading config from {}", path.display());
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = DeviceConfig::from_json_str(&text)?;
        info!(
            "Loaded config {} ({} rule(s), echo_mode={})",
            path.display(),
            config.rules.rules.len(),
            config.rules.echo_mode
        );
        Ok(config)
    }
}
