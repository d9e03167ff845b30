//! Error types for configuration loading

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading an emulator configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file does not exist
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Config file exists but could not be read
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON or a missing required field
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Target string could not be resolved to a transport
    #[error("invalid target {target:?}: {reason}")]
    InvalidTarget { target: String, reason: String },
}
