//! Error types for the host responder.

use eeprommer_protocol::ProtocolError;
use thiserror::Error;

/// Errors raised while serving the programmer.
#[derive(Debug, Error)]
pub enum HostError {
    /// Framing or transport failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The storage handle failed.
    #[error("storage {op} failed: {source}")]
    Storage {
        /// Operation that failed (open, seek, read, ...).
        op: &'static str,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// No path could be obtained for a FILEOPEN.
    #[error("path resolution failed: {0}")]
    Resolve(String),

    /// A Configured session has no storage handle.
    #[error("no file is open")]
    NoOpenFile,

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Could not read the configuration file.
    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        /// Path of the config file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Could not parse the configuration file.
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Serial port failure.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl HostError {
    /// Wrap a storage I/O error with the operation that produced it.
    pub fn storage(op: &'static str) -> impl FnOnce(std::io::Error) -> HostError {
        move |source| HostError::Storage { op, source }
    }

    /// Whether the driver loop must stop.
    ///
    /// Storage, resolution and payload errors only fail the current command.
    pub fn is_fatal(&self) -> bool {
        match self {
            HostError::Protocol(e) => e.is_transport(),
            HostError::Serial(_) => true,
            _ => false,
        }
    }
}

/// Result type alias for host operations.
pub type HostResult<T> = Result<T, HostError>;
