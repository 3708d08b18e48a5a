//! Core error types for rscc

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the rscc crates
#[derive(Error, Debug)]
pub enum RsccError {
    /// Key error
    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    /// Status error
    #[error("Status error: {0}")]
    Status(#[from] StatusError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Service error
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejected session key text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// Key does not have exactly nine digits
    #[error("Key must have exactly 9 digits, got {0}")]
    WrongLength(usize),

    /// Key contains something other than ASCII digits
    #[error("Key contains a non-digit character: {0:?}")]
    NonDigit(char),
}

/// Rejected status update
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusError {
    /// Severity index outside 0..=3
    #[error("Severity index out of range: {0}")]
    SeverityOutOfRange(i64),

    /// Status text was not provided
    #[error("Status text is missing")]
    MissingText,
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Failures reported by the external collaborators
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Program could not be started
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error while talking to a child process
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation requires a process that is not running
    #[error("{0} is not running")]
    NotRunning(&'static str),

    /// Helper program exited unsuccessfully
    #[error("{program} exited with code {code:?}")]
    Exited { program: String, code: Option<i32> },

    /// Helper program printed something we could not understand
    #[error("Malformed output from {program}: {message}")]
    MalformedOutput { program: String, message: String },

    /// Operation did not finish in time
    #[error("{0} timed out")]
    Timeout(&'static str),

    /// Service was closed while the operation was pending
    #[error("{0} was closed")]
    Closed(&'static str),
}
