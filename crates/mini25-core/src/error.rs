//! Core error types for mini25-core.
//!
//! Most operations in this crate are total over well-typed input. The error
//! hierarchy below covers the few user-triggered actions that can fail
//! (history import/export, audio playback) plus the I/O edges.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for mini25-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Imported text was not valid JSON or did not match the history schema.
    #[error("Malformed import: {reason}")]
    MalformedImport { reason: String },

    /// Export requested while the history is empty.
    #[error("There's no history to export yet!")]
    EmptyExport,

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Playback errors that escaped the player boundary
    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key-value storage errors.
///
/// The [`Storage`](crate::storage::Storage) adapter never hands these to its
/// callers; they are logged and the adapter falls back to memory.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open the backing database
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Could not resolve or create the data directory
    #[error("Data directory unavailable: {0}")]
    DataDir(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(#[from] rusqlite::Error),

    /// Stored value could not be encoded or decoded
    #[error("Stored value for '{key}' is not valid JSON: {source}")]
    Codec {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Audio playback errors.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// The runtime refused to start playback.
    #[error("Playback rejected: {0}")]
    PlaybackRejected(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
