//! Core error types for questline-core.
//!
//! Each concern has its own thiserror enum; [`CoreError`] aggregates them
//! for callers that only want one error type. Remote failures never reach
//! the UI through these types: the sync layer absorbs them and serves
//! cached data instead.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for questline-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Local storage errors
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Remote gateway errors
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Local key/value storage errors.
///
/// These are logged and swallowed by [`crate::LocalStore`]; they only
/// surface from the fallible constructors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the backing database
    #[error("Failed to open local store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(#[from] rusqlite::Error),

    /// Payload could not be (de)serialized
    #[error("Corrupt payload for key '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Connection mutex was poisoned by a panicking writer
    #[error("Local store lock poisoned")]
    Poisoned,
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
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Remote gateway errors.
///
/// The coordinator treats every variant the same way (retry, then fall
/// back to the cache); the split exists for logs and for the gateway
/// implementations themselves.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network, timeout or rate-limit failure reported by a gateway
    #[error("Transient remote error: {0}")]
    Transient(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Remote answered with a non-success status
    #[error("Remote returned HTTP {status} for {endpoint}")]
    Status { status: u16, endpoint: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote credentials are missing; no network I/O was attempted
    #[error("Remote gateway is not configured")]
    NotConfigured,

    #[error("Invalid remote URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Custom(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_error_wraps_sync_error() {
        let err: CoreError = SyncError::NotConfigured.into();
        assert_eq!(err.to_string(), "Sync error: Remote gateway is not configured");
    }
}
