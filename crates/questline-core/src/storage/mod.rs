mod config;
pub mod keys;
pub mod local_store;

pub use config::{Config, RemoteConfig, StorageConfig, SyncSettings};
pub use keys::StorageKey;
pub use local_store::{LocalStore, StoreTxn};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/questline[-dev]/` based on QUESTLINE_ENV.
///
/// Set QUESTLINE_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("QUESTLINE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("questline-dev")
    } else {
        base_dir.join("questline")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(e.to_string()))?;
    Ok(dir)
}
