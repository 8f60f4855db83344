//! Local persistence: SQLite key-value store, per-key state store,
//! preferences and TOML configuration.

mod config;
pub mod database;
pub mod kv;
pub mod migrations;
pub mod preferences;
pub mod state_store;

pub use config::{Config, DefaultsConfig, SyncConfig};
pub use database::Database;
pub use kv::{KeyValueStore, MemoryStore};
pub use preferences::{BackgroundTheme, Language, Preferences};
pub use state_store::{keys, KvStateStore, PersistedRecord, StateStore};

use std::path::PathBuf;

use crate::error::StorageError;

/// Returns `~/.config/japa[-dev]/` based on JAPA_ENV.
///
/// Set JAPA_ENV=dev to use the development data directory. JAPA_HOME
/// replaces `~/.config` as the base directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let base_dir = match std::env::var_os("JAPA_HOME") {
        Some(home) => PathBuf::from(home),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config"),
    };

    let env = std::env::var("JAPA_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("japa-dev")
    } else {
        base_dir.join("japa")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StorageError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
