//! TOML-based application configuration.
//!
//! Stores:
//! - Remote sync settings (Firebase project, API key, endpoints)
//! - Defaults for preferences that have not been chosen yet
//!
//! Configuration is stored at `~/.config/japa/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::data_dir;
use super::preferences::{BackgroundTheme, Language, DEFAULT_IMAGE_URI};
use crate::error::ConfigError;

/// Remote sync configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Firebase project id.
    #[serde(default)]
    pub project_id: String,
    /// Firebase web API key.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_firestore_url")]
    pub firestore_url: String,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_poll_secs")]
    pub leaderboard_poll_secs: u64,
    /// Requests slower than this are treated as offline.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Defaults for preferences the user has not set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub language: Language,
    #[serde(default = "default_image_uri")]
    pub image_uri: String,
    #[serde(default)]
    pub background_theme: BackgroundTheme,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/japa/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

fn default_collection() -> String {
    "users".into()
}
fn default_firestore_url() -> String {
    "https://firestore.googleapis.com".into()
}
fn default_auth_url() -> String {
    "https://identitytoolkit.googleapis.com".into()
}
fn default_token_url() -> String {
    "https://securetoken.googleapis.com".into()
}
fn default_poll_secs() -> u64 {
    10
}
fn default_timeout_secs() -> u64 {
    15
}
fn default_image_uri() -> String {
    DEFAULT_IMAGE_URI.into()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            project_id: String::new(),
            api_key: String::new(),
            collection: default_collection(),
            firestore_url: default_firestore_url(),
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            leaderboard_poll_secs: default_poll_secs(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

impl SyncConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.leaderboard_poll_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Check that sync is enabled and has what it needs to talk to the backend.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Err(ConfigError::InvalidValue {
                key: "sync.enabled".into(),
                message: "remote sync is disabled".into(),
            });
        }
        if self.project_id.trim().is_empty() {
            return Err(ConfigError::MissingKey("sync.project_id".into()));
        }
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingKey("sync.api_key".into()));
        }
        Ok(())
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            language: Language::default(),
            image_uri: default_image_uri(),
            background_theme: BackgroundTheme::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key in memory. Returns error if key is unknown
    /// or the value does not fit the field.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default configuration");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.sync.collection, "users");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [sync]
            enabled = true
            project_id = "radha-counter"
            "#,
        )
        .unwrap();
        assert!(parsed.sync.enabled);
        assert_eq!(parsed.sync.leaderboard_poll_secs, 10);
        assert_eq!(parsed.defaults.language, Language::Hindi);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("sync.enabled").as_deref(), Some("false"));
        assert_eq!(cfg.get("defaults.language").as_deref(), Some("hindi"));
        assert!(cfg.get("sync.missing_key").is_none());
    }

    #[test]
    fn set_updates_typed_values() {
        let mut cfg = Config::default();
        cfg.set("sync.enabled", "true").unwrap();
        cfg.set("sync.leaderboard_poll_secs", "30").unwrap();
        cfg.set("defaults.language", "english").unwrap();
        assert!(cfg.sync.enabled);
        assert_eq!(cfg.sync.leaderboard_poll_secs, 30);
        assert_eq!(cfg.defaults.language, Language::English);
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_values() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("sync.nonexistent", "x"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.set("sync.enabled", "maybe"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            cfg.set("defaults.language", "latin"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn validate_requires_project_and_key() {
        let mut sync = SyncConfig::default();
        assert!(sync.validate().is_err());
        sync.enabled = true;
        assert!(matches!(sync.validate(), Err(ConfigError::MissingKey(_))));
        sync.project_id = "p".into();
        sync.api_key = "k".into();
        assert!(sync.validate().is_ok());
    }

    #[test]
    fn load_from_missing_file_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        let mut changed = cfg.clone();
        changed.set("sync.project_id", "radha-counter").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().sync.project_id, "radha-counter");
    }
}
