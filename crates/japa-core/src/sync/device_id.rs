//! Stable per-install identifier written to `lastDevice` on every push.
//!
//! Stored as a single line, `japa-<uuid>`, next to the database.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use uuid::Uuid;

const FILE_NAME: &str = "device_id.txt";
const PREFIX: &str = "japa-";

#[derive(Debug, thiserror::Error)]
pub enum DeviceIdError {
    #[error("device id storage: {0}")]
    Io(#[from] std::io::Error),

    #[error("no data directory: {0}")]
    NoDataDir(String),

    #[error("stored device id is not ours: {0:?}")]
    Foreign(String),
}

fn parse(raw: &str) -> Result<String, DeviceIdError> {
    let id = raw.trim();
    match id.strip_prefix(PREFIX) {
        Some(rest) if Uuid::parse_str(rest).is_ok() => Ok(id.to_owned()),
        _ => Err(DeviceIdError::Foreign(id.to_owned())),
    }
}

/// Read the id stored under `dir`, minting and saving one on first use.
pub fn get_or_create_device_id_at(dir: &Path) -> Result<String, DeviceIdError> {
    let path = dir.join(FILE_NAME);
    match fs::read_to_string(&path) {
        Ok(raw) => parse(&raw),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let id = format!("{PREFIX}{}", Uuid::new_v4().hyphenated());
            fs::create_dir_all(dir)?;
            fs::write(&path, format!("{id}\n"))?;
            tracing::debug!(device_id = %id, "minted device id");
            Ok(id)
        }
        Err(e) => Err(e.into()),
    }
}

/// [`get_or_create_device_id_at`] in the app data directory.
pub fn get_or_create_device_id() -> Result<String, DeviceIdError> {
    let dir = crate::storage::data_dir().map_err(|e| DeviceIdError::NoDataDir(e.to_string()))?;
    get_or_create_device_id_at(&dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn minted_id_is_prefixed_uuid() {
        let dir = TempDir::new().unwrap();
        let id = get_or_create_device_id_at(dir.path()).unwrap();
        assert!(Uuid::parse_str(id.strip_prefix(PREFIX).unwrap()).is_ok());
    }

    #[test]
    fn id_is_stable_across_calls() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b");
        let first = get_or_create_device_id_at(&nested).unwrap();
        assert_eq!(get_or_create_device_id_at(&nested).unwrap(), first);
    }

    #[test]
    fn foreign_ids_are_rejected() {
        let dir = TempDir::new().unwrap();
        for stored in ["device-1234\n", "japa-not-a-uuid\n"] {
            fs::write(dir.path().join(FILE_NAME), stored).unwrap();
            assert!(matches!(
                get_or_create_device_id_at(dir.path()),
                Err(DeviceIdError::Foreign(_))
            ));
        }
    }
}
