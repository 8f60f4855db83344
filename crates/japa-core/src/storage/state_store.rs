//! Key-granular persistence of session state and preferences.
//!
//! Each logical field is stored under its own key and read back on its own.
//! A missing key means "use the default"; a value that fails to parse is
//! logged and treated as missing. Writes are not transactional across keys:
//! a crash between two keys can leave them out of step, and nothing here
//! tries to repair that.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::kv::KeyValueStore;
use super::preferences::{BackgroundTheme, Language};
use crate::counter::{rollover_day, AchievementId, History, SessionState};
use crate::error::StorageError;

/// Storage keys, one per persisted field.
pub mod keys {
    pub const HISTORY: &str = "history";
    pub const TOTAL_COUNT: &str = "total_count";
    pub const STREAK_DAYS: &str = "streak_days";
    pub const LAST_ACTIVE_DATE: &str = "last_active_date";
    pub const ACHIEVEMENTS: &str = "achievements";
    pub const BACKGROUND_THEME: &str = "background_theme";
    pub const IMAGE_URI: &str = "image_uri";
    pub const LANGUAGE: &str = "language";
    pub const REMOTE_SESSION: &str = "remote_session";
}

/// A partial record: every field is independently optional.
///
/// On save, `None` leaves the key untouched. On load, `None` means the key
/// was absent or unreadable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub history: Option<History>,
    pub total_count: Option<u64>,
    pub streak_days: Option<u32>,
    /// `Some(None)` is stored as an empty string.
    pub last_active_date: Option<Option<NaiveDate>>,
    pub achievements: Option<BTreeSet<AchievementId>>,
    pub background_theme: Option<BackgroundTheme>,
    pub image_uri: Option<String>,
    pub language: Option<Language>,
}

impl PersistedRecord {
    /// The counter fields of `state`.
    pub fn from_state(state: &SessionState) -> Self {
        Self {
            history: Some(state.history.clone()),
            total_count: Some(state.total_count),
            streak_days: Some(state.streak_days),
            last_active_date: Some(state.last_active_date),
            achievements: Some(state.achievements.clone()),
            ..Default::default()
        }
    }

    /// Build the session state for `today`, using defaults for absent fields.
    pub fn to_session_state(&self, today: NaiveDate) -> SessionState {
        let state = SessionState {
            today_count: 0,
            total_count: self.total_count.unwrap_or(0),
            history: self.history.clone().unwrap_or_default(),
            streak_days: self.streak_days.unwrap_or(0),
            last_active_date: self.last_active_date.flatten(),
            achievements: self.achievements.clone().unwrap_or_default(),
            pending_milestone: None,
        };
        rollover_day(&state, today)
    }
}

/// Load/save seam for persisted state.
///
/// [`KvStateStore`] writes key by key; a transactional store can implement
/// the same trait without touching the engine.
pub trait StateStore {
    fn load(&self) -> PersistedRecord;

    fn save(&self, record: &PersistedRecord) -> Result<(), StorageError>;
}

/// [`StateStore`] over any [`KeyValueStore`].
pub struct KvStateStore<K> {
    kv: K,
}

impl<K: KeyValueStore> KvStateStore<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    /// Read and decode a JSON value, treating errors as absence.
    pub fn load_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.load_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring malformed stored value");
                None
            }
        }
    }

    pub fn save_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(value).map_err(|e| StorageError::Encode {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.kv.set(key, &encoded)
    }

    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.kv.remove(key)
    }

    fn load_raw(&self, key: &str) -> Option<String> {
        match self.kv.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to read stored value");
                None
            }
        }
    }

    fn load_parsed<T: std::str::FromStr>(&self, key: &str) -> Option<T>
    where
        T::Err: std::fmt::Display,
    {
        let raw = self.load_raw(key)?;
        match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring malformed stored value");
                None
            }
        }
    }

    fn load_last_active_date(&self) -> Option<Option<NaiveDate>> {
        let raw = self.load_raw(keys::LAST_ACTIVE_DATE)?;
        if raw.trim().is_empty() {
            return Some(None);
        }
        match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
            Ok(date) => Some(Some(date)),
            Err(e) => {
                tracing::warn!(key = keys::LAST_ACTIVE_DATE, error = %e, "ignoring malformed stored value");
                None
            }
        }
    }

    fn load_achievements(&self) -> Option<BTreeSet<AchievementId>> {
        let names: Vec<String> = self.load_json(keys::ACHIEVEMENTS)?;
        Some(AchievementId::parse_lenient(names.iter().map(String::as_str)))
    }
}

impl<K: KeyValueStore> StateStore for KvStateStore<K> {
    fn load(&self) -> PersistedRecord {
        PersistedRecord {
            history: self.load_json(keys::HISTORY),
            total_count: self.load_parsed(keys::TOTAL_COUNT),
            streak_days: self.load_parsed(keys::STREAK_DAYS),
            last_active_date: self.load_last_active_date(),
            achievements: self.load_achievements(),
            background_theme: self.load_json(keys::BACKGROUND_THEME),
            image_uri: self.load_raw(keys::IMAGE_URI),
            language: self.load_parsed(keys::LANGUAGE),
        }
    }

    fn save(&self, record: &PersistedRecord) -> Result<(), StorageError> {
        let mut writes: Vec<(&str, Result<(), StorageError>)> = Vec::new();

        if let Some(history) = &record.history {
            writes.push((keys::HISTORY, self.save_json(keys::HISTORY, history)));
        }
        if let Some(total) = record.total_count {
            writes.push((keys::TOTAL_COUNT, self.kv.set(keys::TOTAL_COUNT, &total.to_string())));
        }
        if let Some(streak) = record.streak_days {
            writes.push((keys::STREAK_DAYS, self.kv.set(keys::STREAK_DAYS, &streak.to_string())));
        }
        if let Some(last_active) = record.last_active_date {
            let value = last_active
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            writes.push((keys::LAST_ACTIVE_DATE, self.kv.set(keys::LAST_ACTIVE_DATE, &value)));
        }
        if let Some(achievements) = &record.achievements {
            let names: Vec<&str> = achievements.iter().map(AchievementId::as_str).collect();
            writes.push((keys::ACHIEVEMENTS, self.save_json(keys::ACHIEVEMENTS, &names)));
        }
        if let Some(theme) = &record.background_theme {
            writes.push((keys::BACKGROUND_THEME, self.save_json(keys::BACKGROUND_THEME, theme)));
        }
        if let Some(uri) = &record.image_uri {
            writes.push((keys::IMAGE_URI, self.kv.set(keys::IMAGE_URI, uri)));
        }
        if let Some(language) = record.language {
            writes.push((keys::LANGUAGE, self.kv.set(keys::LANGUAGE, language.as_str())));
        }

        let failed_keys: Vec<String> = writes
            .into_iter()
            .filter_map(|(key, result)| match result {
                Ok(()) => None,
                Err(e) => {
                    tracing::warn!(key, error = %e, "failed to persist value");
                    Some(key.to_string())
                }
            })
            .collect();

        if failed_keys.is_empty() {
            Ok(())
        } else {
            Err(StorageError::PartialWrite { failed_keys })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::kv::MemoryStore;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn full_record() -> PersistedRecord {
        let mut history = History::new();
        history.insert(date(1), 108);
        history.insert(date(2), 3);
        PersistedRecord {
            history: Some(history),
            total_count: Some(1111),
            streak_days: Some(2),
            last_active_date: Some(Some(date(2))),
            achievements: Some(
                [AchievementId::MalaCompleted, AchievementId::ThousandJapas]
                    .into_iter()
                    .collect(),
            ),
            background_theme: Some(BackgroundTheme(vec!["#B3E5FC".into(), "#E1F5FE".into()])),
            image_uri: Some("file:///tmp/radha.png".into()),
            language: Some(Language::English),
        }
    }

    #[test]
    fn save_then_load_roundtrips_every_key() {
        let store = KvStateStore::new(MemoryStore::new());
        let record = full_record();
        store.save(&record).unwrap();
        assert_eq!(store.load(), record);
    }

    #[test]
    fn empty_store_loads_nothing() {
        let store = KvStateStore::new(MemoryStore::new());
        assert_eq!(store.load(), PersistedRecord::default());
    }

    #[test]
    fn none_fields_leave_keys_untouched() {
        let store = KvStateStore::new(MemoryStore::new());
        store.save(&full_record()).unwrap();
        store
            .save(&PersistedRecord {
                total_count: Some(5),
                ..Default::default()
            })
            .unwrap();
        let loaded = store.load();
        assert_eq!(loaded.total_count, Some(5));
        assert_eq!(loaded.language, Some(Language::English));
        assert_eq!(loaded.history.unwrap().len(), 2);
    }

    #[test]
    fn cleared_last_active_date_roundtrips() {
        let store = KvStateStore::new(MemoryStore::new());
        store
            .save(&PersistedRecord {
                last_active_date: Some(None),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(store.load().last_active_date, Some(None));
    }

    #[test]
    fn malformed_values_fall_back_to_absent() {
        let kv = MemoryStore::new();
        kv.set(keys::HISTORY, "{not json").unwrap();
        kv.set(keys::TOTAL_COUNT, "lots").unwrap();
        kv.set(keys::LAST_ACTIVE_DATE, "yesterday").unwrap();
        kv.set(keys::LANGUAGE, "klingon").unwrap();
        kv.set(keys::ACHIEVEMENTS, r#"["MalaCompleted","Retired"]"#).unwrap();
        let store = KvStateStore::new(kv);

        let loaded = store.load();
        assert_eq!(loaded.history, None);
        assert_eq!(loaded.total_count, None);
        assert_eq!(loaded.last_active_date, None);
        assert_eq!(loaded.language, None);
        assert_eq!(
            loaded.achievements,
            Some([AchievementId::MalaCompleted].into_iter().collect())
        );
    }

    #[test]
    fn failed_key_does_not_stop_other_writes() {
        let kv = MemoryStore::new();
        kv.fail_writes_to(keys::HISTORY);
        let store = KvStateStore::new(kv);

        let err = store.save(&full_record()).unwrap_err();
        match err {
            StorageError::PartialWrite { failed_keys } => {
                assert_eq!(failed_keys, vec![keys::HISTORY.to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.load().total_count, Some(1111));
    }

    #[test]
    fn to_session_state_rolls_over_to_today() {
        let state = full_record().to_session_state(date(2));
        assert_eq!(state.today_count, 3);
        assert_eq!(state.total_count, 1111);
        let state = full_record().to_session_state(date(9));
        assert_eq!(state.today_count, 0);
    }

    #[test]
    fn from_state_covers_counter_fields_only() {
        let state = full_record().to_session_state(date(2));
        let record = PersistedRecord::from_state(&state);
        assert_eq!(record.total_count, Some(1111));
        assert_eq!(record.last_active_date, Some(Some(date(2))));
        assert!(record.language.is_none());
        assert!(record.image_uri.is_none());
    }
}
