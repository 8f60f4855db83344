//! Core types for remote sync.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::counter::{AchievementId, SessionState};
use crate::error::ConfigError;

/// One user's document in the shared store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUserRecord {
    pub user_id: String,
    pub display_name: String,
    pub today_japa: u64,
    pub total_japa: u64,
    pub achievements: Vec<String>,
    pub streak: u32,
    pub last_active: Option<NaiveDate>,
    pub created_at: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    /// Device that wrote the record last.
    pub last_device: Option<String>,
}

/// The fields written on every push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatePush {
    pub today_japa: u64,
    pub total_japa: u64,
    pub achievements: Vec<String>,
    pub streak: u32,
    /// Date of the push.
    pub last_active: NaiveDate,
    pub display_name: Option<String>,
    pub device_id: Option<String>,
}

impl StatePush {
    pub fn from_state(state: &SessionState, today: NaiveDate) -> Self {
        Self {
            today_japa: state.today_count,
            total_japa: state.total_count,
            achievements: state
                .achievements
                .iter()
                .map(|a| a.as_str().to_string())
                .collect(),
            streak: state.streak_days,
            last_active: today,
            display_name: None,
            device_id: None,
        }
    }

    pub fn with_display_name(mut self, name: Option<String>) -> Self {
        self.display_name = name;
        self
    }

    pub fn with_device_id(mut self, device_id: Option<String>) -> Self {
        self.device_id = device_id;
        self
    }
}

/// Result of a push. Offline is a soft success: local state stays the
/// source of truth and the next push carries the cumulative counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushOutcome {
    Synced,
    Offline,
}

/// Ordered community standings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardSnapshot {
    /// Descending by `total_japa`.
    pub users: Vec<RemoteUserRecord>,
    pub today_total: u64,
    pub all_time_total: u64,
    pub fetched_at: DateTime<Utc>,
}

impl LeaderboardSnapshot {
    pub fn from_users(mut users: Vec<RemoteUserRecord>, fetched_at: DateTime<Utc>) -> Self {
        users.sort_by(|a, b| b.total_japa.cmp(&a.total_japa));
        let today_total = users.iter().map(|u| u.today_japa).sum();
        let all_time_total = users.iter().map(|u| u.total_japa).sum();
        Self {
            users,
            today_total,
            all_time_total,
            fetched_at,
        }
    }

    /// Equal apart from the fetch time.
    pub fn same_standings(&self, other: &LeaderboardSnapshot) -> bool {
        self.users == other.users
            && self.today_total == other.today_total
            && self.all_time_total == other.all_time_total
    }

    /// 1-based rank of `user_id`.
    pub fn rank_of(&self, user_id: &str) -> Option<usize> {
        self.users
            .iter()
            .position(|u| u.user_id == user_id)
            .map(|i| i + 1)
    }
}

/// How the user signs in.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    EmailPassword { email: String, password: String },
    /// A fresh anonymous account, shown on the leaderboard as `display_name`.
    Anonymous { display_name: String },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::EmailPassword { email, .. } => f
                .debug_struct("EmailPassword")
                .field("email", email)
                .field("password", &"<redacted>")
                .finish(),
            Credentials::Anonymous { display_name } => f
                .debug_struct("Anonymous")
                .field("display_name", display_name)
                .finish(),
        }
    }
}

/// An authenticated user. `user_id` keys the remote document.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl UserIdentity {
    /// True when the ID token expires within the next minute.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(60) >= self.expires_at
    }

    /// Name shown on the leaderboard.
    pub fn leaderboard_name(&self) -> String {
        self.display_name
            .clone()
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| self.user_id.clone())
    }
}

impl fmt::Debug for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserIdentity")
            .field("user_id", &self.user_id)
            .field("display_name", &self.display_name)
            .field("email", &self.email)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Sync error types.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Backend unreachable: {0}")]
    Offline(String),

    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("Malformed document: {0}")]
    Decode(String),

    #[error("Request could not be built: {0}")]
    Request(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Sync is not configured: {0}")]
    Config(#[from] ConfigError),
}

impl SyncError {
    pub fn is_offline(&self) -> bool {
        matches!(self, SyncError::Offline(_))
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SyncError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            SyncError::Backend {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_connect() || err.is_timeout() || err.is_request() {
            SyncError::Offline(err.to_string())
        } else {
            // Builder, redirect and body errors are not connectivity problems.
            SyncError::Request(err.to_string())
        }
    }
}

/// Achievement names from a remote record that this build understands.
pub fn known_achievements(record: &RemoteUserRecord) -> std::collections::BTreeSet<AchievementId> {
    AchievementId::parse_lenient(record.achievements.iter().map(String::as_str))
}
