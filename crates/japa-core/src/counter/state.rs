//! Session state and achievement identifiers.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::milestone::Milestone;

/// Per-day tap counts keyed by local calendar date.
pub type History = BTreeMap<NaiveDate, u64>;

/// One-way flags earned by crossing a milestone threshold.
///
/// The wire names match what is stored locally and in the remote
/// `achievements` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AchievementId {
    #[serde(rename = "MalaCompleted")]
    MalaCompleted,
    #[serde(rename = "1000Japas")]
    ThousandJapas,
    #[serde(rename = "7DayStreak")]
    SevenDayStreak,
    #[serde(rename = "30DayStreak")]
    ThirtyDayStreak,
}

impl AchievementId {
    pub const ALL: [AchievementId; 4] = [
        AchievementId::MalaCompleted,
        AchievementId::ThousandJapas,
        AchievementId::SevenDayStreak,
        AchievementId::ThirtyDayStreak,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementId::MalaCompleted => "MalaCompleted",
            AchievementId::ThousandJapas => "1000Japas",
            AchievementId::SevenDayStreak => "7DayStreak",
            AchievementId::ThirtyDayStreak => "30DayStreak",
        }
    }

    /// Parse a list of wire names, dropping any this build does not know.
    pub fn parse_lenient<'a, I>(names: I) -> BTreeSet<AchievementId>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .filter_map(|name| match name.parse() {
                Ok(id) => Some(id),
                Err(_) => {
                    tracing::debug!(achievement = name, "ignoring unknown achievement");
                    None
                }
            })
            .collect()
    }
}

impl fmt::Display for AchievementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown achievement: {0}")]
pub struct UnknownAchievement(pub String);

impl FromStr for AchievementId {
    type Err = UnknownAchievement;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AchievementId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| UnknownAchievement(s.to_string()))
    }
}

/// In-memory counter state for the running app instance.
///
/// Only the engine functions produce new values of this type; the
/// [`SessionController`](super::SessionController) is its single owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Taps recorded for the current local calendar day.
    pub today_count: u64,
    /// Lifetime tap count. Not bounded below by `today_count`.
    pub total_count: u64,
    /// Date → count. Never pruned.
    pub history: History,
    /// Consecutive-day streak.
    pub streak_days: u32,
    /// Date of the last streak-affecting tap.
    pub last_active_date: Option<NaiveDate>,
    pub achievements: BTreeSet<AchievementId>,
    /// Milestone waiting to be shown. Cleared on acknowledgement, never persisted.
    #[serde(skip)]
    pub pending_milestone: Option<Milestone>,
}

impl SessionState {
    pub fn has(&self, achievement: AchievementId) -> bool {
        self.achievements.contains(&achievement)
    }

    /// Count recorded for `date`, zero when absent.
    pub fn count_on(&self, date: NaiveDate) -> u64 {
        self.history.get(&date).copied().unwrap_or(0)
    }

    /// Number of full malas in today's count.
    pub fn malas_today(&self) -> u64 {
        self.today_count / super::MALA_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn achievement_wire_names() {
        assert_eq!(
            serde_json::to_string(&AchievementId::ThousandJapas).unwrap(),
            "\"1000Japas\""
        );
        assert_eq!("7DayStreak".parse::<AchievementId>().unwrap(), AchievementId::SevenDayStreak);
        assert!("Bogus".parse::<AchievementId>().is_err());
    }

    #[test]
    fn parse_lenient_drops_unknown_names() {
        let set = AchievementId::parse_lenient(["MalaCompleted", "Legacy", "30DayStreak"]);
        assert_eq!(set.len(), 2);
        assert!(set.contains(&AchievementId::ThirtyDayStreak));
    }

    #[test]
    fn history_serializes_with_iso_keys() {
        let mut state = SessionState::default();
        state
            .history
            .insert(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(), 12);
        let json = serde_json::to_value(&state.history).unwrap();
        assert_eq!(json["2024-03-09"], 12);
    }
}
