use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::counter::{AchievementId, Milestone, StreakTransition};

/// Every state change in the system produces an Event.
/// The CLI prints them; a GUI would render them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TapRecorded {
        date: NaiveDate,
        today_count: u64,
        total_count: u64,
        streak: StreakTransition,
        at: DateTime<Utc>,
    },
    AchievementUnlocked {
        achievement: AchievementId,
        at: DateTime<Utc>,
    },
    MilestoneReached {
        milestone: Milestone,
        message: String,
        at: DateTime<Utc>,
    },
    MilestoneAcknowledged {
        at: DateTime<Utc>,
    },
    /// Today's count was re-derived from history for a new date.
    DayRolledOver {
        date: NaiveDate,
        today_count: u64,
        at: DateTime<Utc>,
    },
    CountersReset {
        at: DateTime<Utc>,
    },
    /// Local state was overwritten by the remote record at sign-in.
    StateHydrated {
        user_id: String,
        total_count: u64,
        at: DateTime<Utc>,
    },
    SignedIn {
        user_id: String,
        display_name: Option<String>,
        at: DateTime<Utc>,
    },
    SignedOut {
        at: DateTime<Utc>,
    },
    StatePushed {
        user_id: String,
        offline: bool,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::TapRecorded { at, .. }
            | Event::AchievementUnlocked { at, .. }
            | Event::MilestoneReached { at, .. }
            | Event::MilestoneAcknowledged { at }
            | Event::DayRolledOver { at, .. }
            | Event::CountersReset { at }
            | Event::StateHydrated { at, .. }
            | Event::SignedIn { at, .. }
            | Event::SignedOut { at }
            | Event::StatePushed { at, .. } => *at,
        }
    }
}
