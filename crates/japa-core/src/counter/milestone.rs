use std::fmt;

use serde::{Deserialize, Serialize};

use super::state::AchievementId;

/// A milestone surfaced by a single tap.
///
/// At most one milestone is reported per tap; `Display` renders the message
/// shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Milestone {
    /// Today's count reached a multiple of 108.
    MalaCompleted { malas_today: u64 },
    /// First tap of a day that follows an active day.
    StreakExtended { days: u32 },
    /// First tap after a gap, or the first tap ever.
    StreakStarted,
    ThousandJapas,
    SevenDayStreak,
    ThirtyDayStreak,
}

impl Milestone {
    /// The achievement this milestone unlocks, if any.
    pub fn achievement(&self) -> Option<AchievementId> {
        match self {
            Milestone::MalaCompleted { .. } => Some(AchievementId::MalaCompleted),
            Milestone::ThousandJapas => Some(AchievementId::ThousandJapas),
            Milestone::SevenDayStreak => Some(AchievementId::SevenDayStreak),
            Milestone::ThirtyDayStreak => Some(AchievementId::ThirtyDayStreak),
            Milestone::StreakExtended { .. } | Milestone::StreakStarted => None,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Milestone::MalaCompleted { malas_today: 1 } => {
                write!(f, "Mala completed! 108 japas today")
            }
            Milestone::MalaCompleted { malas_today } => {
                write!(f, "Mala completed! {malas_today} malas today")
            }
            Milestone::StreakExtended { days } => write!(f, "{days} day streak"),
            Milestone::StreakStarted => write!(f, "New streak started"),
            Milestone::ThousandJapas => write!(f, "1000 japas completed!"),
            Milestone::SevenDayStreak => write!(f, "7 day streak achieved!"),
            Milestone::ThirtyDayStreak => write!(f, "30 day streak achieved!"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        assert_eq!(Milestone::StreakExtended { days: 4 }.to_string(), "4 day streak");
        assert_eq!(
            Milestone::MalaCompleted { malas_today: 3 }.to_string(),
            "Mala completed! 3 malas today"
        );
        assert!(Milestone::ThousandJapas.message().contains("1000"));
    }

    #[test]
    fn streak_messages_unlock_nothing() {
        assert_eq!(Milestone::StreakStarted.achievement(), None);
        assert_eq!(
            Milestone::SevenDayStreak.achievement(),
            Some(AchievementId::SevenDayStreak)
        );
    }
}
