//! Tap-event state transitions.
//!
//! Every function here is pure: it takes the current [`SessionState`] and
//! returns a new one. Persistence and sync happen elsewhere, after the
//! transition has been committed in memory.
//!
//! ## Streak transitions
//!
//! ```text
//! last_active == today      -> SameDay   (streak unchanged)
//! last_active == today - 1  -> Extended  (streak + 1)
//! otherwise                 -> Started   (streak = 1)
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::milestone::Milestone;
use super::state::{AchievementId, SessionState};

/// Number of japas in one mala.
pub const MALA_SIZE: u64 = 108;

/// Lifetime count that unlocks [`AchievementId::ThousandJapas`].
pub const THOUSAND_JAPAS: u64 = 1000;

/// What a tap did to the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreakTransition {
    /// Another tap on an already active day.
    SameDay,
    /// First tap of the day after an active yesterday.
    Extended { days: u32 },
    /// First tap ever, or first tap after a gap.
    Started,
}

impl StreakTransition {
    fn milestone(&self) -> Option<Milestone> {
        match *self {
            StreakTransition::SameDay => None,
            StreakTransition::Extended { days } => Some(Milestone::StreakExtended { days }),
            StreakTransition::Started => Some(Milestone::StreakStarted),
        }
    }
}

/// Result of [`record_tap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapOutcome {
    pub state: SessionState,
    /// The single milestone surfaced by this tap.
    pub milestone: Option<Milestone>,
    pub streak: StreakTransition,
    /// Achievements that were absent before this tap.
    pub unlocked: Vec<AchievementId>,
}

/// Compute the streak transition for a tap on `today`.
///
/// A `last_active` date after `today` (device clock moved backwards) counts
/// as a gap.
pub fn streak_transition(
    last_active: Option<NaiveDate>,
    streak_days: u32,
    today: NaiveDate,
) -> StreakTransition {
    match last_active {
        Some(last) if last == today => StreakTransition::SameDay,
        Some(last) if today.pred_opt() == Some(last) => StreakTransition::Extended {
            days: streak_days.saturating_add(1),
        },
        _ => StreakTransition::Started,
    }
}

/// Apply one tap on `today` to `state`.
pub fn record_tap(state: &SessionState, today: NaiveDate) -> TapOutcome {
    let mut next = state.clone();

    next.today_count = state.today_count.saturating_add(1);
    next.total_count = state.total_count.saturating_add(1);
    next.history.insert(today, next.today_count);

    let streak = streak_transition(state.last_active_date, state.streak_days, today);
    match streak {
        StreakTransition::SameDay => {}
        StreakTransition::Extended { days } => {
            next.streak_days = days;
            next.last_active_date = Some(today);
        }
        StreakTransition::Started => {
            next.streak_days = 1;
            next.last_active_date = Some(today);
        }
    }

    let mut unlocked = Vec::new();
    let mut unlock = |next: &mut SessionState, id: AchievementId| {
        if next.achievements.insert(id) {
            unlocked.push(id);
        }
    };

    // Later checks override earlier ones; only one message surfaces.
    let mut milestone = if next.today_count % MALA_SIZE == 0 {
        unlock(&mut next, AchievementId::MalaCompleted);
        Some(Milestone::MalaCompleted {
            malas_today: next.today_count / MALA_SIZE,
        })
    } else {
        streak.milestone()
    };

    if next.total_count >= THOUSAND_JAPAS && !next.has(AchievementId::ThousandJapas) {
        unlock(&mut next, AchievementId::ThousandJapas);
        milestone = Some(Milestone::ThousandJapas);
    }
    if next.streak_days == 7 && !next.has(AchievementId::SevenDayStreak) {
        unlock(&mut next, AchievementId::SevenDayStreak);
        milestone = Some(Milestone::SevenDayStreak);
    }
    if next.streak_days == 30 && !next.has(AchievementId::ThirtyDayStreak) {
        unlock(&mut next, AchievementId::ThirtyDayStreak);
        milestone = Some(Milestone::ThirtyDayStreak);
    }

    next.pending_milestone = milestone.or(state.pending_milestone);

    TapOutcome {
        state: next,
        milestone,
        streak,
        unlocked,
    }
}

/// Clear every counter, the history and the achievements.
pub fn reset_all(_state: &SessionState) -> SessionState {
    SessionState::default()
}

/// Re-derive today's count from history after start-up or a date change.
pub fn rollover_day(state: &SessionState, today: NaiveDate) -> SessionState {
    SessionState {
        today_count: state.count_on(today),
        ..state.clone()
    }
}

/// Drop the pending milestone once it has been shown.
pub fn acknowledge_milestone(state: &SessionState) -> SessionState {
    SessionState {
        pending_milestone: None,
        ..state.clone()
    }
}
