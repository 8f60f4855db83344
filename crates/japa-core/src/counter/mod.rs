mod calendar;
mod controller;
mod engine;
mod milestone;
mod state;

#[cfg(test)]
mod engine_tests;

pub use calendar::{count_on, month_view, summarize, CalendarDay, DayIntensity, SadhanaSummary};
pub use controller::SessionController;
pub use engine::{
    acknowledge_milestone, record_tap, reset_all, rollover_day, streak_transition,
    StreakTransition, TapOutcome, MALA_SIZE, THOUSAND_JAPAS,
};
pub use milestone::Milestone;
pub use state::{AchievementId, History, SessionState, UnknownAchievement};
