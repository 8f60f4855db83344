//! Calendar queries over the daily history.
//!
//! The intensity tiers are the thresholds the calendar screen uses to mark
//! days; how a tier is drawn is up to the presentation layer.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::state::{History, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayIntensity {
    None,
    Light,
    Moderate,
    High,
}

impl DayIntensity {
    pub fn from_count(count: u64) -> Self {
        match count {
            0 => DayIntensity::None,
            1..=20 => DayIntensity::Light,
            21..=50 => DayIntensity::Moderate,
            _ => DayIntensity::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub count: u64,
    pub intensity: DayIntensity,
}

/// Aggregate numbers for the "your sadhana" panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SadhanaSummary {
    pub today_count: u64,
    pub total_count: u64,
    pub streak_days: u32,
    pub active_days: usize,
    pub best_day: Option<CalendarDay>,
    pub malas_today: u64,
}

pub fn count_on(history: &History, date: NaiveDate) -> u64 {
    history.get(&date).copied().unwrap_or(0)
}

/// Every day of `year`-`month`, including days without taps.
///
/// Returns an empty list for an invalid month.
pub fn month_view(history: &History, year: i32, month: u32) -> Vec<CalendarDay> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    first
        .iter_days()
        .take_while(|d| d.month() == month)
        .map(|date| {
            let count = count_on(history, date);
            CalendarDay {
                date,
                count,
                intensity: DayIntensity::from_count(count),
            }
        })
        .collect()
}

pub fn summarize(state: &SessionState) -> SadhanaSummary {
    let best_day = state
        .history
        .iter()
        .filter(|(_, count)| **count > 0)
        // Earliest date wins a tie.
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
        .map(|(date, count)| CalendarDay {
            date: *date,
            count: *count,
            intensity: DayIntensity::from_count(*count),
        });

    SadhanaSummary {
        today_count: state.today_count,
        total_count: state.total_count,
        streak_days: state.streak_days,
        active_days: state.history.values().filter(|c| **c > 0).count(),
        best_day,
        malas_today: state.malas_today(),
    }
}
