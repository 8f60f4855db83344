use chrono::NaiveDate;
use clap::Subcommand;

use japa_core::counter::{self, CalendarDay, DayIntensity};

use crate::context::{self, CliResult};

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Count for one day (YYYY-MM-DD)
    Day {
        date: NaiveDate,
    },
    /// Every day of a month (YYYY-MM) with its intensity tier
    Month {
        month: String,
    },
    /// Totals, streak and best day
    Summary,
}

pub fn run(action: HistoryAction) -> CliResult {
    let ctl = context::open_controller()?;
    let history = &ctl.state().history;

    match action {
        HistoryAction::Day { date } => {
            let count = counter::count_on(history, date);
            context::print_json(&CalendarDay {
                date,
                count,
                intensity: DayIntensity::from_count(count),
            })
        }
        HistoryAction::Month { month } => {
            let (year, month) = parse_month(&month)?;
            context::print_json(&counter::month_view(history, year, month))
        }
        HistoryAction::Summary => context::print_json(&counter::summarize(ctl.state())),
    }
}

fn parse_month(raw: &str) -> Result<(i32, u32), String> {
    let invalid = || format!("invalid month: {raw} (expected YYYY-MM)");
    let (year, month) = raw.split_once('-').ok_or_else(invalid)?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    Ok((year, month))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_month_accepts_calendar_months() {
        assert_eq!(parse_month("2024-02").unwrap(), (2024, 2));
        assert!(parse_month("2024-13").is_err());
        assert!(parse_month("202402").is_err());
        assert!(parse_month("May-2024").is_err());
    }
}
