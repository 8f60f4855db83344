//! Tap, status, acknowledge and reset.

use chrono::NaiveDate;
use serde::Serialize;

use japa_core::counter::{AchievementId, SessionState};
use japa_core::events::Event;

use crate::context::{self, CliResult};

#[derive(Serialize)]
struct StatusView<'a> {
    date: NaiveDate,
    today_count: u64,
    total_count: u64,
    malas_today: u64,
    streak_days: u32,
    last_active_date: Option<NaiveDate>,
    achievements: Vec<&'static str>,
    pending_message: Option<String>,
    signed_in_as: Option<&'a str>,
}

impl<'a> StatusView<'a> {
    fn new(state: &SessionState, date: NaiveDate, signed_in_as: Option<&'a str>) -> Self {
        Self {
            date,
            today_count: state.today_count,
            total_count: state.total_count,
            malas_today: state.malas_today(),
            streak_days: state.streak_days,
            last_active_date: state.last_active_date,
            achievements: state.achievements.iter().map(AchievementId::as_str).collect(),
            pending_message: state.pending_milestone.map(|m| m.message()),
            signed_in_as,
        }
    }
}

#[derive(Serialize)]
struct TapView<'a> {
    status: StatusView<'a>,
    events: &'a [Event],
}

pub async fn tap(count: u64) -> CliResult {
    if count == 0 {
        return Err("count must be at least 1".into());
    }
    let mut ctl = context::open_controller()?;
    let today = context::today();
    let events = ctl.tap_many(count, today);

    // Start the push before printing; the tap itself never waits on it.
    let push = context::spawn_push(&ctl).await;

    context::print_json(&TapView {
        status: StatusView::new(ctl.state(), today, None),
        events: &events,
    })?;

    if let Some(handle) = push {
        match handle.await {
            Ok(Ok(outcome)) => tracing::debug!(?outcome, "push finished"),
            Ok(Err(_)) => {}
            Err(e) => tracing::warn!(error = %e, "push task failed"),
        }
    }
    Ok(())
}

pub fn status() -> CliResult {
    let ctl = context::open_controller()?;
    let identity = context::load_identity(ctl.store());
    let name = identity.as_ref().map(|i| i.user_id.as_str());
    context::print_json(&StatusView::new(ctl.state(), ctl.current_day(), name))
}

/// The pending milestone only lives for the process, so after a restart
/// there is normally nothing to acknowledge.
pub fn ack() -> CliResult {
    let mut ctl = context::open_controller()?;
    let event = ctl.acknowledge();
    context::print_json(&event)
}

pub fn reset(confirmed: bool) -> CliResult {
    if !confirmed {
        return Err("reset clears all counters, history and achievements; pass --yes to confirm".into());
    }
    let mut ctl = context::open_controller()?;
    let events = ctl.reset_all();
    context::print_json(&events)
}
