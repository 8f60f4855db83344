//! Single owner of the session state.
//!
//! All mutation goes through the engine functions; after each transition the
//! changed fields are handed to the [`StateStore`]. Store failures are logged
//! and swallowed: the in-memory state stays correct for the session.

use chrono::{NaiveDate, Utc};

use super::engine::{self, TapOutcome};
use super::state::SessionState;
use crate::events::Event;
use crate::storage::{PersistedRecord, StateStore};
use crate::sync::{known_achievements, RemoteUserRecord};

pub struct SessionController<S> {
    state: SessionState,
    store: S,
    /// The date `state.today_count` refers to.
    current_day: NaiveDate,
}

impl<S: StateStore> SessionController<S> {
    /// Load persisted state and roll it over to `today`.
    pub fn load(store: S, today: NaiveDate) -> Self {
        let state = store.load().to_session_state(today);
        tracing::debug!(
            %today,
            today_count = state.today_count,
            total_count = state.total_count,
            "session loaded"
        );
        Self {
            state,
            store,
            current_day: today,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn current_day(&self) -> NaiveDate {
        self.current_day
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Record one tap on `today`, rolling the day over first if the date
    /// changed since the last operation.
    pub fn tap(&mut self, today: NaiveDate) -> Vec<Event> {
        self.tap_many(1, today)
    }

    /// Record `count` taps, each through the engine, then persist once.
    pub fn tap_many(&mut self, count: u64, today: NaiveDate) -> Vec<Event> {
        let mut events: Vec<Event> = self.rollover(today).into_iter().collect();
        if count == 0 {
            return events;
        }

        let mut state = self.state.clone();
        let mut last: Option<TapOutcome> = None;
        for _ in 0..count {
            let outcome = engine::record_tap(&state, today);
            let at = Utc::now();
            events.extend(outcome.unlocked.iter().map(|achievement| Event::AchievementUnlocked {
                achievement: *achievement,
                at,
            }));
            if let Some(milestone) = outcome.milestone {
                events.push(Event::MilestoneReached {
                    milestone,
                    message: milestone.message(),
                    at,
                });
            }
            state = outcome.state.clone();
            last = Some(outcome);
        }

        if let Some(outcome) = last {
            events.push(Event::TapRecorded {
                date: today,
                today_count: outcome.state.today_count,
                total_count: outcome.state.total_count,
                streak: outcome.streak,
                at: Utc::now(),
            });
        }
        self.commit(state);
        events
    }

    /// Re-derive today's count when the date has changed.
    pub fn rollover(&mut self, today: NaiveDate) -> Option<Event> {
        if today == self.current_day && self.state.today_count == self.state.count_on(today) {
            return None;
        }
        self.state = engine::rollover_day(&self.state, today);
        self.current_day = today;
        tracing::info!(%today, today_count = self.state.today_count, "day rolled over");
        Some(Event::DayRolledOver {
            date: today,
            today_count: self.state.today_count,
            at: Utc::now(),
        })
    }

    /// Clear all counters, history and achievements. Preferences are kept.
    pub fn reset_all(&mut self) -> Vec<Event> {
        let next = engine::reset_all(&self.state);
        self.commit(next);
        tracing::info!("counters reset");
        vec![Event::CountersReset { at: Utc::now() }]
    }

    pub fn acknowledge(&mut self) -> Option<Event> {
        self.state.pending_milestone?;
        self.state = engine::acknowledge_milestone(&self.state);
        Some(Event::MilestoneAcknowledged { at: Utc::now() })
    }

    /// Overwrite local counters with the remote record after sign-in.
    ///
    /// Totals, streak and last-active date come from the remote record.
    /// The remote `todayJapa` only counts for `today` if the record was last
    /// active today. Local history for other days is kept, and achievements
    /// are merged so none is ever lost.
    pub fn hydrate_from_remote(&mut self, record: &RemoteUserRecord, today: NaiveDate) -> Vec<Event> {
        let mut next = self.state.clone();
        next.total_count = record.total_japa;
        next.streak_days = record.streak;
        next.last_active_date = record.last_active;
        next.achievements.extend(known_achievements(record));
        if record.last_active == Some(today) {
            next.history.insert(today, record.today_japa);
        }
        next = engine::rollover_day(&next, today);

        self.current_day = today;
        self.commit(next);
        tracing::info!(user_id = %record.user_id, total = record.total_japa, "state hydrated from remote");
        vec![Event::StateHydrated {
            user_id: record.user_id.clone(),
            total_count: record.total_japa,
            at: Utc::now(),
        }]
    }

    fn commit(&mut self, next: SessionState) {
        self.state = next;
        if let Err(e) = self.store.save(&PersistedRecord::from_state(&self.state)) {
            tracing::warn!(error = %e, "failed to persist session state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::{AchievementId, Milestone};
    use crate::storage::{keys, KvStateStore, MemoryStore};
    use chrono::Duration;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap() + Duration::days(offset)
    }

    fn controller() -> SessionController<KvStateStore<MemoryStore>> {
        SessionController::load(KvStateStore::new(MemoryStore::new()), day(0))
    }

    fn remote(total: u64, today: u64, last_active: Option<NaiveDate>) -> RemoteUserRecord {
        RemoteUserRecord {
            user_id: "uid".into(),
            display_name: "Radhika".into(),
            today_japa: today,
            total_japa: total,
            achievements: vec!["7DayStreak".into(), "Unknown".into()],
            streak: 9,
            last_active,
            created_at: None,
            last_updated: None,
            last_device: None,
        }
    }

    #[test]
    fn tap_persists_and_reloads() {
        let mut ctl = controller();
        for _ in 0..3 {
            ctl.tap(day(0));
        }
        let reloaded = SessionController::load(ctl.store, day(0));
        assert_eq!(reloaded.state().today_count, 3);
        assert_eq!(reloaded.state().total_count, 3);
        assert_eq!(reloaded.state().streak_days, 1);
    }

    #[test]
    fn tap_many_reports_milestones_in_order() {
        let mut ctl = controller();
        let events = ctl.tap_many(108, day(0));
        let milestones: Vec<Milestone> = events
            .iter()
            .filter_map(|e| match e {
                Event::MilestoneReached { milestone, .. } => Some(*milestone),
                _ => None,
            })
            .collect();
        assert_eq!(
            milestones,
            vec![Milestone::StreakStarted, Milestone::MalaCompleted { malas_today: 1 }]
        );
        assert!(matches!(events.last(), Some(Event::TapRecorded { today_count: 108, .. })));
        assert_eq!(ctl.state().pending_milestone, Some(Milestone::MalaCompleted { malas_today: 1 }));
    }

    #[test]
    fn tap_on_new_day_rolls_over_first() {
        let mut ctl = controller();
        ctl.tap_many(10, day(0));
        let events = ctl.tap(day(1));
        assert!(matches!(events[0], Event::DayRolledOver { today_count: 0, .. }));
        assert_eq!(ctl.state().today_count, 1);
        assert_eq!(ctl.state().history[&day(0)], 10);
        assert_eq!(ctl.state().history[&day(1)], 1);
        assert_eq!(ctl.state().streak_days, 2);
        assert_eq!(ctl.current_day(), day(1));
    }

    #[test]
    fn storage_failure_keeps_memory_state() {
        let kv = MemoryStore::new();
        kv.fail_writes_to(keys::TOTAL_COUNT);
        let mut ctl = SessionController::load(KvStateStore::new(kv), day(0));
        ctl.tap(day(0));
        assert_eq!(ctl.state().total_count, 1);
        assert_eq!(ctl.store().load().history.unwrap()[&day(0)], 1);
    }

    #[test]
    fn reset_clears_counters_in_store() {
        let mut ctl = controller();
        ctl.tap_many(120, day(0));
        ctl.reset_all();
        assert_eq!(ctl.state(), &SessionState::default());
        let record = ctl.store().load();
        assert_eq!(record.total_count, Some(0));
        assert_eq!(record.history, Some(Default::default()));
        assert_eq!(record.last_active_date, Some(None));
    }

    #[test]
    fn acknowledge_only_when_pending() {
        let mut ctl = controller();
        assert!(ctl.acknowledge().is_none());
        ctl.tap(day(0));
        assert!(ctl.acknowledge().is_some());
        assert!(ctl.state().pending_milestone.is_none());
    }

    #[test]
    fn hydrate_overwrites_counters_for_today() {
        let mut ctl = controller();
        ctl.tap_many(4, day(0));
        ctl.hydrate_from_remote(&remote(5000, 40, Some(day(0))), day(0));
        let state = ctl.state();
        assert_eq!(state.total_count, 5000);
        assert_eq!(state.today_count, 40);
        assert_eq!(state.history[&day(0)], 40);
        assert_eq!(state.streak_days, 9);
        assert!(state.has(AchievementId::SevenDayStreak));
        assert_eq!(state.achievements.len(), 1);
    }

    #[test]
    fn hydrate_ignores_stale_today_count() {
        let mut ctl = controller();
        ctl.hydrate_from_remote(&remote(300, 77, Some(day(-3))), day(0));
        assert_eq!(ctl.state().today_count, 0);
        assert!(!ctl.state().history.contains_key(&day(-3)));
        assert_eq!(ctl.state().total_count, 300);
    }

    #[test]
    fn hydrate_keeps_local_achievements() {
        let mut ctl = controller();
        ctl.tap_many(108, day(0));
        ctl.hydrate_from_remote(&remote(108, 108, Some(day(0))), day(0));
        assert!(ctl.state().has(AchievementId::MalaCompleted));
        assert!(ctl.state().has(AchievementId::SevenDayStreak));
    }
}
