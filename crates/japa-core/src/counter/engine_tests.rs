//! Tests for the counter engine.

#[cfg(test)]
mod tests {
    use super::super::engine::*;
    use super::super::milestone::Milestone;
    use super::super::state::{AchievementId, SessionState};
    use chrono::{Duration, NaiveDate};

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap() + Duration::days(offset)
    }

    fn tap_n(state: &SessionState, n: u64, today: NaiveDate) -> (SessionState, Vec<Option<Milestone>>) {
        let mut current = state.clone();
        let mut milestones = Vec::new();
        for _ in 0..n {
            let outcome = record_tap(&current, today);
            milestones.push(outcome.milestone);
            current = outcome.state;
        }
        (current, milestones)
    }

    #[test]
    fn first_tap_starts_streak() {
        let outcome = record_tap(&SessionState::default(), day(0));
        assert_eq!(outcome.state.today_count, 1);
        assert_eq!(outcome.state.total_count, 1);
        assert_eq!(outcome.state.history.get(&day(0)), Some(&1));
        assert_eq!(outcome.state.streak_days, 1);
        assert_eq!(outcome.state.last_active_date, Some(day(0)));
        assert_eq!(outcome.streak, StreakTransition::Started);
        assert_eq!(outcome.milestone, Some(Milestone::StreakStarted));
        assert_eq!(outcome.state.pending_milestone, Some(Milestone::StreakStarted));
    }

    #[test]
    fn same_day_taps_track_history() {
        let (state, milestones) = tap_n(&SessionState::default(), 25, day(0));
        assert_eq!(state.today_count, 25);
        assert_eq!(state.history[&day(0)], 25);
        assert_eq!(state.streak_days, 1);
        assert!(milestones[1..].iter().all(Option::is_none));
    }

    #[test]
    fn mala_surfaces_only_on_the_108th_tap() {
        let (state, milestones) = tap_n(&SessionState::default(), 108, day(0));
        assert_eq!(
            milestones[107],
            Some(Milestone::MalaCompleted { malas_today: 1 })
        );
        let mala_count = milestones
            .iter()
            .filter(|m| matches!(m, Some(Milestone::MalaCompleted { .. })))
            .count();
        assert_eq!(mala_count, 1);
        assert!(state.has(AchievementId::MalaCompleted));
    }

    #[test]
    fn repeated_malas_add_the_achievement_once() {
        let (state, milestones) = tap_n(&SessionState::default(), 324, day(0));
        assert_eq!(
            milestones[215],
            Some(Milestone::MalaCompleted { malas_today: 2 })
        );
        assert_eq!(
            milestones[323],
            Some(Milestone::MalaCompleted { malas_today: 3 })
        );
        assert_eq!(
            state
                .achievements
                .iter()
                .filter(|a| **a == AchievementId::MalaCompleted)
                .count(),
            1
        );
    }

    #[test]
    fn mala_unlock_is_reported_once() {
        let (state, _) = tap_n(&SessionState::default(), 107, day(0));
        let outcome = record_tap(&state, day(0));
        assert_eq!(outcome.unlocked, vec![AchievementId::MalaCompleted]);
        let (state, _) = tap_n(&outcome.state, 107, day(0));
        let outcome = record_tap(&state, day(0));
        assert!(outcome.unlocked.is_empty());
    }

    #[test]
    fn consecutive_days_extend_streak() {
        let mut state = SessionState::default();
        state = record_tap(&state, day(0)).state;
        let outcome = record_tap(&state, day(1));
        assert_eq!(outcome.streak, StreakTransition::Extended { days: 2 });
        assert_eq!(outcome.milestone, Some(Milestone::StreakExtended { days: 2 }));
        let outcome = record_tap(&outcome.state, day(2));
        assert_eq!(outcome.state.streak_days, 3);
    }

    #[test]
    fn gap_resets_streak() {
        let mut state = record_tap(&SessionState::default(), day(0)).state;
        state = rollover_day(&state, day(2));
        let outcome = record_tap(&state, day(2));
        assert_eq!(outcome.streak, StreakTransition::Started);
        assert_eq!(outcome.state.streak_days, 1);
        assert_eq!(outcome.milestone, Some(Milestone::StreakStarted));
    }

    #[test]
    fn clock_moving_backwards_restarts_streak() {
        let state = SessionState {
            streak_days: 5,
            last_active_date: Some(day(3)),
            ..Default::default()
        };
        let outcome = record_tap(&state, day(0));
        assert_eq!(outcome.streak, StreakTransition::Started);
        assert_eq!(outcome.state.streak_days, 1);
    }

    #[test]
    fn seven_day_streak_unlocks_and_survives_reset_of_streak() {
        let mut state = SessionState::default();
        let mut seen = Vec::new();
        for d in 0..7 {
            state = rollover_day(&state, day(d));
            let outcome = record_tap(&state, day(d));
            seen.push(outcome.milestone);
            state = outcome.state;
        }
        assert_eq!(seen[6], Some(Milestone::SevenDayStreak));
        assert!(state.has(AchievementId::SevenDayStreak));

        state = rollover_day(&state, day(10));
        state = record_tap(&state, day(10)).state;
        assert_eq!(state.streak_days, 1);
        assert!(state.has(AchievementId::SevenDayStreak));
    }

    #[test]
    fn seventh_day_again_does_not_repeat_achievement() {
        let state = SessionState {
            streak_days: 6,
            last_active_date: Some(day(-1)),
            achievements: [AchievementId::SevenDayStreak].into_iter().collect(),
            ..Default::default()
        };
        let outcome = record_tap(&state, day(0));
        assert_eq!(outcome.milestone, Some(Milestone::StreakExtended { days: 7 }));
        assert!(outcome.unlocked.is_empty());
    }

    #[test]
    fn thirty_day_streak_unlocks() {
        let state = SessionState {
            streak_days: 29,
            last_active_date: Some(day(-1)),
            achievements: [AchievementId::SevenDayStreak].into_iter().collect(),
            ..Default::default()
        };
        let outcome = record_tap(&state, day(0));
        assert_eq!(outcome.milestone, Some(Milestone::ThirtyDayStreak));
        assert_eq!(outcome.unlocked, vec![AchievementId::ThirtyDayStreak]);
    }

    #[test]
    fn thousandth_japa_unlocks_achievement() {
        let state = SessionState {
            today_count: 0,
            total_count: 999,
            ..Default::default()
        };
        let outcome = record_tap(&state, day(0));
        assert_eq!(outcome.state.total_count, 1000);
        assert!(outcome.state.has(AchievementId::ThousandJapas));
        let message = outcome.milestone.unwrap().to_string();
        assert!(message.contains("1000"));
    }

    #[test]
    fn thousand_overrides_mala_message() {
        let mut state = SessionState {
            total_count: 892,
            last_active_date: Some(day(0)),
            streak_days: 1,
            ..Default::default()
        };
        state = tap_n(&state, 107, day(0)).0;
        let outcome = record_tap(&state, day(0));
        assert_eq!(outcome.state.total_count, 1000);
        assert_eq!(outcome.milestone, Some(Milestone::ThousandJapas));
        assert_eq!(
            outcome.unlocked,
            vec![AchievementId::MalaCompleted, AchievementId::ThousandJapas]
        );
    }

    #[test]
    fn reset_then_tap_matches_fresh_first_tap() {
        let (state, _) = tap_n(&SessionState::default(), 300, day(0));
        let reset = reset_all(&state);
        assert_eq!(reset, SessionState::default());
        let after = record_tap(&reset, day(4));
        let fresh = record_tap(&SessionState::default(), day(4));
        assert_eq!(after, fresh);
        assert_eq!(after.state.today_count, 1);
        assert_eq!(after.state.total_count, 1);
        assert_eq!(after.state.history.len(), 1);
        assert_eq!(after.state.streak_days, 1);
    }

    #[test]
    fn rollover_reads_today_from_history() {
        let (state, _) = tap_n(&SessionState::default(), 5, day(0));
        let next_day = rollover_day(&state, day(1));
        assert_eq!(next_day.today_count, 0);
        assert_eq!(next_day.total_count, 5);
        assert_eq!(next_day.streak_days, 1);
        assert_eq!(next_day.history, state.history);

        let back = rollover_day(&next_day, day(0));
        assert_eq!(back.today_count, 5);
    }

    #[test]
    fn acknowledge_clears_pending_milestone() {
        let outcome = record_tap(&SessionState::default(), day(0));
        let acked = acknowledge_milestone(&outcome.state);
        assert!(acked.pending_milestone.is_none());
        let next = record_tap(&acked, day(0));
        assert!(next.state.pending_milestone.is_none());
    }
}
