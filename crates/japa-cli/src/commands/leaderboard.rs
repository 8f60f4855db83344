use serde::Serialize;

use japa_core::sync::{LeaderboardSnapshot, RemoteUserRecord};
use japa_core::Config;

use crate::context::{self, CliResult};

#[derive(Serialize)]
struct Standing<'a> {
    rank: usize,
    name: &'a str,
    today_japa: u64,
    total_japa: u64,
    streak: u32,
}

#[derive(Serialize)]
struct LeaderboardView<'a> {
    today_total: u64,
    all_time_total: u64,
    your_rank: Option<usize>,
    standings: Vec<Standing<'a>>,
}

fn view<'a>(snapshot: &'a LeaderboardSnapshot, user_id: Option<&str>) -> LeaderboardView<'a> {
    LeaderboardView {
        today_total: snapshot.today_total,
        all_time_total: snapshot.all_time_total,
        your_rank: user_id.and_then(|id| snapshot.rank_of(id)),
        standings: snapshot
            .users
            .iter()
            .enumerate()
            .map(|(i, user)| Standing {
                rank: i + 1,
                name: display_name(user),
                today_japa: user.today_japa,
                total_japa: user.total_japa,
                streak: user.streak,
            })
            .collect(),
    }
}

fn display_name(user: &RemoteUserRecord) -> &str {
    if user.display_name.is_empty() {
        &user.user_id
    } else {
        &user.display_name
    }
}

pub async fn run(watch: bool) -> CliResult {
    let config = Config::load()?;
    let store = context::open_store()?;
    let mut session = context::open_session(&config, &store)?;
    let user_id = session.identity().map(|i| i.user_id.clone());

    if !watch {
        let snapshot = session.fetch_leaderboard().await?;
        context::save_identity(&store, session.identity());
        return context::print_json(&view(&snapshot, user_id.as_deref()));
    }

    let subscription = session.subscribe_leaderboard();
    loop {
        tokio::select! {
            changed = subscription.changed() => match changed {
                Some(snapshot) => context::print_json(&view(&snapshot, user_id.as_deref()))?,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    session.unsubscribe_leaderboard();
    // The poller may have refreshed the token.
    context::save_identity(&store, session.identity());
    Ok(())
}
