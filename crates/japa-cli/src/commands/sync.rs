//! Manual push/pull of the remote record.

use clap::Subcommand;
use serde::Serialize;

use japa_core::Config;

use crate::context::{self, CliResult};

#[derive(Subcommand)]
pub enum SyncAction {
    /// Push local counters to the remote record
    Push,
    /// Overwrite local counters with the remote record
    Pull,
    /// Zero today's count on every remote record
    ResetDaily {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Serialize)]
struct ResetSummary {
    reset: usize,
}

pub async fn run(action: SyncAction) -> CliResult {
    let config = Config::load()?;
    let mut ctl = context::open_controller()?;
    let mut session = context::open_session(&config, ctl.store())?;
    let today = context::today();

    let result = match action {
        SyncAction::Push => {
            let event = session.push_now(ctl.state(), today).await?;
            context::print_json(&event)
        }
        SyncAction::Pull => {
            let events = session.pull_into(&mut ctl, today).await?;
            context::print_json(&events)
        }
        SyncAction::ResetDaily { yes } => {
            if !yes {
                return Err("reset-daily zeroes every user's count for today; pass --yes to confirm".into());
            }
            let reset = session.reset_daily_counts().await?;
            context::print_json(&ResetSummary { reset })
        }
    };

    // A refreshed token is kept for the next command.
    context::save_identity(ctl.store(), session.identity());
    result
}
