//! Sign-in to the shared leaderboard.
//!
//! The signed-in identity is kept in the local store under `remote_session`
//! so later commands can push without signing in again.

use chrono::Utc;
use clap::Subcommand;
use serde::Serialize;

use japa_core::events::Event;
use japa_core::sync::Credentials;
use japa_core::Config;

use crate::context::{self, CliResult};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Sign in with email and password, or anonymously with a display name
    Login {
        #[arg(long, requires = "password")]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
        /// Name shown on the leaderboard for an anonymous account
        #[arg(long, conflicts_with = "email")]
        name: Option<String>,
    },
    /// Sign out and clear all local counters
    Logout,
    /// Show who is signed in
    Status,
}

#[derive(Serialize)]
struct AuthStatus {
    signed_in: bool,
    user_id: Option<String>,
    display_name: Option<String>,
    email: Option<String>,
    token_expired: Option<bool>,
}

pub async fn run(action: AuthAction) -> CliResult {
    match action {
        AuthAction::Login {
            email,
            password,
            name,
        } => {
            let credentials = match (email, password, name) {
                (Some(email), Some(password), _) => Credentials::EmailPassword { email, password },
                (None, _, Some(display_name)) if !display_name.trim().is_empty() => {
                    Credentials::Anonymous {
                        display_name: display_name.trim().to_string(),
                    }
                }
                _ => return Err("pass --email and --password, or --name for an anonymous account".into()),
            };
            login(credentials).await
        }
        AuthAction::Logout => logout().await,
        AuthAction::Status => status(),
    }
}

async fn login(credentials: Credentials) -> CliResult {
    let config = Config::load()?;
    let mut ctl = context::open_controller()?;
    let mut session = context::open_session(&config, ctl.store())?;

    let today = context::today();
    let events = session.sign_in(&credentials, &mut ctl, today).await?;
    context::save_identity(ctl.store(), session.identity());
    context::print_json(&events)
}

async fn logout() -> CliResult {
    let mut ctl = context::open_controller()?;
    if context::load_identity(ctl.store()).is_none() {
        return Err("not signed in".into());
    }

    let session = match Config::load() {
        Ok(config) => context::open_session(&config, ctl.store()),
        Err(e) => Err(e.into()),
    };
    let events = match session {
        Ok(mut session) => session.sign_out(&mut ctl).await?,
        Err(e) => {
            // Without a usable backend config the local sign-out still happens.
            tracing::warn!(error = %e, "remote sign-out skipped");
            let mut events = ctl.reset_all();
            events.push(Event::SignedOut { at: Utc::now() });
            events
        }
    };
    context::save_identity(ctl.store(), None);
    context::print_json(&events)
}

fn status() -> CliResult {
    let store = context::open_store()?;
    let status = match context::load_identity(&store) {
        Some(identity) => AuthStatus {
            signed_in: true,
            token_expired: Some(identity.is_expired(Utc::now())),
            display_name: Some(identity.leaderboard_name()),
            user_id: Some(identity.user_id),
            email: identity.email,
        },
        None => AuthStatus {
            signed_in: false,
            user_id: None,
            display_name: None,
            email: None,
            token_expired: None,
        },
    };
    context::print_json(&status)
}
