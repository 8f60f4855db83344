//! Shared plumbing for commands: local store, controller and sync session.

use std::error::Error;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tokio::task::JoinHandle;

use japa_core::storage::{keys, Config, Database, KvStateStore};
use japa_core::sync::{
    get_or_create_device_id, FirestoreGateway, PushOutcome, SyncError, SyncSession, UserIdentity,
};
use japa_core::SessionController;

pub type CliResult = Result<(), Box<dyn Error>>;
pub type Store = KvStateStore<Database>;
pub type Controller = SessionController<Store>;

/// The user's local calendar date.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn open_store() -> Result<Store, Box<dyn Error>> {
    Ok(KvStateStore::new(Database::open()?))
}

pub fn open_controller() -> Result<Controller, Box<dyn Error>> {
    Ok(SessionController::load(open_store()?, today()))
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ── Identity ─────────────────────────────────────────────────────────

pub fn load_identity(store: &Store) -> Option<UserIdentity> {
    store.load_json(keys::REMOTE_SESSION)
}

pub fn save_identity(store: &Store, identity: Option<&UserIdentity>) {
    let result = match identity {
        Some(identity) => store.save_json(keys::REMOTE_SESSION, identity),
        None => store.remove(keys::REMOTE_SESSION),
    };
    if let Err(e) = result {
        tracing::warn!(error = %e, "failed to persist remote session");
    }
}

// ── Sync ─────────────────────────────────────────────────────────────

/// Build a sync session from the config and any stored identity.
///
/// Fails when sync is disabled or incomplete in the config.
pub fn open_session(config: &Config, store: &Store) -> Result<SyncSession, Box<dyn Error>> {
    let gateway = FirestoreGateway::new(config.sync.clone())?;
    let device_id = get_or_create_device_id()
        .map_err(|e| tracing::warn!(error = %e, "device id unavailable"))
        .ok();
    Ok(SyncSession::new(Arc::new(gateway), config.sync.poll_interval())
        .with_identity(load_identity(store))
        .with_device_id(device_id))
}

/// Start pushing the controller's state if sync is set up and a user is
/// signed in. The caller decides whether to wait for the handle.
pub async fn spawn_push(ctl: &Controller) -> Option<JoinHandle<Result<PushOutcome, SyncError>>> {
    let config = Config::load_or_default();
    if !config.sync.enabled || load_identity(ctl.store()).is_none() {
        return None;
    }
    let mut session = match open_session(&config, ctl.store()) {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(error = %e, "sync unavailable");
            return None;
        }
    };

    if let Err(e) = session.ensure_fresh().await {
        tracing::warn!(error = %e, "could not refresh sign-in");
        return None;
    }
    save_identity(ctl.store(), session.identity());
    session.push_in_background(ctl.state(), ctl.current_day())
}
