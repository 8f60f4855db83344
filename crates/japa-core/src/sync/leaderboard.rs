//! Live leaderboard subscription.
//!
//! A background task polls the gateway and publishes changed standings on a
//! `watch` channel. The task owns only the sending half, so it can never
//! touch session state. Its copy of the identity is refreshed in place when
//! the ID token nears expiry. The subscription must be ended with
//! [`LeaderboardSubscription::unsubscribe`] when the session ends; dropping
//! the handle stops the task as well.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::gateway::RemoteGateway;
use super::types::{LeaderboardSnapshot, SyncError, UserIdentity};

type SharedIdentity = Arc<Mutex<Option<UserIdentity>>>;

pub struct LeaderboardSubscription {
    receiver: watch::Receiver<Option<LeaderboardSnapshot>>,
    identity: SharedIdentity,
    task: Option<JoinHandle<()>>,
}

impl LeaderboardSubscription {
    /// Start polling. Must be called inside a tokio runtime.
    pub fn spawn(
        gateway: Arc<dyn RemoteGateway>,
        identity: Option<UserIdentity>,
        interval: Duration,
    ) -> Self {
        let (sender, receiver) = watch::channel(None);
        let identity = Arc::new(Mutex::new(identity));
        let task = tokio::spawn(poll_loop(gateway, Arc::clone(&identity), interval, sender));
        Self {
            receiver,
            identity,
            task: Some(task),
        }
    }

    /// The identity the poller is using, including any refreshed token.
    pub fn identity(&self) -> Option<UserIdentity> {
        self.identity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Latest standings, if any poll has succeeded yet.
    pub fn latest(&self) -> Option<LeaderboardSnapshot> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change. `None` once the subscription has ended.
    pub async fn changed(&mut self) -> Option<LeaderboardSnapshot> {
        self.receiver.changed().await.ok()?;
        self.receiver.borrow_and_update().clone()
    }

    /// Another read handle on the same standings.
    pub fn watcher(&self) -> watch::Receiver<Option<LeaderboardSnapshot>> {
        self.receiver.clone()
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop polling and hand back the latest identity.
    pub fn unsubscribe(mut self) -> Option<UserIdentity> {
        self.stop();
        self.identity()
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("leaderboard subscription stopped");
        }
    }
}

impl Drop for LeaderboardSubscription {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Current identity for the next poll, refreshed first when expired.
/// `Err` means this tick should be skipped.
async fn fresh_identity(
    gateway: &dyn RemoteGateway,
    shared: &SharedIdentity,
) -> Result<Option<UserIdentity>, SyncError> {
    let current = shared
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    let Some(identity) = current else {
        return Ok(None);
    };
    if !identity.is_expired(Utc::now()) {
        return Ok(Some(identity));
    }

    let refreshed = gateway.refresh(&identity).await?;
    tracing::debug!(user_id = %refreshed.user_id, "leaderboard token refreshed");
    *shared.lock().unwrap_or_else(PoisonError::into_inner) = Some(refreshed.clone());
    Ok(Some(refreshed))
}

async fn poll_loop(
    gateway: Arc<dyn RemoteGateway>,
    identity: SharedIdentity,
    interval: Duration,
    sender: watch::Sender<Option<LeaderboardSnapshot>>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if sender.is_closed() {
            break;
        }
        let current = match fresh_identity(gateway.as_ref(), &identity).await {
            Ok(current) => current,
            Err(e) => {
                tracing::warn!(error = %e, "leaderboard token refresh failed");
                continue;
            }
        };
        match gateway.fetch_leaderboard(current.as_ref()).await {
            Ok(snapshot) => {
                sender.send_if_modified(|current| {
                    let unchanged = current
                        .as_ref()
                        .is_some_and(|existing| existing.same_standings(&snapshot));
                    if !unchanged {
                        *current = Some(snapshot);
                    }
                    !unchanged
                });
            }
            Err(e) if e.is_offline() => {
                tracing::debug!(error = %e, "leaderboard poll skipped");
            }
            Err(e) => {
                tracing::warn!(error = %e, "leaderboard poll failed");
            }
        }
    }
}
