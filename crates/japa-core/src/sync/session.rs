//! Signed-in session: identity, pushes and the leaderboard subscription.
//!
//! The session never mutates counters on its own. Hydration after sign-in
//! and the reset after sign-out go through the [`SessionController`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tokio::task::JoinHandle;

use super::gateway::RemoteGateway;
use super::leaderboard::LeaderboardSubscription;
use super::types::{
    Credentials, LeaderboardSnapshot, PushOutcome, StatePush, SyncError, UserIdentity,
};
use crate::counter::{SessionController, SessionState};
use crate::events::Event;
use crate::storage::StateStore;

pub struct SyncSession {
    gateway: Arc<dyn RemoteGateway>,
    identity: Option<UserIdentity>,
    device_id: Option<String>,
    poll_interval: Duration,
    leaderboard: Option<LeaderboardSubscription>,
}

impl SyncSession {
    pub fn new(gateway: Arc<dyn RemoteGateway>, poll_interval: Duration) -> Self {
        Self {
            gateway,
            identity: None,
            device_id: None,
            poll_interval,
            leaderboard: None,
        }
    }

    /// Resume a previously stored identity.
    pub fn with_identity(mut self, identity: Option<UserIdentity>) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_device_id(mut self, device_id: Option<String>) -> Self {
        self.device_id = device_id;
        self
    }

    pub fn identity(&self) -> Option<&UserIdentity> {
        self.identity.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.identity.is_some()
    }

    // ── Sign-in / sign-out ───────────────────────────────────────────

    /// Authenticate, then make local and remote agree.
    ///
    /// An existing remote record overwrites local counters. Without one, the
    /// record is created from local state. If the backend is unreachable after
    /// authenticating, local state is kept and the user stays signed in; the
    /// next push writes the record.
    pub async fn sign_in<S: StateStore>(
        &mut self,
        credentials: &Credentials,
        controller: &mut SessionController<S>,
        today: NaiveDate,
    ) -> Result<Vec<Event>, SyncError> {
        let identity = self.gateway.authenticate(credentials).await?;
        tracing::info!(user_id = %identity.user_id, "signed in");

        let mut events = vec![Event::SignedIn {
            user_id: identity.user_id.clone(),
            display_name: identity.display_name.clone(),
            at: Utc::now(),
        }];

        match self.gateway.pull_state(&identity).await {
            Ok(Some(record)) => {
                events.extend(controller.hydrate_from_remote(&record, today));
            }
            Ok(None) => {
                let push = self.push_for(&identity, controller.state(), today);
                match self.gateway.create_user(&identity, &push).await {
                    Ok(()) => tracing::info!(user_id = %identity.user_id, "remote record created"),
                    Err(e) if e.is_offline() => {
                        tracing::warn!(error = %e, "backend unreachable, record not created yet");
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(e) if e.is_offline() => {
                tracing::warn!(error = %e, "backend unreachable, keeping local state");
            }
            Err(e) => return Err(e),
        }

        self.identity = Some(identity);
        Ok(events)
    }

    /// End the remote session and hard-reset local counters.
    pub async fn sign_out<S: StateStore>(
        &mut self,
        controller: &mut SessionController<S>,
    ) -> Result<Vec<Event>, SyncError> {
        let identity = self.identity.take().ok_or(SyncError::NotSignedIn)?;
        self.unsubscribe_leaderboard();

        if let Err(e) = self.gateway.sign_out(&identity).await {
            tracing::warn!(error = %e, "remote sign-out failed");
        }

        let mut events = controller.reset_all();
        events.push(Event::SignedOut { at: Utc::now() });
        tracing::info!(user_id = %identity.user_id, "signed out");
        Ok(events)
    }

    /// Refresh the ID token if it is about to expire.
    pub async fn ensure_fresh(&mut self) -> Result<&UserIdentity, SyncError> {
        let current = self.identity.as_ref().ok_or(SyncError::NotSignedIn)?;
        if current.is_expired(Utc::now()) {
            let refreshed = self.gateway.refresh(current).await?;
            tracing::debug!(user_id = %refreshed.user_id, "token refreshed");
            self.identity = Some(refreshed);
        }
        self.identity.as_ref().ok_or(SyncError::NotSignedIn)
    }

    // ── Push / pull ──────────────────────────────────────────────────

    /// Push now and wait for the result.
    pub async fn push_now(
        &mut self,
        state: &SessionState,
        today: NaiveDate,
    ) -> Result<Event, SyncError> {
        let identity = self.ensure_fresh().await?.clone();
        let push = self.push_for(&identity, state, today);
        let outcome = self.gateway.push_state(&identity, &push).await?;
        Ok(Event::StatePushed {
            user_id: identity.user_id,
            offline: outcome == PushOutcome::Offline,
            at: Utc::now(),
        })
    }

    /// Push a snapshot of `state` without waiting. `None` when signed out.
    ///
    /// An expired token is refreshed inside the task but not kept on the
    /// session; call [`Self::ensure_fresh`] first to keep it. Errors are
    /// logged by the task and also returned through the handle.
    pub fn push_in_background(
        &self,
        state: &SessionState,
        today: NaiveDate,
    ) -> Option<JoinHandle<Result<PushOutcome, SyncError>>> {
        let identity = self.identity.clone()?;
        let push = self.push_for(&identity, state, today);
        let gateway = Arc::clone(&self.gateway);

        Some(tokio::spawn(async move {
            let identity = if identity.is_expired(Utc::now()) {
                match gateway.refresh(&identity).await {
                    Ok(refreshed) => refreshed,
                    Err(e) if e.is_offline() => {
                        tracing::info!(error = %e, "push skipped, backend unreachable");
                        return Ok(PushOutcome::Offline);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "background push failed");
                        return Err(e);
                    }
                }
            } else {
                identity
            };
            let result = gateway.push_state(&identity, &push).await;
            if let Err(e) = &result {
                tracing::warn!(error = %e, "background push failed");
            }
            result
        }))
    }

    /// Pull the remote record and hydrate the controller from it.
    pub async fn pull_into<S: StateStore>(
        &mut self,
        controller: &mut SessionController<S>,
        today: NaiveDate,
    ) -> Result<Vec<Event>, SyncError> {
        let identity = self.ensure_fresh().await?.clone();
        match self.gateway.pull_state(&identity).await? {
            Some(record) => Ok(controller.hydrate_from_remote(&record, today)),
            None => Ok(Vec::new()),
        }
    }

    /// Zero `todayJapa` on every remote record.
    pub async fn reset_daily_counts(&mut self) -> Result<usize, SyncError> {
        let identity = self.ensure_fresh().await?.clone();
        self.gateway.reset_daily_counts(&identity).await
    }

    // ── Leaderboard ──────────────────────────────────────────────────

    /// One-off read of the standings. Works signed out if the rules allow it.
    pub async fn fetch_leaderboard(&mut self) -> Result<LeaderboardSnapshot, SyncError> {
        if self.identity.is_some() {
            self.ensure_fresh().await?;
        }
        self.gateway.fetch_leaderboard(self.identity.as_ref()).await
    }

    /// Start the leaderboard subscription, replacing any running one.
    pub fn subscribe_leaderboard(&mut self) -> &mut LeaderboardSubscription {
        self.unsubscribe_leaderboard();
        let subscription = LeaderboardSubscription::spawn(
            Arc::clone(&self.gateway),
            self.identity.clone(),
            self.poll_interval,
        );
        self.leaderboard.insert(subscription)
    }

    pub fn leaderboard(&mut self) -> Option<&mut LeaderboardSubscription> {
        self.leaderboard.as_mut()
    }

    /// Stop the subscription, keeping any token it refreshed.
    pub fn unsubscribe_leaderboard(&mut self) {
        let Some(subscription) = self.leaderboard.take() else {
            return;
        };
        let Some(polled) = subscription.unsubscribe() else {
            return;
        };
        if let Some(current) = self.identity.as_mut() {
            if current.user_id == polled.user_id && polled.expires_at > current.expires_at {
                *current = polled;
            }
        }
    }

    fn push_for(&self, identity: &UserIdentity, state: &SessionState, today: NaiveDate) -> StatePush {
        StatePush::from_state(state, today)
            .with_display_name(Some(identity.leaderboard_name()))
            .with_device_id(self.device_id.clone())
    }
}
