use async_trait::async_trait;

use super::types::{
    Credentials, LeaderboardSnapshot, PushOutcome, RemoteUserRecord, StatePush, SyncError,
    UserIdentity,
};

/// Boundary to the hosted backend.
///
/// Every call is best effort. Implementations map unreachable-network
/// failures to [`SyncError::Offline`]; `push_state` turns those into
/// `Ok(PushOutcome::Offline)`. Writes are last-writer-wins.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Interactive sign-in. Failures are meant for the user; there is no retry.
    async fn authenticate(&self, credentials: &Credentials) -> Result<UserIdentity, SyncError>;

    /// Exchange the refresh token for a fresh ID token.
    async fn refresh(&self, identity: &UserIdentity) -> Result<UserIdentity, SyncError>;

    async fn sign_out(&self, identity: &UserIdentity) -> Result<(), SyncError>;

    async fn push_state(
        &self,
        identity: &UserIdentity,
        push: &StatePush,
    ) -> Result<PushOutcome, SyncError>;

    /// `Ok(None)` when the user has no document yet.
    async fn pull_state(&self, identity: &UserIdentity)
        -> Result<Option<RemoteUserRecord>, SyncError>;

    /// Create the user's document. An existing document is left alone.
    async fn create_user(&self, identity: &UserIdentity, push: &StatePush)
        -> Result<(), SyncError>;

    async fn fetch_leaderboard(
        &self,
        identity: Option<&UserIdentity>,
    ) -> Result<LeaderboardSnapshot, SyncError>;

    /// Zero every user's `todayJapa`. Returns how many documents were touched.
    async fn reset_daily_counts(&self, identity: &UserIdentity) -> Result<usize, SyncError>;
}
