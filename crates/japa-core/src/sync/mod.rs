//! Remote sync with the shared Firestore collection.
//!
//! Authentication, push/pull of the user's record and the community
//! leaderboard. Every remote call is best effort: the local store stays the
//! source of truth while offline.

pub mod device_id;
pub mod document_codec;
pub mod firestore;
pub mod gateway;
pub mod leaderboard;
pub mod session;
pub mod types;


pub use device_id::{get_or_create_device_id, get_or_create_device_id_at, DeviceIdError};
pub use firestore::FirestoreGateway;
pub use gateway::RemoteGateway;
pub use leaderboard::LeaderboardSubscription;
pub use session::SyncSession;
pub use types::{
    known_achievements, Credentials, LeaderboardSnapshot, PushOutcome, RemoteUserRecord,
    StatePush, SyncError, UserIdentity,
};
