//! # Japa Core Library
//!
//! Core logic for a devotional tap counter: each tap is one japa, 108 japas
//! make a mala. The same library backs the `japa` CLI and any GUI shell.
//!
//! ## Architecture
//!
//! - **Counter**: pure state transitions for taps, streaks, achievements and
//!   milestones, owned by a single [`SessionController`]
//! - **Storage**: per-key persistence over SQLite and TOML configuration
//! - **Sync**: Firebase Auth + Firestore gateway, background pushes and a
//!   polled leaderboard subscription
//!
//! ## Key Components
//!
//! - [`SessionController`]: owner of the in-memory session state
//! - [`KvStateStore`]: key-granular persistence
//! - [`RemoteGateway`]: boundary to the hosted backend
//! - [`SyncSession`]: sign-in, pushes and leaderboard for one user

pub mod counter;
pub mod error;
pub mod events;
pub mod storage;
pub mod sync;

pub use counter::{AchievementId, Milestone, SessionController, SessionState, MALA_SIZE};
pub use error::{ConfigError, CoreError, StorageError};
pub use events::Event;
pub use storage::{Config, Database, KvStateStore, StateStore};
pub use sync::{FirestoreGateway, RemoteGateway, SyncError, SyncSession};
