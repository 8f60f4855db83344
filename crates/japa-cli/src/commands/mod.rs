pub mod auth;
pub mod config;
pub mod counter;
pub mod history;
pub mod leaderboard;
pub mod prefs;
pub mod sync;
