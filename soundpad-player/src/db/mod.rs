//! Database access layer
//!
//! A single SQLite `settings` key-value table holds the few values that
//! survive restarts (button count, playback speed).

pub mod init;
pub mod settings;

pub use init::{connect, connect_in_memory};
