//! # Soundpad Common Library
//!
//! Shared code for the Soundpad workspace:
//! - Error types
//! - Event types (SoundpadEvent enum)
//! - Config file location
//! - Timestamp and countdown formatting helpers

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;
pub mod time;

pub use error::{Error, Result};
pub use events::SoundpadEvent;
