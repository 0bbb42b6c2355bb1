//! # Soundpad Player Library
//!
//! Plays short sound clips on demand with optional looping, playback speed,
//! master volume and an auto-stop countdown, controlled over HTTP with
//! live updates over SSE.
//!
//! **Architecture:** symphonia decode → rubato resample → single-voice
//! output sink → cpal (or a headless clock)

pub mod api;
pub mod assets;
pub mod audio;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod panel;
pub mod playback;
pub mod state;
pub mod timer;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{Error, Result};
pub use state::SharedState;
