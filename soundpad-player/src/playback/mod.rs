//! Playback session management

pub mod controller;

pub use controller::{
    normalize_speed, LoopOptions, PlaybackController, PlaybackSnapshot, SessionOutcome,
};
