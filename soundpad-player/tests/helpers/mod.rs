//! Test helper modules for Soundpad integration tests
//!
//! - TestServer: full router over an in-memory database and headless output
//! - audio_generator: WAV fixtures on disk

pub mod audio_generator;
pub mod test_server;

pub use audio_generator::{wav_bytes, write_sounds, FIXTURE_RATE};
pub use test_server::{wait_for, TestServer};
