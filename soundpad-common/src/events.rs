//! Event types for the Soundpad event stream

use serde::{Deserialize, Serialize};

/// Soundpad event types
///
/// Serialized with an internal `type` tag so the page can dispatch on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SoundpadEvent {
    /// "Now playing" region changed (`text: None` hides it)
    NowPlayingChanged {
        sound_id: Option<String>,
        text: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Countdown display changed (`text: None` hides it)
    TimerStatusChanged {
        active: bool,
        remaining_ms: Option<i64>,
        text: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Output gain changed
    VolumeChanged {
        volume: f32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback speed changed
    SpeedChanged {
        speed: f32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Trigger panel regenerated
    PanelChanged {
        buttons: Vec<ButtonInfo>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A play attempt was abandoned (fetch or decode failure)
    PlaybackFailed {
        sound_id: String,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Full state snapshot, sent first on every SSE connection
    InitialState {
        now_playing: Option<String>,
        timer: Option<String>,
        buttons: Vec<ButtonInfo>,
        volume: f32,
        speed: f32,
        loop_enabled: bool,
        interval_seconds: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl SoundpadEvent {
    /// Event name used for the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            SoundpadEvent::NowPlayingChanged { .. } => "NowPlayingChanged",
            SoundpadEvent::TimerStatusChanged { .. } => "TimerStatusChanged",
            SoundpadEvent::VolumeChanged { .. } => "VolumeChanged",
            SoundpadEvent::SpeedChanged { .. } => "SpeedChanged",
            SoundpadEvent::PanelChanged { .. } => "PanelChanged",
            SoundpadEvent::PlaybackFailed { .. } => "PlaybackFailed",
            SoundpadEvent::InitialState { .. } => "InitialState",
        }
    }
}

/// One trigger button on the panel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ButtonInfo {
    pub sound_id: String,
    pub label: String,
}
