//! Shared display state
//!
//! What the page shows: the "now playing" line, the countdown line, and the
//! trigger buttons. Every change is broadcast to SSE listeners.
//!
//! Uses parking_lot locks: writers include synchronous paths (stop, timer
//! expiry) and no lock is held across an await.

use parking_lot::RwLock;
use soundpad_common::events::{ButtonInfo, SoundpadEvent};
use soundpad_common::time;
use tokio::sync::broadcast;

/// Event channel depth; slow SSE clients past this skip ahead
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Contents of the "now playing" region
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub sound_id: String,
    pub text: String,
}

/// Contents of the countdown region
#[derive(Debug, Clone, PartialEq)]
pub struct TimerDisplay {
    /// True while a countdown is running; false for the "finished" line
    pub active: bool,
    pub remaining_ms: i64,
    pub text: String,
}

/// Shared state accessible by all components
pub struct SharedState {
    now_playing: RwLock<Option<NowPlaying>>,
    timer: RwLock<Option<TimerDisplay>>,
    buttons: RwLock<Vec<ButtonInfo>>,

    /// Event broadcaster for SSE events
    pub event_tx: broadcast::Sender<SoundpadEvent>,
}

impl SharedState {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            now_playing: RwLock::new(None),
            timer: RwLock::new(None),
            buttons: RwLock::new(Vec::new()),
            event_tx,
        }
    }

    /// Broadcast an event to all SSE listeners
    pub fn broadcast_event(&self, event: SoundpadEvent) {
        // No receivers is fine
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to event stream for SSE
    pub fn subscribe_events(&self) -> broadcast::Receiver<SoundpadEvent> {
        self.event_tx.subscribe()
    }

    pub fn now_playing(&self) -> Option<NowPlaying> {
        self.now_playing.read().clone()
    }

    /// Show `text` in the "now playing" region
    pub fn set_now_playing(&self, sound_id: &str, text: String) {
        let next = NowPlaying {
            sound_id: sound_id.to_string(),
            text,
        };
        {
            let mut current = self.now_playing.write();
            if current.as_ref() == Some(&next) {
                return;
            }
            *current = Some(next.clone());
        }
        self.broadcast_event(SoundpadEvent::NowPlayingChanged {
            sound_id: Some(next.sound_id),
            text: Some(next.text),
            timestamp: time::now(),
        });
    }

    /// Hide the "now playing" region. Returns true if it was visible.
    pub fn clear_now_playing(&self) -> bool {
        let was_visible = self.now_playing.write().take().is_some();
        if was_visible {
            self.broadcast_event(SoundpadEvent::NowPlayingChanged {
                sound_id: None,
                text: None,
                timestamp: time::now(),
            });
        }
        was_visible
    }

    pub fn timer_display(&self) -> Option<TimerDisplay> {
        self.timer.read().clone()
    }

    /// Show a countdown line
    pub fn set_timer_display(&self, display: TimerDisplay) {
        {
            let mut current = self.timer.write();
            if current.as_ref() == Some(&display) {
                return;
            }
            *current = Some(display.clone());
        }
        self.broadcast_event(SoundpadEvent::TimerStatusChanged {
            active: display.active,
            remaining_ms: Some(display.remaining_ms),
            text: Some(display.text),
            timestamp: time::now(),
        });
    }

    /// Hide the countdown region. Returns true if it was visible.
    pub fn clear_timer_display(&self) -> bool {
        let was_visible = self.timer.write().take().is_some();
        if was_visible {
            self.broadcast_event(SoundpadEvent::TimerStatusChanged {
                active: false,
                remaining_ms: None,
                text: None,
                timestamp: time::now(),
            });
        }
        was_visible
    }

    pub fn buttons(&self) -> Vec<ButtonInfo> {
        self.buttons.read().clone()
    }

    /// Replace the trigger buttons (always broadcast, even when unchanged)
    pub fn set_buttons(&self, buttons: Vec<ButtonInfo>) {
        *self.buttons.write() = buttons.clone();
        self.broadcast_event(SoundpadEvent::PanelChanged {
            buttons,
            timestamp: time::now(),
        });
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
