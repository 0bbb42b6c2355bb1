//! Output sink
//!
//! The single point where sound reaches the speakers. Holds at most one
//! [`Voice`] (the clip currently sounding) and the master gain. The device
//! callback, or the headless clock, pulls frames out through [`OutputSink::render`].
//!
//! Installing a new voice or clearing the sink drops the previous one,
//! which drops its `ended` sender; the waiting session sees a closed
//! channel and knows it was superseded rather than finished.

use crate::audio::types::{AudioFrame, DecodedClip, STEREO};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::debug;

/// Sample rate assumed until an output device reports its own
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Default master gain (unity)
pub const DEFAULT_GAIN: f32 = 1.0;

/// A clip being played, with its read cursor.
pub struct Voice {
    session: u64,
    samples: Arc<Vec<f32>>,
    /// Fractional frame cursor
    position: f64,
    /// Frames advanced per output frame (playback speed)
    rate: f64,
    ended_tx: Option<oneshot::Sender<()>>,
}

impl Voice {
    /// Create a voice for `clip` and the receiver that fires when it plays out.
    pub fn new(session: u64, clip: &DecodedClip, rate: f64) -> (Self, oneshot::Receiver<()>) {
        let (ended_tx, ended_rx) = oneshot::channel();
        let voice = Voice {
            session,
            samples: clip.samples.clone(),
            position: 0.0,
            rate,
            ended_tx: Some(ended_tx),
        };
        (voice, ended_rx)
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    fn frame_count(&self) -> usize {
        self.samples.len() / STEREO
    }

    fn frame_at(&self, index: usize) -> AudioFrame {
        let i = index * STEREO;
        match self.samples.get(i..i + STEREO) {
            Some(pair) => AudioFrame::from_stereo(pair[0], pair[1]),
            None => AudioFrame::zero(),
        }
    }

    /// Next output frame, or `None` once the clip is exhausted.
    fn next_frame(&mut self) -> Option<AudioFrame> {
        let index = self.position.floor() as usize;
        if index >= self.frame_count() {
            return None;
        }

        let t = (self.position - index as f64) as f32;
        let frame = if t > 0.0 && index + 1 < self.frame_count() {
            AudioFrame::lerp(self.frame_at(index), self.frame_at(index + 1), t)
        } else {
            self.frame_at(index)
        };

        self.position += self.rate;
        Some(frame)
    }

    /// Signal natural completion to the session
    fn finish(&mut self) {
        if let Some(tx) = self.ended_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Shared output sink: one voice slot plus master gain.
pub struct OutputSink {
    gain: Mutex<f32>,
    voice: Mutex<Option<Voice>>,
    sample_rate: AtomicU32,
}

impl OutputSink {
    pub fn new() -> Self {
        Self {
            gain: Mutex::new(DEFAULT_GAIN),
            voice: Mutex::new(None),
            sample_rate: AtomicU32::new(DEFAULT_SAMPLE_RATE),
        }
    }

    /// Replace whatever is sounding with `voice`.
    pub fn install(&self, voice: Voice) {
        debug!("Installing voice for session {}", voice.session());
        let previous = self.voice.lock().replace(voice);
        // Dropped outside the lock: the old session observes a closed channel
        drop(previous);
    }

    /// Silence the sink. Returns true if a voice was sounding.
    pub fn clear(&self) -> bool {
        let previous = self.voice.lock().take();
        previous.is_some()
    }

    /// Session id of the voice currently sounding
    pub fn active_session(&self) -> Option<u64> {
        self.voice.lock().as_ref().map(Voice::session)
    }

    /// Set master gain. Negative values clamp to 0; non-finite values reset to unity.
    pub fn set_gain(&self, gain: f32) -> f32 {
        let gain = if gain.is_finite() { gain.max(0.0) } else { DEFAULT_GAIN };
        *self.gain.lock() = gain;
        gain
    }

    pub fn gain(&self) -> f32 {
        *self.gain.lock()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Relaxed)
    }

    /// Called once the output device's rate is known
    pub fn set_sample_rate(&self, rate: u32) {
        if rate > 0 {
            self.sample_rate.store(rate, Ordering::Relaxed);
        }
    }

    /// Pull `frames` output frames, handing each one to `write`.
    ///
    /// Silence is emitted once the voice runs out; the voice is then removed
    /// and its session notified.
    pub fn render(&self, frames: usize, mut write: impl FnMut(AudioFrame)) {
        let gain = self.gain();
        let mut slot = self.voice.lock();

        for _ in 0..frames {
            let frame = match slot.as_mut().and_then(Voice::next_frame) {
                Some(mut frame) => {
                    frame.apply_volume(gain);
                    frame.clamp();
                    frame
                }
                None => {
                    if let Some(mut finished) = slot.take() {
                        finished.finish();
                    }
                    AudioFrame::zero()
                }
            };
            write(frame);
        }
    }
}

impl Default for OutputSink {
    fn default() -> Self {
        Self::new()
    }
}
