//! Core audio data types
//!
//! Defines the decoded clip buffer and the stereo frame passed from the
//! output sink to the device callback.

use std::sync::Arc;

/// Output channel layout used throughout the pipeline (interleaved stereo)
pub const STEREO: usize = 2;

/// DecodedClip holds a whole sound clip in RAM, ready for playback.
///
/// **Format:**
/// - Samples are f32 (floating point -1.0 to 1.0)
/// - Stereo interleaved: [L, R, L, R, ...]
#[derive(Debug, Clone)]
pub struct DecodedClip {
    /// PCM audio samples (interleaved stereo), shared between loop restarts
    pub samples: Arc<Vec<f32>>,

    /// Sample rate of `samples`
    pub sample_rate: u32,
}

impl DecodedClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: Arc::new(samples),
            sample_rate,
        }
    }

    /// Number of stereo frames
    pub fn frame_count(&self) -> usize {
        self.samples.len() / STEREO
    }

    /// Get duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.frame_count() as u64 * 1000) / self.sample_rate as u64
    }
}

/// AudioFrame represents a single stereo sample (one frame of audio).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFrame {
    /// Left channel sample
    pub left: f32,

    /// Right channel sample
    pub right: f32,
}

impl AudioFrame {
    /// Create a silent frame (0.0, 0.0)
    pub fn zero() -> Self {
        AudioFrame { left: 0.0, right: 0.0 }
    }

    /// Create a frame from left and right samples
    pub fn from_stereo(left: f32, right: f32) -> Self {
        AudioFrame { left, right }
    }

    /// Linear interpolation between two frames (`t` in 0.0..=1.0)
    pub fn lerp(a: AudioFrame, b: AudioFrame, t: f32) -> Self {
        AudioFrame {
            left: a.left + (b.left - a.left) * t,
            right: a.right + (b.right - a.right) * t,
        }
    }

    /// Apply volume scaling to both channels
    pub fn apply_volume(&mut self, volume: f32) {
        self.left *= volume;
        self.right *= volume;
    }

    /// Clamp samples to valid range [-1.0, 1.0] to prevent clipping
    pub fn clamp(&mut self) {
        self.left = self.left.clamp(-1.0, 1.0);
        self.right = self.right.clamp(-1.0, 1.0);
    }

    /// Downmix to a single sample (for mono devices)
    pub fn mono(&self) -> f32 {
        (self.left + self.right) * 0.5
    }
}
