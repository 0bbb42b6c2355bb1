//! Audio pipeline: decode, resample, sink, and output backends

pub mod decoder;
pub mod null_output;
pub mod output;
pub mod resampler;
pub mod sink;
pub mod types;

pub use decoder::ClipDecoder;
pub use null_output::NullOutput;
pub use output::{AudioOutput, DeviceHandle};
pub use resampler::Resampler;
pub use sink::{OutputSink, Voice};
pub use types::{AudioFrame, DecodedClip};

use std::sync::Arc;
use tracing::{info, warn};

/// The running output backend. Dropping it stops output.
pub enum OutputDriver {
    Device(DeviceHandle),
    Headless(NullOutput),
}

impl OutputDriver {
    /// Start output for `sink`.
    ///
    /// Falls back to headless output when `headless` is set or no device
    /// can be opened; playback timing behaves the same either way.
    pub fn start(
        sink: Arc<OutputSink>,
        headless: bool,
        device_name: Option<String>,
        buffer_size: Option<u32>,
    ) -> Self {
        if headless {
            info!("Headless mode: audio output disabled");
            return OutputDriver::Headless(NullOutput::start(sink));
        }

        match DeviceHandle::spawn(Arc::clone(&sink), device_name, buffer_size) {
            Ok(handle) => {
                info!("Audio output running at {}Hz", handle.sample_rate());
                OutputDriver::Device(handle)
            }
            Err(e) => {
                warn!("Audio device unavailable ({}), continuing headless", e);
                OutputDriver::Headless(NullOutput::start(sink))
            }
        }
    }

    pub fn is_headless(&self) -> bool {
        matches!(self, OutputDriver::Headless(_))
    }
}
