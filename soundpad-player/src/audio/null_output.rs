//! Headless output
//!
//! Consumes frames from the sink in real time without a device, so clips
//! still take their natural duration to finish. Used when running with
//! `headless = true`, when no device can be opened, and in tests.

use crate::audio::sink::OutputSink;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::debug;

/// How often the headless clock pulls frames
const TICK: Duration = Duration::from_millis(10);

/// Real-time frame consumer with no audible output.
pub struct NullOutput {
    task: JoinHandle<()>,
}

impl NullOutput {
    /// Start consuming frames from `sink` at its current sample rate.
    pub fn start(sink: Arc<OutputSink>) -> Self {
        debug!("Starting headless output at {}Hz", sink.sample_rate());

        let task = tokio::spawn(async move {
            let mut ticker = interval(TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let started = Instant::now();
            let mut rendered: u64 = 0;

            loop {
                ticker.tick().await;

                let rate = sink.sample_rate() as u128;
                let due = (started.elapsed().as_micros() * rate / 1_000_000) as u64;
                if due > rendered {
                    sink.render((due - rendered) as usize, |_| {});
                    rendered = due;
                }
            }
        });

        Self { task }
    }
}

impl Drop for NullOutput {
    fn drop(&mut self) {
        self.task.abort();
    }
}
