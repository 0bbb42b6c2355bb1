//! Fixtures shared by unit tests

use crate::assets::AssetStore;
use crate::audio::{NullOutput, OutputSink};
use crate::catalog::{SoundCatalog, SOUNDS_DIR};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Sample rate used for fixtures; the sink is set to match so no resampling happens
pub const FIXTURE_RATE: u32 = 8000;

/// A 16-bit PCM WAV file holding a quiet 440Hz tone
pub fn wav_bytes(sample_rate: u32, channels: u16, duration_ms: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        let frames = sample_rate as u64 * duration_ms as u64 / 1000;
        for i in 0..frames {
            let t = i as f32 / sample_rate as f32;
            let sample = ((2.0 * std::f32::consts::PI * 440.0 * t).sin() * 8000.0) as i16;
            for _ in 0..channels {
                writer.write_sample(sample).unwrap();
            }
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Write `sounds/<letter>.wav` clips of the given durations under `root`
pub fn write_sounds(root: &Path, clips: &[(char, u32)]) {
    let dir = root.join(SOUNDS_DIR);
    std::fs::create_dir_all(&dir).unwrap();
    for &(letter, duration_ms) in clips {
        std::fs::write(
            dir.join(format!("{}.wav", letter)),
            wav_bytes(FIXTURE_RATE, 1, duration_ms),
        )
        .unwrap();
    }
}

/// Catalog using the `wav` extension
pub fn wav_catalog(names: &[(char, &str)]) -> SoundCatalog {
    let mut catalog = SoundCatalog::new("wav");
    for &(letter, name) in names {
        let id = crate::catalog::SoundId::parse(&letter.to_string()).unwrap();
        catalog.set_name(id, name);
    }
    catalog
}

pub fn directory_store(root: &Path) -> AssetStore {
    AssetStore::Directory(root.to_path_buf())
}

/// Sink at the fixture rate, drained in real time by a headless output
pub fn running_sink() -> (Arc<OutputSink>, NullOutput) {
    let sink = Arc::new(OutputSink::new());
    sink.set_sample_rate(FIXTURE_RATE);
    let output = NullOutput::start(Arc::clone(&sink));
    (sink, output)
}

/// Poll `condition` every 5ms until it holds or `timeout` passes
pub async fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
