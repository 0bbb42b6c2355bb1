//! WAV fixture generation

use std::io::Cursor;
use std::path::Path;

/// Fixture sample rate; test servers run their sink at this rate
pub const FIXTURE_RATE: u32 = 8000;

/// Mono 16-bit PCM WAV of a quiet 440Hz tone
pub fn wav_bytes(duration_ms: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: FIXTURE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
        let frames = FIXTURE_RATE as u64 * duration_ms as u64 / 1000;
        for i in 0..frames {
            let t = i as f32 / FIXTURE_RATE as f32;
            let sample = ((2.0 * std::f32::consts::PI * 440.0 * t).sin() * 8000.0) as i16;
            writer.write_sample(sample).expect("write sample");
        }
        writer.finalize().expect("finalize wav");
    }
    cursor.into_inner()
}

/// Write `sounds/<letter>.wav` for each `(letter, duration_ms)`
pub fn write_sounds(root: &Path, clips: &[(char, u32)]) {
    let dir = root.join("sounds");
    std::fs::create_dir_all(&dir).expect("create sounds dir");
    for &(letter, duration_ms) in clips {
        std::fs::write(dir.join(format!("{}.wav", letter)), wav_bytes(duration_ms))
            .expect("write clip");
    }
}
