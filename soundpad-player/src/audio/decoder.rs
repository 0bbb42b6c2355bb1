//! Audio decoder using symphonia
//!
//! Decodes a complete in-memory sound asset (MP3 in practice, anything
//! symphonia is built with in general) to interleaved stereo f32.

use crate::audio::types::{DecodedClip, STEREO};
use crate::error::{Error, Result};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Whole-clip decoder.
pub struct ClipDecoder;

impl ClipDecoder {
    /// Decode an entire asset to stereo PCM at its native sample rate.
    ///
    /// `extension` is only a probe hint; the container is detected from
    /// the bytes themselves.
    ///
    /// # Errors
    /// - Unrecognized container or codec
    /// - No audio track, or the track yields no samples
    pub fn decode(bytes: Vec<u8>, extension: &str) -> Result<DecodedClip> {
        debug!("Decoding {} byte asset (hint: {})", bytes.len(), extension);

        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

        let mut hint = Hint::new();
        hint.with_extension(extension);

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| Error::Decode(format!("Failed to probe format: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::Decode("No audio track found".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| Error::Decode("Sample rate not found".to_string()))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| Error::Decode(format!("Failed to create decoder: {}", e)))?;

        let mut samples = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                Err(e) => {
                    warn!("Error reading packet: {}", e);
                    break;
                }
            };

            // Skip packets for other tracks
            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    buffer.copy_interleaved_ref(decoded);
                    append_as_stereo(buffer.samples(), spec.channels.count(), &mut samples);
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    // Corrupt frame: skip it and keep going
                    warn!("Decode error (skipping packet): {}", e);
                    continue;
                }
                Err(e) => return Err(Error::Decode(format!("Decode failed: {}", e))),
            }
        }

        if samples.is_empty() {
            return Err(Error::Decode("Asset contains no audio samples".to_string()));
        }

        let clip = DecodedClip::new(samples, sample_rate);
        debug!(
            "Decoded {} frames at {}Hz ({}ms)",
            clip.frame_count(),
            sample_rate,
            clip.duration_ms()
        );

        Ok(clip)
    }
}

/// Append interleaved samples with `channels` channels as interleaved stereo.
///
/// Mono is duplicated to both sides; channels beyond the first two are dropped.
fn append_as_stereo(interleaved: &[f32], channels: usize, output: &mut Vec<f32>) {
    match channels {
        0 => {}
        1 => {
            output.reserve(interleaved.len() * STEREO);
            for &sample in interleaved {
                output.push(sample);
                output.push(sample);
            }
        }
        _ => {
            output.reserve(interleaved.len() / channels * STEREO);
            for frame in interleaved.chunks_exact(channels) {
                output.push(frame[0]);
                output.push(frame[1]);
            }
        }
    }
}
