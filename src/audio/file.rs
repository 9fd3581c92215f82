use crate::error::{HarnessError, Result};
use hound::{SampleFormat, WavReader};
use std::path::Path;
use tracing::{info, warn};

use super::chunk::AudioChunk;
use super::source::SampleCursor;

/// Decoded WAV file, reduced to mono f32
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    /// Channel count of the container (samples hold channel 0 only)
    pub channels: u16,
    pub bits_per_sample: u16,
    pub samples: Vec<f32>,
}

impl AudioFile {
    /// Open and decode a WAV file.
    ///
    /// 16-bit integer samples are normalized by 32768, 32-bit float samples
    /// pass through. Multi-channel files keep only the first channel. A rate
    /// other than `expected_rate` is logged and otherwise ignored.
    pub fn open(path: impl AsRef<Path>, expected_rate: u32) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)?;
        let spec = reader.spec();

        info!(
            "Format: {} channel(s), {}Hz, {}-bit {:?}",
            spec.channels, spec.sample_rate, spec.bits_per_sample, spec.sample_format
        );

        if spec.sample_rate != expected_rate {
            warn!(
                "Expected {}Hz but file is {}Hz; sending without resampling",
                expected_rate, spec.sample_rate
            );
        }

        let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Int, 16) => reader
                .into_samples::<i16>()
                .map(|s| s.map(|s| s as f32 / 32768.0))
                .collect::<std::result::Result<Vec<_>, _>>()?,
            (SampleFormat::Float, 32) => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()?,
            (format, bits) => {
                return Err(HarnessError::UnsupportedFormat {
                    bits_per_sample: bits,
                    format: format!("{:?}", format),
                })
            }
        };

        let samples = first_channel(&interleaved, spec.channels);
        let duration_seconds = samples.len() as f64 / spec.sample_rate.max(1) as f64;

        info!(
            "Audio file loaded: {:.1}s, {} mono samples",
            duration_seconds,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            bits_per_sample: spec.bits_per_sample,
            samples,
        })
    }
}

/// Keep channel 0 of interleaved audio (no averaging)
pub fn first_channel(interleaved: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved.iter().step_by(channels as usize).copied().collect()
}

/// WAV file served in chunks at its native rate
pub struct FileSource {
    cursor: SampleCursor,
    file: AudioFile,
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>, expected_rate: u32) -> Result<Self> {
        let mut file = AudioFile::open(path, expected_rate)?;
        let samples = std::mem::take(&mut file.samples);
        let cursor = SampleCursor::new(samples, file.sample_rate);
        Ok(Self { cursor, file })
    }

    /// Container metadata (samples already moved into the cursor)
    pub fn file(&self) -> &AudioFile {
        &self.file
    }

    pub fn sample_rate(&self) -> u32 {
        self.cursor.sample_rate()
    }

    pub fn next_chunk(&mut self, n: usize) -> Option<AudioChunk> {
        self.cursor.next_chunk(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_channel_mono_passthrough() {
        assert_eq!(first_channel(&[0.1, 0.2, 0.3], 1), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_first_channel_stereo_drops_right() {
        let interleaved = [0.1, 0.9, 0.2, 0.8, 0.3, 0.7];
        assert_eq!(first_channel(&interleaved, 2), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_first_channel_quad() {
        let interleaved = [1.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0];
        assert_eq!(first_channel(&interleaved, 4), vec![1.0, 2.0]);
    }
}
