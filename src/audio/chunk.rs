//! Fixed-duration framing of mono float audio.
//!
//! The wire payload of a chunk is exactly the sample bytes: little-endian
//! f32, no header, no sequence number. Ordering comes from send order alone.

use std::time::Duration;

use super::source::SampleCursor;

/// Chunk configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Duration of each chunk in milliseconds
    pub chunk_duration_ms: u64,
    /// Sample rate of the framed audio
    pub sample_rate: u32,
}

impl ChunkConfig {
    pub fn new(chunk_duration_ms: u64, sample_rate: u32) -> Self {
        Self {
            chunk_duration_ms,
            sample_rate,
        }
    }

    /// Samples per full chunk
    pub fn chunk_samples(&self) -> usize {
        chunk_samples(self.sample_rate, self.chunk_duration_ms)
    }

    /// Wall-clock interval between chunk sends
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.chunk_duration_ms)
    }
}

/// One slice of audio ready to be sent
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioChunk {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Audio duration covered by this chunk
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Serialize to the binary wire payload
    pub fn to_bytes(&self) -> Vec<u8> {
        encode_chunk(&self.samples)
    }
}

/// `round(sample_rate * chunk_ms / 1000)`
pub fn chunk_samples(sample_rate: u32, chunk_duration_ms: u64) -> usize {
    (sample_rate as f64 * chunk_duration_ms as f64 / 1000.0).round() as usize
}

/// Encode samples as raw little-endian f32 bytes
pub fn encode_chunk(samples: &[f32]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Decode a binary payload back into samples. Trailing bytes that do not
/// form a whole f32 are ignored.
pub fn decode_chunk(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Slice a sample sequence into wire payloads of `chunk_samples` each.
///
/// Uses the same cursor the streaming sources read through. The final
/// payload may be shorter; an empty tail is never produced.
pub fn frame_samples(samples: &[f32], chunk_duration_ms: u64, sample_rate: u32) -> Vec<Vec<u8>> {
    let n = chunk_samples(sample_rate, chunk_duration_ms);
    let mut cursor = SampleCursor::new(samples.to_vec(), sample_rate);
    std::iter::from_fn(|| cursor.next_chunk(n))
        .map(|chunk| chunk.to_bytes())
        .collect()
}
