use crate::error::Result;
use std::path::PathBuf;
use tokio::sync::mpsc;

use super::synth::SignalSpec;

/// Block of mono float samples delivered by a capture backend
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for audio backend
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Capture sample rate
    pub target_sample_rate: u32,
    /// Callback block size in milliseconds (sets live chunk cadence)
    pub buffer_duration_ms: u64,
    /// Capacity of the capture handoff queue, in frames
    pub queue_capacity: usize,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000, // Peer expects 16kHz
            buffer_duration_ms: 100,   // 100ms blocks
            queue_capacity: 100,
        }
    }
}

impl AudioBackendConfig {
    /// Samples per capture callback block
    pub fn block_samples(&self) -> usize {
        super::chunk::chunk_samples(self.target_sample_rate, self.buffer_duration_ms)
    }
}

/// Audio capture backend trait
///
/// The backend owns the capture callback, which runs outside the session's
/// task and pushes copied blocks into the returned receiver without blocking.
#[async_trait::async_trait]
pub trait AudioBackend: Send {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Audio backend factory
pub struct AudioBackendFactory;

impl AudioBackendFactory {
    /// Create the platform microphone backend
    pub fn create(config: AudioBackendConfig) -> Result<Box<dyn AudioBackend>> {
        #[cfg(feature = "live-capture")]
        {
            let backend = super::capture::CpalBackend::new(config)?;
            Ok(Box::new(backend))
        }

        #[cfg(not(feature = "live-capture"))]
        {
            let _ = config;
            Err(crate::error::HarnessError::AudioCapture {
                message: "live capture requires building with the `live-capture` feature"
                    .to_string(),
            })
        }
    }
}

/// Where the streamed audio comes from. Resolved once at startup.
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// WAV file played back in real time
    File(PathBuf),
    /// Live microphone capture
    Live,
    /// Synthetic signal generator
    Synthetic(SignalSpec),
}
