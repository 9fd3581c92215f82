use std::path::Path;
use tracing::info;

use super::backend::{AudioBackendConfig, AudioBackendFactory, AudioSource};
use super::chunk::AudioChunk;
use super::file::FileSource;
use super::live::LiveSource;
use super::synth::SyntheticSource;
use crate::error::{HarnessError, Result};
use crate::shutdown::StopHandle;

/// In-memory sample buffer read front to back in chunks
#[derive(Debug)]
pub struct SampleCursor {
    samples: Vec<f32>,
    position: usize,
    sample_rate: u32,
}

impl SampleCursor {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            position: 0,
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn remaining(&self) -> usize {
        self.samples.len() - self.position
    }

    pub fn next_chunk(&mut self, n: usize) -> Option<AudioChunk> {
        if n == 0 || self.position >= self.samples.len() {
            return None;
        }

        let end = (self.position + n).min(self.samples.len());
        let chunk = AudioChunk::new(self.samples[self.position..end].to_vec(), self.sample_rate);
        self.position = end;
        Some(chunk)
    }
}

/// Producer of mono f32 audio, independent of where it comes from
pub enum SignalSource {
    File(FileSource),
    Synthetic(SyntheticSource),
    Live(LiveSource),
}

impl SignalSource {
    /// Resolve a source descriptor into a ready-to-read producer.
    ///
    /// Fails before any audio is sent if the file is missing or in an
    /// unsupported format, or if live capture is unavailable.
    pub async fn open(
        descriptor: &AudioSource,
        backend_config: AudioBackendConfig,
        stop: StopHandle,
    ) -> Result<Self> {
        let sample_rate = backend_config.target_sample_rate;

        match descriptor {
            AudioSource::File(path) => {
                ensure_exists(path)?;
                Ok(SignalSource::File(FileSource::open(path, sample_rate)?))
            }
            AudioSource::Synthetic(spec) => Ok(SignalSource::Synthetic(SyntheticSource::new(
                spec.clone(),
                sample_rate,
            ))),
            AudioSource::Live => {
                let backend = AudioBackendFactory::create(backend_config)?;
                let source = LiveSource::from_backend(backend, sample_rate, stop).await?;
                Ok(SignalSource::Live(source))
            }
        }
    }

    /// Next chunk of up to `n` samples; `None` at end of stream.
    ///
    /// Live sources yield whatever block the capture callback delivered.
    pub async fn next_chunk(&mut self, n: usize) -> Option<AudioChunk> {
        match self {
            SignalSource::File(source) => source.next_chunk(n),
            SignalSource::Synthetic(source) => source.next_chunk(n),
            SignalSource::Live(source) => source.next_chunk().await,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        match self {
            SignalSource::File(source) => source.sample_rate(),
            SignalSource::Synthetic(source) => source.sample_rate(),
            SignalSource::Live(source) => source.sample_rate(),
        }
    }

    /// Live capture paces itself
    pub fn is_self_paced(&self) -> bool {
        matches!(self, SignalSource::Live(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            SignalSource::File(_) => "file",
            SignalSource::Synthetic(_) => "synthetic",
            SignalSource::Live(_) => "live",
        }
    }

    /// Release capture resources
    pub async fn finish(&mut self) {
        if let SignalSource::Live(source) = self {
            source.shutdown().await;
        }
        info!("Audio source ({}) finished", self.name());
    }
}

fn ensure_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(HarnessError::AudioFile {
            message: format!("file not found: {}", path.display()),
        })
    }
}
