//! Command-line interface for stream-harness
//!
//! Provides argument parsing using clap derive macros.

use clap::{ArgGroup, Parser};
use std::path::PathBuf;

use crate::audio::{AudioSource, SignalKind, SignalSpec};
use crate::config::Config;
use crate::error::Result;

/// Conformance and load-test client for streaming speech recognition peers
#[derive(Parser, Debug)]
#[command(name = "stream-harness", version)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["file", "mic", "generate"]),
))]
pub struct Cli {
    /// Stream a WAV file (16-bit PCM or 32-bit float)
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Stream live microphone audio until interrupted
    #[arg(long)]
    pub mic: bool,

    /// Stream a synthetic signal: silence, noise, tone or sweep
    #[arg(long, value_name = "TYPE")]
    pub generate: Option<String>,

    /// Length of the synthetic signal in seconds
    #[arg(long, default_value_t = 5.0)]
    pub duration: f64,

    /// Tone frequency in Hz
    #[arg(long, default_value_t = 440.0)]
    pub freq: f64,

    /// Seed for the noise generator
    #[arg(long)]
    pub seed: Option<u64>,

    /// Peer URL (ws:// or wss://)
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Auth token sent in the config message
    #[arg(long)]
    pub token: Option<String>,

    /// Language code sent in the config message
    #[arg(long, value_name = "LANG")]
    pub language: Option<String>,

    /// Energy threshold for the peer's voice activity detector
    #[arg(long)]
    pub energy_threshold: Option<f32>,

    /// Silent frames before the peer ends an utterance
    #[arg(long)]
    pub min_silence_frames: Option<u32>,

    /// Chunk duration in milliseconds (default: 500 for files, 100 otherwise)
    #[arg(long, value_name = "MS")]
    pub chunk_ms: Option<u64>,

    /// Fail unless the first reply to config is `ready`
    #[arg(long)]
    pub strict_handshake: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,
}

impl Cli {
    /// Resolve the selected audio source.
    ///
    /// Fails with `UnknownGeneratorType` for an unrecognized `--generate`.
    pub fn audio_source(&self) -> Result<AudioSource> {
        if let Some(path) = &self.file {
            return Ok(AudioSource::File(path.clone()));
        }
        if self.mic {
            return Ok(AudioSource::Live);
        }

        let kind: SignalKind = self.generate.as_deref().unwrap_or("silence").parse()?;
        let spec = SignalSpec::new(kind, self.duration)
            .with_frequency(self.freq)
            .with_seed(self.seed);
        Ok(AudioSource::Synthetic(spec))
    }

    /// Overlay command-line flags on the loaded configuration
    pub fn apply(&self, cfg: &mut Config) {
        if let Some(url) = &self.url {
            cfg.server.url = url.clone();
        }
        if let Some(token) = &self.token {
            cfg.server.token = Some(token.clone());
        }
        if let Some(language) = &self.language {
            cfg.session.language = language.clone();
        }
        if let Some(threshold) = self.energy_threshold {
            cfg.session.energy_threshold = threshold;
        }
        if let Some(frames) = self.min_silence_frames {
            cfg.session.min_silence_frames = frames;
        }
        if self.strict_handshake {
            cfg.session.strict_handshake = true;
        }
        if let Some(ms) = self.chunk_ms {
            cfg.audio.file_chunk_ms = ms;
            cfg.audio.stream_chunk_ms = ms;
        }
    }

    /// Chunk duration for `source` from the (overlaid) configuration
    pub fn chunk_ms(&self, source: &AudioSource, cfg: &Config) -> u64 {
        match source {
            AudioSource::File(_) => cfg.audio.file_chunk_ms,
            AudioSource::Live | AudioSource::Synthetic(_) => cfg.audio.stream_chunk_ms,
        }
    }
}
