use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::audio::AudioBackendConfig;
use crate::session::SessionConfig;

/// Default config file, looked up with any supported extension
pub const DEFAULT_CONFIG_PATH: &str = "config/stream-harness";

/// Environment prefix; `HARNESS__SESSION__LANGUAGE=en` overrides `session.language`
pub const ENV_PREFIX: &str = "HARNESS";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub session: SessionSettings,
    pub audio: AudioConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub url: String,
    pub token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:9001".to_string(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub language: String,
    pub energy_threshold: f32,
    pub min_silence_frames: u32,
    pub handshake_timeout_secs: u64,
    pub drain_window_secs: u64,
    pub drain_poll_interval_ms: u64,
    pub strict_handshake: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            language: "es".to_string(),
            energy_threshold: 0.02,
            min_silence_frames: 20,
            handshake_timeout_secs: 10,
            drain_window_secs: 3,
            drain_poll_interval_ms: 100,
            strict_handshake: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub file_chunk_ms: u64,
    pub stream_chunk_ms: u64,
    pub live_queue_capacity: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            file_chunk_ms: 500,
            stream_chunk_ms: 100,
            live_queue_capacity: 100,
        }
    }
}

impl Config {
    /// Load from `path` (or the default location) overlaid by `HARNESS__*`
    /// environment variables.
    ///
    /// An explicit path must exist; the default file is optional.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let file = match path {
            Some(p) => config::File::with_name(p).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_PATH).required(false),
        };

        let settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| {
                format!("Failed to load config from {}", path.unwrap_or(DEFAULT_CONFIG_PATH))
            })?;

        let cfg: Config = settings
            .try_deserialize()
            .context("Invalid configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.server.url.starts_with("ws://") || self.server.url.starts_with("wss://")) {
            anyhow::bail!("server.url must start with ws:// or wss:// (got {})", self.server.url);
        }
        if self.audio.sample_rate == 0 {
            anyhow::bail!("audio.sample_rate must be positive");
        }
        if self.audio.file_chunk_ms == 0 || self.audio.stream_chunk_ms == 0 {
            anyhow::bail!("audio chunk durations must be positive");
        }
        if self.audio.live_queue_capacity == 0 {
            anyhow::bail!("audio.live_queue_capacity must be positive");
        }
        Ok(())
    }

    /// Session settings for one run with the given chunk duration
    pub fn session_config(&self, chunk_duration_ms: u64) -> SessionConfig {
        SessionConfig {
            url: self.server.url.clone(),
            token: self.server.token.clone(),
            language: self.session.language.clone(),
            energy_threshold: self.session.energy_threshold,
            min_silence_frames: self.session.min_silence_frames,
            chunk_duration_ms,
            handshake_timeout: Duration::from_secs(self.session.handshake_timeout_secs),
            drain_window: Duration::from_secs(self.session.drain_window_secs),
            drain_poll_interval: Duration::from_millis(self.session.drain_poll_interval_ms),
            strict_handshake: self.session.strict_handshake,
            ..SessionConfig::default()
        }
    }

    pub fn backend_config(&self) -> AudioBackendConfig {
        AudioBackendConfig {
            target_sample_rate: self.audio.sample_rate,
            buffer_duration_ms: self.audio.stream_chunk_ms,
            queue_capacity: self.audio.live_queue_capacity,
        }
    }
}
