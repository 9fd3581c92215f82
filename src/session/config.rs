use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::control::ConfigMessage;
use crate::error::{HarnessError, Result};

/// Configuration for a streaming session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Local run identifier used in logs (e.g., "run-6f1c...")
    pub session_id: String,

    /// Peer URL; `wss://` enables TLS with relaxed verification
    pub url: String,

    /// Language code sent in `config`
    pub language: String,

    /// Energy threshold for the peer's voice activity detector
    pub energy_threshold: f32,

    /// Silent frames before the peer closes an utterance
    pub min_silence_frames: u32,

    /// Optional auth token sent in `config`
    pub token: Option<String>,

    /// Duration of each audio chunk
    pub chunk_duration_ms: u64,

    /// How long to wait for `ready` before proceeding anyway
    pub handshake_timeout: Duration,

    /// Receive timeout of a single non-blocking drain poll
    pub drain_poll_timeout: Duration,

    /// Wall-clock window for trailing results after `end`
    pub drain_window: Duration,

    /// Sleep between drains inside the trailing window
    pub drain_poll_interval: Duration,

    /// Reject a first message other than `ready`
    pub strict_handshake: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("run-{}", uuid::Uuid::new_v4()),
            url: "ws://localhost:9001".to_string(),
            language: "es".to_string(),
            energy_threshold: 0.02,
            min_silence_frames: 20,
            token: None,
            chunk_duration_ms: 100,
            handshake_timeout: Duration::from_secs(10),
            drain_poll_timeout: Duration::from_millis(1),
            drain_window: Duration::from_secs(3),
            drain_poll_interval: Duration::from_millis(100),
            strict_handshake: false,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_duration_ms == 0 {
            return Err(HarnessError::Config {
                key: "chunk_duration_ms".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// The `config` message announcing these settings
    pub fn config_message(&self) -> ConfigMessage {
        ConfigMessage {
            language: self.language.clone(),
            energy_threshold: self.energy_threshold,
            min_silence_frames: self.min_silence_frames,
            token: self.token.clone(),
        }
    }
}
