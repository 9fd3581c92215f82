use serde::{Deserialize, Serialize};

/// Session parameters sent to the peer before streaming
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMessage {
    pub language: String,
    pub energy_threshold: f32,
    pub min_silence_frames: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Messages the harness sends as text frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Config(ConfigMessage),
    End,
}

/// Settings echoed back by the peer in `ready`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadyConfig {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub sample_rate: Option<u32>,
}

/// Handshake acknowledgement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadyMessage {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub config: Option<ReadyConfig>,
}

/// Incremental or final recognition result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionMessage {
    pub text: String,
    #[serde(default)]
    pub is_final: bool,
    /// Milliseconds since the Unix epoch, peer clock
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// Voice activity report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VadStateMessage {
    pub is_speech: bool,
    #[serde(default)]
    pub energy: f32,
}

/// Error reported by the peer; the session continues
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

/// Inbound control message, tagged by its `type` field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    Ready(ReadyMessage),
    Transcription(TranscriptionMessage),
    VadState(VadStateMessage),
    Error(ErrorMessage),
    /// Any `type` the harness does not know
    #[serde(skip)]
    Unknown { kind: String },
}

impl ControlMessage {
    /// Wire name of the message type
    pub fn kind(&self) -> &str {
        match self {
            ControlMessage::Ready(_) => "ready",
            ControlMessage::Transcription(_) => "transcription",
            ControlMessage::VadState(_) => "vad_state",
            ControlMessage::Error(_) => "error",
            ControlMessage::Unknown { kind } => kind,
        }
    }

    pub fn is_known_kind(kind: &str) -> bool {
        matches!(kind, "ready" | "transcription" | "vad_state" | "error")
    }
}
