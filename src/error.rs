//! Error types for the stream harness.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    // Transport errors
    #[error("Failed to connect to {url}: {message}")]
    Connection { url: String, message: String },

    #[error("Connection closed by peer")]
    ConnectionClosedByPeer,

    #[error("Transport error: {message}")]
    Transport { message: String },

    // Audio source errors
    #[error("Unsupported audio format: {bits_per_sample}-bit {format}")]
    UnsupportedFormat { bits_per_sample: u16, format: String },

    #[error("Unknown generator type: {name} (expected silence, noise, tone or sweep)")]
    UnknownGeneratorType { name: String },

    #[error("Audio file error: {message}")]
    AudioFile { message: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    // Control protocol errors
    #[error("Failed to decode control message: {message}")]
    ProtocolDecode { message: String },

    #[error("Failed to encode control message: {message}")]
    ProtocolEncode { message: String },

    #[error("Protocol violation: {message}")]
    ProtocolViolation { message: String },

    #[error("Server reported error: {message}")]
    ServerReported { message: String, code: Option<String> },

    // Configuration errors
    #[error("Invalid configuration value for {key}: {message}")]
    Config { key: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for HarnessError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => Self::ConnectionClosedByPeer,
            other => Self::Transport {
                message: other.to_string(),
            },
        }
    }
}

impl From<hound::Error> for HarnessError {
    fn from(err: hound::Error) -> Self {
        Self::AudioFile {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;

impl HarnessError {
    /// Errors that abort a run before any audio is sent.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::UnsupportedFormat { .. }
                | Self::UnknownGeneratorType { .. }
                | Self::AudioFile { .. }
                | Self::AudioCapture { .. }
                | Self::ProtocolViolation { .. }
                | Self::Config { .. }
        )
    }
}
