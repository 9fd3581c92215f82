pub mod audio;
pub mod cli;
pub mod config;
pub mod control;
pub mod error;
pub mod session;
pub mod shutdown;
pub mod transport;

pub use audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioChunk, AudioFile, AudioFrame,
    AudioSource, SignalKind, SignalSource, SignalSpec,
};
pub use config::Config;
pub use control::{ControlMessage, MessageHandler, NullHandler, OutboundMessage};
pub use error::{HarnessError, Result};
pub use session::{
    HandshakeOutcome, SessionConfig, SessionState, SessionStats, StreamingSession,
    TranscriptCollector, TranscriptSegment,
};
pub use shutdown::StopHandle;
pub use transport::{Received, Transport, WebSocketTransport};
