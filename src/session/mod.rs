//! Streaming session management
//!
//! This module provides the `StreamingSession` abstraction that manages:
//! - The config/ready handshake
//! - Paced delivery of audio chunks
//! - Non-blocking draining of inbound control messages
//! - End-of-stream draining and close
//! - Session statistics and state tracking

mod config;
mod pacer;
mod session;
mod state;
mod stats;
mod transcript;

pub use config::SessionConfig;
pub use pacer::Pacer;
pub use session::{DrainOutcome, StreamingSession};
pub use state::SessionState;
pub use stats::{HandshakeOutcome, SessionStats, TranscriptSegment};
pub use transcript::TranscriptCollector;
