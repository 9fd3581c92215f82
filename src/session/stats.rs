use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::SessionState;

/// How the config/ready exchange ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandshakeOutcome {
    /// Not attempted yet
    Pending,
    /// Peer answered `ready`
    Ready,
    /// Peer answered something else first (lenient mode)
    Unexpected { kind: String },
    /// No answer within the handshake timeout
    TimedOut,
}

/// Statistics about a streaming session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Local run identifier
    pub session_id: String,

    /// Identifier assigned by the peer in `ready`, if any
    pub peer_session_id: Option<String>,

    /// When the session started
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Last lifecycle state reached
    pub final_state: SessionState,

    pub handshake: HandshakeOutcome,

    /// Binary audio messages sent
    pub chunks_sent: usize,

    /// Audio payload bytes sent
    pub bytes_sent: usize,

    /// Seconds of audio sent
    pub audio_secs_sent: f64,

    /// Inbound text frames received (including undecodable ones)
    pub messages_received: usize,

    pub partial_transcripts: usize,

    pub final_transcripts: usize,

    pub vad_updates: usize,

    /// `error` messages reported by the peer
    pub server_errors: usize,

    /// Inbound frames dropped because they failed to decode
    pub decode_errors: usize,

    pub unknown_messages: usize,

    /// Whether `end` went out
    pub end_sent: bool,

    /// Whether the peer closed the connection before we did
    pub peer_closed: bool,

    /// Why streaming stopped early, if it did
    pub stream_error: Option<String>,
}

impl SessionStats {
    pub fn new(session_id: String) -> Self {
        Self {
            session_id,
            peer_session_id: None,
            started_at: Utc::now(),
            duration_secs: 0.0,
            final_state: SessionState::Disconnected,
            handshake: HandshakeOutcome::Pending,
            chunks_sent: 0,
            bytes_sent: 0,
            audio_secs_sent: 0.0,
            messages_received: 0,
            partial_transcripts: 0,
            final_transcripts: 0,
            vad_updates: 0,
            server_errors: 0,
            decode_errors: 0,
            unknown_messages: 0,
            end_sent: false,
            peer_closed: false,
            stream_error: None,
        }
    }

    /// Refresh `duration_secs` from `started_at`
    pub fn touch(&mut self) {
        let elapsed = Utc::now().signed_duration_since(self.started_at);
        self.duration_secs = elapsed.num_milliseconds() as f64 / 1000.0;
    }
}

/// A single transcript result from the peer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Transcribed text
    pub text: String,

    /// When this segment was received
    pub received_at: DateTime<Utc>,

    /// Peer timestamp in milliseconds since the epoch, if provided
    pub peer_timestamp_ms: Option<i64>,

    /// Whether this is a partial (interim) result
    pub partial: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats_are_zeroed() {
        let stats = SessionStats::new("run-1".to_string());
        assert_eq!(stats.chunks_sent, 0);
        assert_eq!(stats.final_state, SessionState::Disconnected);
        assert_eq!(stats.handshake, HandshakeOutcome::Pending);
        assert!(stats.stream_error.is_none());
    }

    #[test]
    fn test_stats_serialize() {
        let mut stats = SessionStats::new("run-1".to_string());
        stats.handshake = HandshakeOutcome::Unexpected {
            kind: "error".to_string(),
        };
        stats.final_state = SessionState::Closed;

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["final_state"], "closed");
        assert_eq!(json["handshake"]["unexpected"]["kind"], "error");
        assert_eq!(json["session_id"], "run-1");
    }
}
