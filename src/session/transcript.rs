use chrono::Utc;
use tracing::{debug, error, info};

use super::stats::TranscriptSegment;
use crate::control::{MessageHandler, ReadyMessage, TranscriptionMessage, VadStateMessage};
use crate::error::HarnessError;

/// Default message handler: logs results as they arrive and keeps them in
/// memory for the end-of-run summary.
///
/// Partial and final results are kept as delivered; nothing is merged.
#[derive(Debug, Default)]
pub struct TranscriptCollector {
    segments: Vec<TranscriptSegment>,
    server_errors: Vec<String>,
    speaking: bool,
    speech_onsets: usize,
}

impl TranscriptCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[TranscriptSegment] {
        &self.segments
    }

    pub fn server_errors(&self) -> &[String] {
        &self.server_errors
    }

    /// Number of silence→speech transitions reported by the peer
    pub fn speech_onsets(&self) -> usize {
        self.speech_onsets
    }

    /// Final results joined with spaces
    pub fn final_text(&self) -> String {
        self.segments
            .iter()
            .filter(|s| !s.partial)
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl MessageHandler for TranscriptCollector {
    fn on_ready(&mut self, msg: &ReadyMessage) {
        debug!("Peer ready: {:?}", msg);
    }

    fn on_transcription(&mut self, msg: &TranscriptionMessage) {
        if msg.is_final {
            info!("[FINAL]   {}", msg.text);
        } else {
            info!("[PARTIAL] {}", msg.text);
        }

        self.segments.push(TranscriptSegment {
            text: msg.text.clone(),
            received_at: Utc::now(),
            peer_timestamp_ms: msg.timestamp,
            partial: !msg.is_final,
        });
    }

    fn on_vad_state(&mut self, msg: &VadStateMessage) {
        if msg.is_speech && !self.speaking {
            self.speech_onsets += 1;
        }
        self.speaking = msg.is_speech;
        debug!("VAD: speech={} energy={:.4}", msg.is_speech, msg.energy);
    }

    fn on_server_error(&mut self, err: &HarnessError) {
        error!("{}", err);
        self.server_errors.push(err.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::handle_text;

    #[test]
    fn test_collects_partial_and_final() {
        let mut collector = TranscriptCollector::new();
        handle_text(r#"{"type":"transcription","text":"hola","is_final":false}"#, &mut collector);
        handle_text(r#"{"type":"transcription","text":"hola mundo","is_final":true}"#, &mut collector);
        handle_text(r#"{"type":"transcription","text":" adiós ","is_final":true}"#, &mut collector);

        assert_eq!(collector.segments().len(), 3);
        assert!(collector.segments()[0].partial);
        assert_eq!(collector.final_text(), "hola mundo adiós");
    }

    #[test]
    fn test_counts_speech_onsets() {
        let mut collector = TranscriptCollector::new();
        for speech in [false, true, true, false, true] {
            let text = format!(r#"{{"type":"vad_state","is_speech":{},"energy":0.1}}"#, speech);
            handle_text(&text, &mut collector);
        }
        assert_eq!(collector.speech_onsets(), 2);
    }

    #[test]
    fn test_records_server_errors() {
        let mut collector = TranscriptCollector::new();
        handle_text(r#"{"type":"error","message":"Unknown message type: foo","code":"UNKNOWN_TYPE"}"#, &mut collector);
        assert_eq!(collector.server_errors().len(), 1);
        assert!(collector.server_errors()[0].contains("Unknown message type"));
    }
}
