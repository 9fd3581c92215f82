//! JSON control channel: encoding of outbound messages, decoding of inbound
//! ones, and dispatch to a [`MessageHandler`].

use serde_json::Value;
use tracing::{debug, warn};

use super::messages::{
    ControlMessage, ErrorMessage, OutboundMessage, ReadyMessage, TranscriptionMessage,
    VadStateMessage,
};
use crate::error::{HarnessError, Result};

/// Receives decoded inbound messages. Every method defaults to a no-op.
pub trait MessageHandler: Send {
    fn on_ready(&mut self, _msg: &ReadyMessage) {}

    fn on_transcription(&mut self, _msg: &TranscriptionMessage) {}

    fn on_vad_state(&mut self, _msg: &VadStateMessage) {}

    /// Peer-reported error; never terminates the session
    fn on_server_error(&mut self, _err: &HarnessError) {}

    fn on_unknown(&mut self, _kind: &str) {}
}

/// Handler that ignores everything
#[derive(Debug, Default)]
pub struct NullHandler;

impl MessageHandler for NullHandler {}

/// Serialize an outbound message to a text frame
pub fn encode(msg: &OutboundMessage) -> Result<String> {
    serde_json::to_string(msg).map_err(|e| HarnessError::ProtocolEncode {
        message: format!("failed to encode {:?}: {}", msg, e),
    })
}

/// Decode one inbound text frame.
///
/// Malformed JSON, a missing `type`, or missing required fields of a known
/// type are errors. Unknown types decode to [`ControlMessage::Unknown`].
pub fn decode(text: &str) -> Result<ControlMessage> {
    let value: Value = serde_json::from_str(text).map_err(|e| HarnessError::ProtocolDecode {
        message: format!("invalid JSON: {}", e),
    })?;

    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| HarnessError::ProtocolDecode {
            message: "missing 'type' field".to_string(),
        })?
        .to_string();

    if !ControlMessage::is_known_kind(&kind) {
        return Ok(ControlMessage::Unknown { kind });
    }

    serde_json::from_value(value).map_err(|e| HarnessError::ProtocolDecode {
        message: format!("invalid '{}' message: {}", kind, e),
    })
}

/// Route a decoded message to the matching handler method
pub fn dispatch(msg: &ControlMessage, handler: &mut dyn MessageHandler) {
    match msg {
        ControlMessage::Ready(ready) => handler.on_ready(ready),
        ControlMessage::Transcription(transcription) => handler.on_transcription(transcription),
        ControlMessage::VadState(vad) => handler.on_vad_state(vad),
        ControlMessage::Error(ErrorMessage { message, code }) => {
            handler.on_server_error(&HarnessError::ServerReported {
                message: message.clone(),
                code: code.clone(),
            })
        }
        ControlMessage::Unknown { kind } => {
            debug!("Ignoring control message of unknown type '{}'", kind);
            handler.on_unknown(kind)
        }
    }
}

/// Decode and dispatch one text frame.
///
/// Decode failures are logged and dropped; the decoded message is returned
/// so the caller can account for it.
pub fn handle_text(text: &str, handler: &mut dyn MessageHandler) -> Option<ControlMessage> {
    match decode(text) {
        Ok(msg) => {
            dispatch(&msg, handler);
            Some(msg)
        }
        Err(e) => {
            warn!("Dropping inbound message: {} ({})", e, truncate(text, 120));
            None
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::messages::ConfigMessage;

    #[derive(Default)]
    struct Recorder {
        ready: usize,
        transcripts: Vec<(String, bool)>,
        vad: Vec<bool>,
        errors: Vec<String>,
        unknown: Vec<String>,
    }

    impl MessageHandler for Recorder {
        fn on_ready(&mut self, _msg: &ReadyMessage) {
            self.ready += 1;
        }

        fn on_transcription(&mut self, msg: &TranscriptionMessage) {
            self.transcripts.push((msg.text.clone(), msg.is_final));
        }

        fn on_vad_state(&mut self, msg: &VadStateMessage) {
            self.vad.push(msg.is_speech);
        }

        fn on_server_error(&mut self, err: &HarnessError) {
            self.errors.push(err.to_string());
        }

        fn on_unknown(&mut self, kind: &str) {
            self.unknown.push(kind.to_string());
        }
    }

    #[test]
    fn test_encode_config_with_token() {
        let msg = OutboundMessage::Config(ConfigMessage {
            language: "es".to_string(),
            energy_threshold: 0.02,
            min_silence_frames: 20,
            token: Some("secret".to_string()),
        });

        let json: Value = serde_json::from_str(&encode(&msg).unwrap()).unwrap();
        assert_eq!(json["type"], "config");
        assert_eq!(json["language"], "es");
        assert!((json["energy_threshold"].as_f64().unwrap() - 0.02).abs() < 1e-6);
        assert_eq!(json["min_silence_frames"], 20);
        assert_eq!(json["token"], "secret");
    }

    #[test]
    fn test_encode_config_without_token_omits_field() {
        let msg = OutboundMessage::Config(ConfigMessage {
            language: "en".to_string(),
            energy_threshold: 0.05,
            min_silence_frames: 10,
            token: None,
        });

        let json: Value = serde_json::from_str(&encode(&msg).unwrap()).unwrap();
        assert!(json.get("token").is_none());
    }

    #[test]
    fn test_encode_end() {
        assert_eq!(encode(&OutboundMessage::End).unwrap(), r#"{"type":"end"}"#);
    }

    #[test]
    fn test_decode_ready_minimal_and_full() {
        assert_eq!(
            decode(r#"{"type":"ready"}"#).unwrap(),
            ControlMessage::Ready(ReadyMessage::default())
        );

        let msg = decode(
            r#"{"type":"ready","session_id":"session-1-42","config":{"language":"es","sample_rate":16000}}"#,
        )
        .unwrap();
        match msg {
            ControlMessage::Ready(ready) => {
                assert_eq!(ready.session_id.as_deref(), Some("session-1-42"));
                let config = ready.config.unwrap();
                assert_eq!(config.language.as_deref(), Some("es"));
                assert_eq!(config.sample_rate, Some(16000));
            }
            other => panic!("expected ready, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_transcription() {
        let msg = decode(r#"{"type":"transcription","text":"hola mundo","is_final":true,"timestamp":1730000000000}"#)
            .unwrap();
        assert_eq!(
            msg,
            ControlMessage::Transcription(TranscriptionMessage {
                text: "hola mundo".to_string(),
                is_final: true,
                timestamp: Some(1730000000000),
            })
        );
    }

    #[test]
    fn test_decode_transcription_missing_text_fails() {
        let err = decode(r#"{"type":"transcription","is_final":true}"#).unwrap_err();
        assert!(matches!(err, HarnessError::ProtocolDecode { .. }));
    }

    #[test]
    fn test_decode_vad_and_error() {
        assert_eq!(
            decode(r#"{"type":"vad_state","is_speech":true,"energy":0.3}"#).unwrap(),
            ControlMessage::VadState(VadStateMessage {
                is_speech: true,
                energy: 0.3
            })
        );
        assert_eq!(
            decode(r#"{"type":"error","message":"Invalid JSON","code":"PARSE_ERROR"}"#).unwrap(),
            ControlMessage::Error(ErrorMessage {
                message: "Invalid JSON".to_string(),
                code: Some("PARSE_ERROR".to_string()),
            })
        );
    }

    #[test]
    fn test_decode_unknown_type() {
        let msg = decode(r#"{"type":"stats","latency_ms":12}"#).unwrap();
        assert_eq!(msg.kind(), "stats");
        assert!(matches!(msg, ControlMessage::Unknown { .. }));
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(decode("{not json"), Err(HarnessError::ProtocolDecode { .. })));
        assert!(matches!(decode(r#"{"text":"no type"}"#), Err(HarnessError::ProtocolDecode { .. })));
        assert!(matches!(decode(r#"{"type":42}"#), Err(HarnessError::ProtocolDecode { .. })));
    }

    #[test]
    fn test_handle_text_dispatches_each_kind() {
        let mut recorder = Recorder::default();

        handle_text(r#"{"type":"ready"}"#, &mut recorder);
        handle_text(r#"{"type":"transcription","text":"uno","is_final":false}"#, &mut recorder);
        handle_text(r#"{"type":"transcription","text":"uno dos","is_final":true}"#, &mut recorder);
        handle_text(r#"{"type":"vad_state","is_speech":false,"energy":0.001}"#, &mut recorder);
        handle_text(r#"{"type":"error","message":"Session not configured"}"#, &mut recorder);
        handle_text(r#"{"type":"pong"}"#, &mut recorder);

        assert_eq!(recorder.ready, 1);
        assert_eq!(
            recorder.transcripts,
            vec![("uno".to_string(), false), ("uno dos".to_string(), true)]
        );
        assert_eq!(recorder.vad, vec![false]);
        assert_eq!(recorder.errors.len(), 1);
        assert!(recorder.errors[0].contains("Session not configured"));
        assert_eq!(recorder.unknown, vec!["pong".to_string()]);
    }

    #[test]
    fn test_handle_text_drops_malformed() {
        let mut recorder = Recorder::default();
        assert!(handle_text("garbage", &mut recorder).is_none());
        assert_eq!(recorder.ready, 0);
        assert!(recorder.transcripts.is_empty());
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("añoñ", 2), "añ");
        assert_eq!(truncate("ab", 10), "ab");
    }
}
