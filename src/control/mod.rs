//! Control protocol spoken over the text frames of the connection
//!
//! Outbound: `config`, `end`. Inbound: `ready`, `transcription`,
//! `vad_state`, `error`; anything else is ignored.

pub mod channel;
pub mod messages;

pub use channel::{decode, dispatch, encode, handle_text, MessageHandler, NullHandler};
pub use messages::{
    ConfigMessage, ControlMessage, ErrorMessage, OutboundMessage, ReadyConfig, ReadyMessage,
    TranscriptionMessage, VadStateMessage,
};
