//! Duplex message transport
//!
//! One persistent connection carrying binary audio frames out and text
//! control frames in both directions.

pub mod ws;

use std::time::Duration;

use crate::error::Result;

pub use ws::WebSocketTransport;

/// Outcome of a bounded receive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// A text frame
    Text(String),
    /// Nothing arrived within the timeout
    Timeout,
    /// The peer closed the connection (or it was already closed)
    Closed,
}

#[async_trait::async_trait]
pub trait Transport: Send {
    async fn send_binary(&mut self, payload: Vec<u8>) -> Result<()>;

    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Wait at most `timeout` for the next text frame
    async fn try_receive(&mut self, timeout: Duration) -> Result<Received>;

    /// Close the connection. Safe to call more than once.
    async fn close(&mut self) -> Result<()>;
}
