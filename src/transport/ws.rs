use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async_tls_with_config, Connector, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::{Received, Transport};
use crate::error::{HarnessError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// WebSocket connection to the peer
pub struct WebSocketTransport {
    stream: WsStream,
    url: String,
    /// Peer closed or we closed; no more traffic either way
    closed: bool,
    /// Our close frame (or the reply to the peer's) has been flushed
    close_sent: bool,
}

impl WebSocketTransport {
    /// Connect to `url`.
    ///
    /// `wss://` URLs are connected with certificate and hostname checks
    /// disabled so the harness can reach peers using self-signed certs.
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to {}", url);

        let connection_error = |message: String| HarnessError::Connection {
            url: url.to_string(),
            message,
        };

        let connector = if is_secure(url) {
            warn!("TLS certificate verification is disabled for {}", url);
            Some(Connector::NativeTls(relaxed_tls_connector().map_err(connection_error)?))
        } else {
            None
        };

        let (stream, response) = tokio::time::timeout(
            CONNECT_TIMEOUT,
            connect_async_tls_with_config(url, None, false, connector),
        )
        .await
        .map_err(|_| connection_error(format!("timed out after {:?}", CONNECT_TIMEOUT)))?
        .map_err(|e| connection_error(e.to_string()))?;

        info!("Connected (HTTP {})", response.status());

        Ok(Self {
            stream,
            url: url.to_string(),
            closed: false,
            close_sent: false,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send the close reply tungstenite queued when the peer's close frame
    /// was read. The connection is finished either way.
    async fn ack_peer_close(&mut self) {
        self.close_sent = true;
        match self.stream.flush().await {
            Ok(()) => debug!("Close reply sent"),
            Err(e) if is_closed_error(&e) => {}
            Err(e) => warn!("Failed to answer peer close: {}", e),
        }
    }
}

/// `wss://` selects TLS
pub fn is_secure(url: &str) -> bool {
    url.trim_start().to_ascii_lowercase().starts_with("wss://")
}

fn relaxed_tls_connector() -> std::result::Result<native_tls::TlsConnector, String> {
    native_tls::TlsConnector::builder()
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .build()
        .map_err(|e| format!("failed to build TLS connector: {}", e))
}

fn is_closed_error(err: &tungstenite::Error) -> bool {
    matches!(
        err,
        tungstenite::Error::ConnectionClosed
            | tungstenite::Error::AlreadyClosed
            | tungstenite::Error::Protocol(
                tungstenite::error::ProtocolError::ResetWithoutClosingHandshake
            )
    )
}

#[async_trait::async_trait]
impl Transport for WebSocketTransport {
    async fn send_binary(&mut self, payload: Vec<u8>) -> Result<()> {
        if self.closed {
            return Err(HarnessError::ConnectionClosedByPeer);
        }
        self.stream.send(Message::Binary(payload)).await?;
        Ok(())
    }

    async fn send_text(&mut self, text: String) -> Result<()> {
        if self.closed {
            return Err(HarnessError::ConnectionClosedByPeer);
        }
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn try_receive(&mut self, timeout: Duration) -> Result<Received> {
        if self.closed {
            return Ok(Received::Closed);
        }

        let deadline = Instant::now() + timeout;
        loop {
            let next = match tokio::time::timeout_at(deadline, self.stream.next()).await {
                Err(_) => return Ok(Received::Timeout),
                Ok(next) => next,
            };

            match next {
                None => {
                    self.closed = true;
                    self.close_sent = true;
                    return Ok(Received::Closed);
                }
                Some(Err(e)) if is_closed_error(&e) => {
                    self.closed = true;
                    self.close_sent = true;
                    return Ok(Received::Closed);
                }
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(Message::Text(text))) => return Ok(Received::Text(text)),
                Some(Ok(Message::Close(frame))) => {
                    debug!("Peer sent close frame: {:?}", frame);
                    self.closed = true;
                    self.ack_peer_close().await;
                    return Ok(Received::Closed);
                }
                Some(Ok(Message::Binary(data))) => {
                    debug!("Ignoring {} byte binary frame from peer", data.len());
                }
                Some(Ok(_)) => {
                    // Ping/pong are answered by tungstenite
                }
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.close_sent {
            return Ok(());
        }
        self.closed = true;
        self.close_sent = true;

        match self.stream.close(None).await {
            Ok(()) => Ok(()),
            Err(e) if is_closed_error(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_secure() {
        assert!(is_secure("wss://example.com:9001"));
        assert!(is_secure("WSS://example.com"));
        assert!(!is_secure("ws://localhost:9001"));
        assert!(!is_secure("http://localhost"));
    }

    #[test]
    fn test_relaxed_connector_builds() {
        assert!(relaxed_tls_connector().is_ok());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = WebSocketTransport::connect(&format!("ws://{}", addr)).await;
        assert!(matches!(result, Err(HarnessError::Connection { .. })));
    }

    #[tokio::test]
    async fn test_peer_close_is_acknowledged() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let peer = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.close(None).await.unwrap();

            // The client's reply completes the closing handshake
            format!("{:?}", ws.next().await)
        });

        let mut transport = WebSocketTransport::connect(&format!("ws://{}", addr))
            .await
            .unwrap();
        let mut received = Received::Timeout;
        for _ in 0..50 {
            received = transport.try_receive(Duration::from_millis(100)).await.unwrap();
            if received == Received::Closed {
                break;
            }
        }
        assert_eq!(received, Received::Closed);
        assert!(transport.close().await.is_ok());
        // Idempotent
        assert!(transport.close().await.is_ok());
        assert_eq!(transport.try_receive(Duration::from_millis(1)).await.unwrap(), Received::Closed);

        assert_eq!(peer.await.unwrap(), "Some(Ok(Close(None)))");
    }
}
