use super::config::SessionConfig;
use super::pacer::Pacer;
use super::state::SessionState;
use super::stats::{HandshakeOutcome, SessionStats};
use crate::audio::{ChunkConfig, SignalSource};
use crate::control::{self, ControlMessage, MessageHandler, OutboundMessage};
use crate::error::{HarnessError, Result};
use crate::shutdown::StopHandle;
use crate::transport::{Received, Transport, WebSocketTransport};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Result of one non-blocking drain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Queue emptied; `n` messages were dispatched
    Drained(usize),
    /// Peer closed the connection after `n` messages
    Closed(usize),
}

/// One streaming conversation with the peer.
///
/// Drives `Connected → Configuring → Streaming → Draining → Closed` on a
/// single task: each iteration sends a chunk, drains whatever control
/// messages are already waiting, then sleeps out the pacing interval.
/// Sends and drains never overlap, so the transport needs no locking.
pub struct StreamingSession {
    /// Session configuration
    config: SessionConfig,

    /// Exclusively owned connection
    transport: Box<dyn Transport>,

    /// Current lifecycle state
    state: SessionState,

    /// Cooperative cancellation
    stop: StopHandle,

    /// Counters reported at the end of the run
    stats: SessionStats,
}

impl StreamingSession {
    /// Connect to the configured URL
    pub async fn connect(config: SessionConfig, stop: StopHandle) -> Result<Self> {
        info!("Creating streaming session: {}", config.session_id);

        let transport = WebSocketTransport::connect(&config.url).await?;
        Ok(Self::with_transport(Box::new(transport), config, stop))
    }

    /// Wrap an already-connected transport
    pub fn with_transport(
        transport: Box<dyn Transport>,
        config: SessionConfig,
        stop: StopHandle,
    ) -> Self {
        let mut stats = SessionStats::new(config.session_id.clone());
        stats.final_state = SessionState::Connected;

        Self {
            config,
            transport,
            state: SessionState::Connected,
            stop,
            stats,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run the whole session against `source`.
    ///
    /// Handshake failures close the connection and return the error. Once
    /// streaming has started, failures are logged and recorded in the stats
    /// and the session still sends `end`, drains and closes.
    pub async fn run(
        mut self,
        source: &mut SignalSource,
        handler: &mut dyn MessageHandler,
    ) -> Result<SessionStats> {
        if let Err(e) = self.config.validate() {
            error!("Invalid session config: {}", e);
            self.close().await;
            return Err(e);
        }

        if let Err(e) = self.configure(handler).await {
            error!("Handshake failed: {}", e);
            self.close().await;
            return Err(e);
        }

        let streamed = self.stream(source, handler).await;
        source.finish().await;

        if let Err(e) = streamed {
            error!("Streaming aborted: {}", e);
            if matches!(e, HarnessError::ConnectionClosedByPeer) {
                self.stats.peer_closed = true;
            }
            self.stats.stream_error = Some(e.to_string());
        }

        self.finish(handler).await;
        Ok(self.stats)
    }

    /// Send `config` and wait for the peer's answer.
    ///
    /// Any first message is accepted unless `strict_handshake` is set, in
    /// which case anything but `ready` is a protocol violation. A timeout is
    /// logged and the session proceeds.
    pub async fn configure(&mut self, handler: &mut dyn MessageHandler) -> Result<HandshakeOutcome> {
        self.transition(SessionState::Configuring);

        let config_msg = OutboundMessage::Config(self.config.config_message());
        info!(
            "Sending config: language={}, energy_threshold={}, min_silence_frames={}, token={}",
            self.config.language,
            self.config.energy_threshold,
            self.config.min_silence_frames,
            if self.config.token.is_some() { "set" } else { "none" }
        );
        self.transport.send_text(control::encode(&config_msg)?).await?;

        let outcome = match self.transport.try_receive(self.config.handshake_timeout).await? {
            Received::Text(text) => {
                self.stats.messages_received += 1;
                match control::decode(&text) {
                    Ok(ControlMessage::Ready(ready)) => {
                        info!(
                            "Peer ready (session {})",
                            ready.session_id.as_deref().unwrap_or("unknown")
                        );
                        self.stats.peer_session_id = ready.session_id.clone();
                        handler.on_ready(&ready);
                        HandshakeOutcome::Ready
                    }
                    Ok(other) => {
                        let kind = other.kind().to_string();
                        if self.config.strict_handshake {
                            return Err(HarnessError::ProtocolViolation {
                                message: format!("expected 'ready', got '{}'", kind),
                            });
                        }
                        warn!("Unexpected handshake response: {}", text);
                        self.account(&other);
                        control::dispatch(&other, handler);
                        HandshakeOutcome::Unexpected { kind }
                    }
                    Err(e) => {
                        if self.config.strict_handshake {
                            return Err(HarnessError::ProtocolViolation {
                                message: format!("undecodable handshake response: {}", e),
                            });
                        }
                        warn!("Unexpected handshake response ({}): {}", e, text);
                        self.stats.decode_errors += 1;
                        HandshakeOutcome::Unexpected {
                            kind: "invalid".to_string(),
                        }
                    }
                }
            }
            Received::Timeout => {
                if self.config.strict_handshake {
                    return Err(HarnessError::ProtocolViolation {
                        message: format!(
                            "no 'ready' within {:?}",
                            self.config.handshake_timeout
                        ),
                    });
                }
                warn!(
                    "No handshake response within {:?}, streaming anyway",
                    self.config.handshake_timeout
                );
                HandshakeOutcome::TimedOut
            }
            Received::Closed => {
                self.stats.peer_closed = true;
                return Err(HarnessError::ConnectionClosedByPeer);
            }
        };

        self.stats.handshake = outcome.clone();
        Ok(outcome)
    }

    /// Send, drain, pace until the source runs dry or a stop is requested
    pub async fn stream(
        &mut self,
        source: &mut SignalSource,
        handler: &mut dyn MessageHandler,
    ) -> Result<()> {
        self.transition(SessionState::Streaming);

        let framing = ChunkConfig::new(self.config.chunk_duration_ms, source.sample_rate());
        let pacer = if source.is_self_paced() {
            Pacer::passthrough(self.stop.clone())
        } else {
            Pacer::new(framing.interval(), self.stop.clone())
        };
        let n = framing.chunk_samples();
        if n == 0 {
            return Err(HarnessError::Config {
                key: "chunk_duration_ms".to_string(),
                message: format!(
                    "{}ms at {}Hz yields empty chunks",
                    self.config.chunk_duration_ms,
                    source.sample_rate()
                ),
            });
        }

        info!(
            "Streaming {} audio in {}ms chunks ({} samples at {}Hz)",
            source.name(),
            self.config.chunk_duration_ms,
            n,
            source.sample_rate()
        );

        loop {
            if !self.stop.is_running() {
                info!("Stop requested, ending stream");
                break;
            }

            let Some(chunk) = source.next_chunk(n).await else {
                break;
            };
            if chunk.is_empty() {
                continue;
            }
            // A live pop may have returned just as the stop landed
            if !self.stop.is_running() {
                info!("Stop requested, ending stream");
                break;
            }

            let sent_at = Instant::now();
            let payload = chunk.to_bytes();
            let bytes = payload.len();
            self.transport.send_binary(payload).await?;

            self.stats.chunks_sent += 1;
            self.stats.bytes_sent += bytes;
            self.stats.audio_secs_sent += chunk.duration_secs();
            debug!("Sent chunk {} ({} bytes)", self.stats.chunks_sent, bytes);

            if let DrainOutcome::Closed(_) = self.drain(handler).await? {
                return Err(HarnessError::ConnectionClosedByPeer);
            }

            if !pacer.wait(sent_at).await {
                info!("Stop requested, ending stream");
                break;
            }
        }

        info!(
            "Sent {} chunks ({:.1}s of audio)",
            self.stats.chunks_sent, self.stats.audio_secs_sent
        );
        Ok(())
    }

    /// Dispatch every message that is already waiting, without blocking
    pub async fn drain(&mut self, handler: &mut dyn MessageHandler) -> Result<DrainOutcome> {
        let mut dispatched = 0;
        loop {
            match self.transport.try_receive(self.config.drain_poll_timeout).await? {
                Received::Text(text) => {
                    self.handle_inbound(&text, handler);
                    dispatched += 1;
                }
                Received::Timeout => return Ok(DrainOutcome::Drained(dispatched)),
                Received::Closed => {
                    self.stats.peer_closed = true;
                    return Ok(DrainOutcome::Closed(dispatched));
                }
            }
        }
    }

    /// Send `end`, collect trailing results for the drain window, close.
    ///
    /// Never fails: every error on this path is logged and the connection
    /// is closed regardless.
    pub async fn finish(&mut self, handler: &mut dyn MessageHandler) {
        if self.state.is_terminal() {
            return;
        }
        self.transition(SessionState::Draining);

        if !self.stats.peer_closed {
            match control::encode(&OutboundMessage::End) {
                Ok(text) => match self.transport.send_text(text).await {
                    Ok(()) => {
                        info!("End of stream sent");
                        self.stats.end_sent = true;
                    }
                    Err(e) => warn!("Failed to send end: {}", e),
                },
                Err(e) => warn!("Failed to encode end: {}", e),
            }

            info!(
                "Waiting for final results ({:.1}s)...",
                self.config.drain_window.as_secs_f64()
            );
            let deadline = Instant::now() + self.config.drain_window;
            while Instant::now() < deadline {
                match self.drain(handler).await {
                    Ok(DrainOutcome::Closed(_)) => {
                        info!("Peer closed the connection");
                        break;
                    }
                    Ok(DrainOutcome::Drained(_)) => {}
                    Err(e) => {
                        warn!("Drain failed: {}", e);
                        break;
                    }
                }

                let remaining = deadline.saturating_duration_since(Instant::now());
                tokio::time::sleep(remaining.min(self.config.drain_poll_interval)).await;
            }
        }

        self.close().await;
    }

    /// Close the transport. Idempotent.
    pub async fn close(&mut self) {
        if self.state.is_terminal() {
            return;
        }

        if let Err(e) = self.transport.close().await {
            warn!("Error while closing connection: {}", e);
        }
        self.transition(SessionState::Closed);
        self.stats.touch();

        info!("Session {} closed", self.config.session_id);
    }

    fn handle_inbound(&mut self, text: &str, handler: &mut dyn MessageHandler) {
        self.stats.messages_received += 1;
        match control::handle_text(text, handler) {
            Some(msg) => self.account(&msg),
            None => self.stats.decode_errors += 1,
        }
    }

    fn account(&mut self, msg: &ControlMessage) {
        match msg {
            ControlMessage::Transcription(t) if t.is_final => self.stats.final_transcripts += 1,
            ControlMessage::Transcription(_) => self.stats.partial_transcripts += 1,
            ControlMessage::VadState(_) => self.stats.vad_updates += 1,
            ControlMessage::Error(_) => self.stats.server_errors += 1,
            ControlMessage::Ready(_) => debug!("Late ready message ignored"),
            ControlMessage::Unknown { .. } => self.stats.unknown_messages += 1,
        }
    }

    fn transition(&mut self, next: SessionState) {
        if !self.state.can_transition_to(next) {
            warn!("Unexpected state transition {} -> {}", self.state, next);
        }
        debug!("Session state: {} -> {}", self.state, next);
        self.state = next;
        self.stats.final_state = next;
    }
}
