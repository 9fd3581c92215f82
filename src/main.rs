use anyhow::{Context, Result};
use clap::Parser;
use loqa_stream_harness::cli::Cli;
use loqa_stream_harness::{
    Config, SessionStats, SignalSource, StopHandle, StreamingSession, TranscriptCollector,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut cfg = Config::load(cli.config.as_deref())?;
    cli.apply(&mut cfg);
    cfg.validate()?;

    let descriptor = cli.audio_source()?;
    let session_config = cfg.session_config(cli.chunk_ms(&descriptor, &cfg));

    info!("Loqa Stream Harness v{}", env!("CARGO_PKG_VERSION"));
    info!("Peer: {}", session_config.url);

    let stop = StopHandle::new();
    let ctrl_c = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping...");
            ctrl_c.stop();
        }
    });

    let mut source = SignalSource::open(&descriptor, cfg.backend_config(), stop.clone())
        .await
        .context("Failed to open audio source")?;

    let session = match StreamingSession::connect(session_config, stop).await {
        Ok(session) => session,
        Err(e) => {
            source.finish().await;
            return Err(e).context("Failed to connect");
        }
    };

    let mut collector = TranscriptCollector::new();
    let stats = session
        .run(&mut source, &mut collector)
        .await
        .context("Session failed")?;

    print_summary(&stats, &collector);

    if let Some(reason) = &stats.stream_error {
        warn!("Stream ended early: {}", reason);
    }

    Ok(())
}

fn print_summary(stats: &SessionStats, collector: &TranscriptCollector) {
    println!();
    println!("Session {}", stats.session_id);
    if let Some(peer) = &stats.peer_session_id {
        println!("  Peer session:     {}", peer);
    }
    println!("  Handshake:        {:?}", stats.handshake);
    println!("  Duration:         {:.1}s", stats.duration_secs);
    println!(
        "  Audio sent:       {} chunks, {} bytes, {:.1}s",
        stats.chunks_sent, stats.bytes_sent, stats.audio_secs_sent
    );
    println!("  Messages:         {}", stats.messages_received);
    println!(
        "  Transcripts:      {} partial, {} final",
        stats.partial_transcripts, stats.final_transcripts
    );
    println!(
        "  VAD updates:      {} ({} speech onsets)",
        stats.vad_updates,
        collector.speech_onsets()
    );
    println!("  Server errors:    {}", stats.server_errors);
    println!("  Decode errors:    {}", stats.decode_errors);
    println!("  Final state:      {}", stats.final_state);

    let text = collector.final_text();
    if !text.is_empty() {
        println!();
        println!("Transcript:");
        println!("  {}", text);
    }
}
