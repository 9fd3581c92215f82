// Live capture handoff
//
// The capture callback runs on the audio driver's thread. It copies each
// delivered block and pushes it with a non-blocking `try_send`; the session
// task pops with a blocking `recv`. Cadence comes from the callback itself,
// so live chunks are not re-paced.

use std::time::Instant;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

use super::backend::{AudioBackend, AudioFrame};
use super::chunk::AudioChunk;
use crate::error::Result;
use crate::shutdown::StopHandle;

/// Producer side of the handoff queue, owned by the capture callback
#[derive(Debug, Clone)]
pub struct LiveCapture {
    tx: mpsc::Sender<AudioFrame>,
    sample_rate: u32,
    started: Instant,
}

impl LiveCapture {
    /// Create a producer and the receiving end of its queue
    pub fn channel(capacity: usize, sample_rate: u32) -> (Self, mpsc::Receiver<AudioFrame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let capture = Self {
            tx,
            sample_rate,
            started: Instant::now(),
        };
        (capture, rx)
    }

    /// Copy `block` into the queue without blocking.
    ///
    /// Returns false when the block was dropped (queue full or consumer gone).
    pub fn push(&self, block: &[f32]) -> bool {
        if block.is_empty() {
            return true;
        }

        let frame = AudioFrame {
            samples: block.to_vec(),
            sample_rate: self.sample_rate,
            timestamp_ms: self.started.elapsed().as_millis() as u64,
        };

        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(frame)) => {
                warn!(
                    "Capture queue full, dropping {} samples at {}ms",
                    frame.samples.len(),
                    frame.timestamp_ms
                );
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Consumer side: yields captured blocks as chunks
pub struct LiveSource {
    rx: mpsc::Receiver<AudioFrame>,
    stop: StopHandle,
    backend: Option<Box<dyn AudioBackend>>,
    sample_rate: u32,
    frames_received: u64,
}

impl LiveSource {
    /// Create a handoff queue not tied to any backend
    pub fn channel(capacity: usize, sample_rate: u32, stop: StopHandle) -> (LiveCapture, Self) {
        let (capture, rx) = LiveCapture::channel(capacity, sample_rate);
        let source = Self {
            rx,
            stop,
            backend: None,
            sample_rate,
            frames_received: 0,
        };
        (capture, source)
    }

    /// Start `backend` and consume the frames it produces
    pub async fn from_backend(
        mut backend: Box<dyn AudioBackend>,
        sample_rate: u32,
        stop: StopHandle,
    ) -> Result<Self> {
        info!("Starting live capture via {}", backend.name());
        let rx = backend.start().await?;

        Ok(Self {
            rx,
            stop,
            backend: Some(backend),
            sample_rate,
            frames_received: 0,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Next captured block.
    ///
    /// Blocks on the queue; returns `None` as soon as a stop is requested or
    /// the producer side has gone away.
    pub async fn next_chunk(&mut self) -> Option<AudioChunk> {
        if !self.stop.is_running() {
            debug!("Live source stopped after {} frames", self.frames_received);
            return None;
        }

        tokio::select! {
            frame = self.rx.recv() => match frame {
                Some(frame) => {
                    self.frames_received += 1;
                    Some(AudioChunk::new(frame.samples, frame.sample_rate))
                }
                None => {
                    info!("Capture stream closed");
                    None
                }
            },
            _ = self.stop.stopped() => {
                debug!("Live source stopped after {} frames", self.frames_received);
                None
            }
        }
    }

    /// Stop the capture backend, if any
    pub async fn shutdown(&mut self) {
        self.rx.close();
        if let Some(mut backend) = self.backend.take() {
            if backend.is_capturing() {
                if let Err(e) = backend.stop().await {
                    error!("Failed to stop {}: {}", backend.name(), e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_push_copies_and_pops_in_order() {
        let (capture, mut source) = LiveSource::channel(8, 16000, StopHandle::new());

        let mut buffer = vec![0.1f32; 4];
        assert!(capture.push(&buffer));
        // Producer reuses its buffer
        buffer.iter_mut().for_each(|s| *s = 0.9);
        assert!(capture.push(&buffer));

        let first = source.next_chunk().await.unwrap();
        let second = source.next_chunk().await.unwrap();
        assert_eq!(first.samples, vec![0.1; 4]);
        assert_eq!(second.samples, vec![0.9; 4]);
        assert_eq!(first.sample_rate, 16000);
    }

    #[tokio::test]
    async fn test_push_never_blocks_when_full() {
        let (capture, _source) = LiveSource::channel(1, 16000, StopHandle::new());
        assert!(capture.push(&[0.0; 10]));
        assert!(!capture.push(&[0.0; 10]));
    }

    #[tokio::test]
    async fn test_producer_drop_ends_stream() {
        let (capture, mut source) = LiveSource::channel(4, 16000, StopHandle::new());
        capture.push(&[0.5; 2]);
        drop(capture);

        assert!(source.next_chunk().await.is_some());
        assert!(source.next_chunk().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_flag_ends_blocked_pop() {
        let stop = StopHandle::new();
        let (_capture, mut source) = LiveSource::channel(4, 16000, stop.clone());

        let stopper = stop.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            stopper.stop();
        });

        let started = tokio::time::Instant::now();
        let result = tokio::time::timeout(Duration::from_secs(2), source.next_chunk()).await;
        assert!(matches!(result, Ok(None)));
        // Woken by the stop itself, not by a periodic re-check
        assert!(tokio::time::Instant::now() - started < Duration::from_millis(25));
    }

    #[tokio::test]
    async fn test_push_from_foreign_thread() {
        let (capture, mut source) = LiveSource::channel(16, 16000, StopHandle::new());

        let handle = std::thread::spawn(move || {
            for i in 0..5 {
                capture.push(&[i as f32; 160]);
            }
        });
        handle.join().unwrap();

        for i in 0..5 {
            let chunk = source.next_chunk().await.unwrap();
            assert_eq!(chunk.samples[0], i as f32);
        }
    }
}
