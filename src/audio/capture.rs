//! Microphone capture using CPAL (Cross-Platform Audio Library).

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};
use super::live::LiveCapture;
use crate::error::{HarnessError, Result};

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is created, played and dropped from the backend's
/// owner only; the data callback never touches it.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Default input device, capturing mono f32 at the configured rate.
///
/// The data callback accumulates device buffers into blocks of
/// `buffer_duration_ms` and pushes each block through a [`LiveCapture`], so
/// the session sees one chunk per block at real-time cadence.
pub struct CpalBackend {
    config: AudioBackendConfig,
    device: cpal::Device,
    stream: Option<SendableStream>,
}

impl CpalBackend {
    pub fn new(config: AudioBackendConfig) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| HarnessError::AudioCapture {
                message: "no default input device".to_string(),
            })?;

        info!(
            "CPAL backend initialized ({}Hz, {}ms blocks)",
            config.target_sample_rate, config.buffer_duration_ms
        );

        Ok(Self {
            config,
            device,
            stream: None,
        })
    }

    fn build_stream(&self, capture: LiveCapture) -> Result<cpal::Stream> {
        let stream_config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(self.config.target_sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let block = self.config.block_samples().max(1);
        let err_callback = |err| {
            error!("Audio stream error: {}", err);
        };

        // f32 first, then i16 with normalization
        let f32_capture = capture.clone();
        let mut pending: Vec<f32> = Vec::with_capacity(block * 2);
        if let Ok(stream) = self.device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                pending.extend_from_slice(data);
                flush_blocks(&mut pending, block, &f32_capture);
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        warn!("Device rejected f32 capture, falling back to i16");
        let mut pending: Vec<f32> = Vec::with_capacity(block * 2);
        self.device
            .build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    pending.extend(data.iter().map(|&s| s as f32 / 32768.0));
                    flush_blocks(&mut pending, block, &capture);
                },
                err_callback,
                None,
            )
            .map_err(|e| HarnessError::AudioCapture {
                message: format!("Failed to build input stream: {}", e),
            })
    }
}

/// Push every complete block out of `pending`, keeping the remainder
fn flush_blocks(pending: &mut Vec<f32>, block: usize, capture: &LiveCapture) {
    while pending.len() >= block {
        capture.push(&pending[..block]);
        pending.drain(..block);
    }
}

#[async_trait::async_trait]
impl AudioBackend for CpalBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.stream.is_some() {
            return Err(HarnessError::AudioCapture {
                message: "already capturing".to_string(),
            });
        }

        let (capture, rx) =
            LiveCapture::channel(self.config.queue_capacity, self.config.target_sample_rate);

        let stream = self.build_stream(capture)?;
        stream.play().map_err(|e| HarnessError::AudioCapture {
            message: format!("Failed to start input stream: {}", e),
        })?;
        self.stream = Some(SendableStream(stream));

        info!("Microphone capture started");

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(SendableStream(stream)) = self.stream.take() {
            if let Err(e) = stream.pause() {
                warn!("Failed to pause input stream: {}", e);
            }
            info!("Microphone capture stopped");
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }

    fn name(&self) -> &str {
        "CPAL microphone"
    }
}
