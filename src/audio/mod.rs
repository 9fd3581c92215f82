pub mod backend;
pub mod chunk;
pub mod file;
pub mod live;
pub mod source;
pub mod synth;

#[cfg(feature = "live-capture")]
pub mod capture;

pub use backend::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource};
pub use chunk::{chunk_samples, decode_chunk, encode_chunk, frame_samples, AudioChunk, ChunkConfig};
pub use file::{AudioFile, FileSource};
pub use live::{LiveCapture, LiveSource};
pub use source::{SampleCursor, SignalSource};
pub use synth::{SignalKind, SignalSpec, SyntheticSource};
