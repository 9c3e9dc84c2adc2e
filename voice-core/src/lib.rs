//! # voice-core
//!
//! Real-time voice pipeline core.
//!
//! Captures microphone audio into fixed-size codec frames, and plays back
//! any number of local or network-fed streams positioned in 3D space. The
//! audio backend, codec and denoiser are capability traits; platform
//! crates implement them and plug into the session and engine here.
//!
//! ## Architecture
//!
//! ```text
//! voice-core (this crate)
//! ├── traits/       ← CaptureBackend, PlaybackBackend, Codec, Denoiser
//! ├── models/       ← VoiceError, configs, device info, spatial types, states
//! ├── processing/   ← RingBuffer (SPSC), peak level and gain
//! ├── session/      ← CaptureSession (frame → denoise → encode)
//! ├── output/       ← PlaybackEngine, Stream, creation queue, backend lease
//! ├── devices       ← device listing and id resolution
//! └── testing/      ← in-memory backends and codec
//! ```
//!
//! Threads: the backend's capture and mixing threads call into the
//! session and streams without blocking; the engine owns one control
//! thread that performs every device-affecting backend call.

pub mod devices;
pub mod models;
pub mod output;
pub mod processing;
pub mod session;
pub mod testing;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::config::{CaptureConfig, OutputConfig, VoiceConfig};
pub use models::device::{DeviceInfo, DeviceKind};
pub use models::error::{BackendError, CodecError, VoiceError};
pub use models::spatial::{ListenerPose, SpatialAttributes, Vector3};
pub use models::state::{CaptureState, StreamKind, StreamState};
pub use output::engine::PlaybackEngine;
pub use output::lease::{OutputLease, SharedBackend};
pub use output::queue::RemoteSource;
pub use output::stream::{Stream, StreamId};
pub use processing::ring_buffer::RingBuffer;
pub use session::capture::{CaptureSession, CaptureStats};
pub use traits::capture_backend::{CaptureBackend, CaptureChannel, CaptureSink};
pub use traits::codec::{Codec, Decoder, Encoder};
pub use traits::denoiser::Denoiser;
pub use traits::playback_backend::{OutputChannel, PlaybackBackend, PlaybackSource};
