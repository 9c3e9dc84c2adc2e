//! In-memory backends and codecs for exercising the pipeline without
//! audio hardware or native codec libraries.
//!
//! The mocks record what the core asks of them and let tests play the role
//! of the backend's own threads (capture delivery, mixing pulls, network
//! downloads, end-of-source signals).

mod capture;
mod codec;
mod playback;

pub use capture::MockCaptureBackend;
pub use codec::{MockCodec, MockDenoiser};
pub use playback::{BackendCall, MockChannel, MockPlaybackBackend};
