pub mod capture_backend;
pub mod codec;
pub mod denoiser;
pub mod playback_backend;
