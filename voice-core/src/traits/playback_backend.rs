use crate::models::device::DeviceInfo;
use crate::models::error::BackendError;
use crate::models::spatial::{Channel3dAttributes, ListenerPose, Vector3};

/// Supplies samples to a push channel when the backend mixes.
///
/// `process_output` runs on the backend's mixing thread. It writes at most
/// `out.len()` samples and returns how many it wrote; returning fewer (or
/// zero) is an underrun, not an error. It must never block.
pub trait PlaybackSource: Send {
    fn process_output(&mut self, out: &mut [f32]) -> usize;
}

/// Notified each time the backend receives data for a URL channel.
///
/// The backend passes the channel being fed so the observer can seek or
/// start it once enough data has arrived.
pub trait DownloadObserver: Send {
    fn on_download(&mut self, channel: &dyn OutputChannel);
}

/// Invoked by the backend when a channel's source reaches its natural end.
pub type EndCallback = Box<dyn FnMut() + Send>;

/// How `PlaybackBackend::init` should treat an existing initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitMode {
    Fresh,
    /// Re-initialize a subsystem another client already set up.
    Reinit,
}

/// Positioning modes for `OutputChannel::set_position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekMode {
    /// Decode (and discard) up to the position.
    DecodeTo,
    /// Jump to the byte position.
    Byte,
}

/// A playing (or pausable) output channel. Dropping it frees the channel.
///
/// Channels are mono, float, 3D-capable.
pub trait OutputChannel: Send {
    fn play(&self) -> Result<(), BackendError>;
    fn pause(&self) -> Result<(), BackendError>;
    fn is_playing(&self) -> bool;
    fn set_volume(&self, gain: f32);

    /// Preferred number of samples per pull.
    fn set_granule(&self, samples: u32);

    fn seconds_to_bytes(&self, seconds: f64) -> u64;
    fn set_position(&self, bytes: u64, mode: SeekMode) -> Result<(), BackendError>;

    fn set_3d_attributes(&self, attributes: Channel3dAttributes);
    fn set_3d_position(&self, position: Vector3, direction: Vector3, velocity: Vector3);

    /// Register the end-of-source callback, replacing any previous one.
    fn on_end(&self, callback: EndCallback);
}

/// Output side of an audio backend.
///
/// All methods except the channel factories' returned handles are meant to
/// be called from the thread that performed `init`. Device indices refer to
/// positions in the list returned by `playback_devices`.
pub trait PlaybackBackend: Send + Sync {
    /// All output endpoints, in backend order.
    fn playback_devices(&self) -> Vec<DeviceInfo>;

    /// Initialize the output subsystem on the calling thread.
    ///
    /// Returns `BackendError::AlreadyInitialized` in `Fresh` mode when
    /// another client already owns the subsystem.
    fn init(&self, device: Option<usize>, sample_rate: u32, mode: InitMode) -> Result<(), BackendError>;

    /// Device the subsystem is currently bound to.
    fn current_device(&self) -> Option<usize>;

    fn set_device(&self, device: usize) -> Result<(), BackendError>;

    /// Backend-specific preparation needed before the first channel is made.
    fn warm_up(&self) -> Result<(), BackendError>;

    fn set_global_volume(&self, gain: f32);
    fn set_buffer_length(&self, ms: u32);

    fn set_listener(&self, pose: &ListenerPose);
    /// Recompute 3D state after listener or channel changes.
    fn apply_3d(&self);

    fn create_push_channel(
        &self,
        sample_rate: u32,
        source: Box<dyn PlaybackSource>,
    ) -> Result<Box<dyn OutputChannel>, BackendError>;

    /// Open a channel streaming from `url`. The channel starts stopped.
    fn create_url_channel(
        &self,
        url: &str,
        observer: Box<dyn DownloadObserver>,
    ) -> Result<Box<dyn OutputChannel>, BackendError>;

    /// Release the output subsystem.
    fn free(&self);
}
