use crate::models::device::DeviceInfo;
use crate::models::error::BackendError;

/// Receives captured audio from the backend.
///
/// Registered once per device binding. `on_captured_samples` runs on the
/// backend's capture thread: it must not block.
pub trait CaptureSink: Send {
    /// Mono f32 samples captured since the previous call.
    fn on_captured_samples(&mut self, samples: &[f32]);
}

/// A bound capture device. Dropping it releases the binding and the sink.
pub trait CaptureChannel: Send {
    /// Start (or resume) delivering samples to the sink.
    fn play(&mut self) -> Result<(), BackendError>;

    /// Stop delivering samples without releasing the device.
    fn pause(&mut self) -> Result<(), BackendError>;

    /// Channel-level volume effect, applied before samples reach the sink.
    fn set_volume(&mut self, gain: f32);
}

/// Capture side of an audio backend.
///
/// Device indices refer to positions in the list returned by
/// `capture_devices`.
pub trait CaptureBackend: Send + Sync {
    /// All capture endpoints, in backend order.
    fn capture_devices(&self) -> Vec<DeviceInfo>;

    /// Bind a capture device (None = default) as mono float at `sample_rate`.
    ///
    /// The returned channel starts paused. `frames_per_buffer` is the
    /// preferred number of samples per sink call.
    fn open_capture(
        &self,
        device: Option<usize>,
        sample_rate: u32,
        frames_per_buffer: u32,
        sink: Box<dyn CaptureSink>,
    ) -> Result<Box<dyn CaptureChannel>, BackendError>;
}
