/// Capture session state.
///
/// ```text
/// paused ⇄ capturing
///    ↓         ↓        (failed device change)
///        no-device
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Paused,
    Capturing,
    /// The last device change failed; the session has no usable device.
    NoDevice,
}

impl CaptureState {
    pub fn is_capturing(&self) -> bool {
        matches!(self, Self::Capturing)
    }

    pub fn has_device(&self) -> bool {
        !matches!(self, Self::NoDevice)
    }
}

/// Which representation a playback stream uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Fed by application-pushed samples or packets.
    Local,
    /// Fed by the backend from a network URL.
    RemoteUrl,
}

/// Lifecycle of a playback stream once handed to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Active,
    /// The backend signalled natural completion of the source.
    Ended,
}

impl StreamState {
    pub fn is_ended(&self) -> bool {
        matches!(self, Self::Ended)
    }
}
