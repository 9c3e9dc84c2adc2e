use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::device::{DeviceInfo, DeviceKind};
use crate::models::error::BackendError;
use crate::traits::capture_backend::{CaptureBackend, CaptureChannel, CaptureSink};

struct Binding {
    generation: u64,
    sink: Box<dyn CaptureSink>,
    playing: bool,
    volume: f32,
}

/// In-memory capture backend.
///
/// Holds at most one device binding, like a single recording subsystem.
/// Tests drive the capture thread by calling `deliver`.
pub struct MockCaptureBackend {
    devices: Vec<DeviceInfo>,
    binding: Arc<Mutex<Option<Binding>>>,
    opened: Mutex<Vec<Option<usize>>>,
    generation: AtomicU64,
    fail_open: AtomicBool,
}

impl MockCaptureBackend {
    /// A backend with a single default microphone.
    pub fn new() -> Self {
        Self::with_devices(vec![DeviceInfo::new(
            "default-mic",
            "Default Microphone",
            DeviceKind::Microphone,
        )])
    }

    pub fn with_devices(devices: Vec<DeviceInfo>) -> Self {
        Self {
            devices,
            binding: Arc::new(Mutex::new(None)),
            opened: Mutex::new(Vec::new()),
            generation: AtomicU64::new(0),
            fail_open: AtomicBool::new(false),
        }
    }

    /// Make subsequent `open_capture` calls fail.
    pub fn fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    /// Hand `samples` to the bound sink as the capture thread would.
    ///
    /// Returns false when nothing is bound.
    pub fn deliver(&self, samples: &[f32]) -> bool {
        let mut binding = self.binding.lock();
        match binding.as_mut() {
            Some(binding) => {
                binding.sink.on_captured_samples(samples);
                true
            }
            None => false,
        }
    }

    pub fn has_binding(&self) -> bool {
        self.binding.lock().is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.binding.lock().as_ref().map(|b| b.playing).unwrap_or(false)
    }

    pub fn volume(&self) -> f32 {
        self.binding.lock().as_ref().map(|b| b.volume).unwrap_or(0.0)
    }

    /// Device index passed to each successful `open_capture`, in order.
    pub fn opened_devices(&self) -> Vec<Option<usize>> {
        self.opened.lock().clone()
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().len()
    }
}

impl Default for MockCaptureBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for MockCaptureBackend {
    fn capture_devices(&self) -> Vec<DeviceInfo> {
        self.devices.clone()
    }

    fn open_capture(
        &self,
        device: Option<usize>,
        _sample_rate: u32,
        _frames_per_buffer: u32,
        sink: Box<dyn CaptureSink>,
    ) -> Result<Box<dyn CaptureChannel>, BackendError> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(BackendError::DeviceUnavailable("mock open failure".into()));
        }
        if let Some(index) = device {
            if index >= self.devices.len() {
                return Err(BackendError::DeviceUnavailable(format!("no device {}", index)));
            }
        }

        let mut binding = self.binding.lock();
        if binding.is_some() {
            return Err(BackendError::AlreadyInitialized);
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *binding = Some(Binding {
            generation,
            sink,
            playing: false,
            volume: 1.0,
        });
        self.opened.lock().push(device);

        Ok(Box::new(MockCaptureChannel {
            generation,
            binding: Arc::clone(&self.binding),
        }))
    }
}

struct MockCaptureChannel {
    generation: u64,
    binding: Arc<Mutex<Option<Binding>>>,
}

impl MockCaptureChannel {
    fn with_binding<R>(&self, f: impl FnOnce(&mut Binding) -> R) -> Result<R, BackendError> {
        match self.binding.lock().as_mut() {
            Some(binding) if binding.generation == self.generation => Ok(f(binding)),
            _ => Err(BackendError::Failed("channel freed".into())),
        }
    }
}

impl CaptureChannel for MockCaptureChannel {
    fn play(&mut self) -> Result<(), BackendError> {
        self.with_binding(|b| b.playing = true)
    }

    fn pause(&mut self) -> Result<(), BackendError> {
        self.with_binding(|b| b.playing = false)
    }

    fn set_volume(&mut self, gain: f32) {
        let _ = self.with_binding(|b| b.volume = gain);
    }
}

impl Drop for MockCaptureChannel {
    fn drop(&mut self) {
        let mut binding = self.binding.lock();
        if binding.as_ref().map(|b| b.generation) == Some(self.generation) {
            *binding = None;
        }
    }
}
