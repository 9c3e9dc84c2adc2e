use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::error::{BackendError, VoiceError};
use crate::traits::playback_backend::{InitMode, PlaybackBackend};

/// A playback backend shared by every engine in the process.
///
/// Output subsystems are process-wide: a second engine (or another library
/// in the same process) finds the subsystem already initialized. Each
/// engine takes an `OutputLease`; the subsystem is freed when the last
/// lease is released.
#[derive(Clone)]
pub struct SharedBackend {
    backend: Arc<dyn PlaybackBackend>,
    leases: Arc<Mutex<usize>>,
}

impl SharedBackend {
    pub fn new(backend: Arc<dyn PlaybackBackend>) -> Self {
        Self {
            backend,
            leases: Arc::new(Mutex::new(0)),
        }
    }

    pub fn backend(&self) -> &Arc<dyn PlaybackBackend> {
        &self.backend
    }

    /// Number of live leases.
    pub fn lease_count(&self) -> usize {
        *self.leases.lock()
    }

    /// Initialize the subsystem on the calling thread and take a lease.
    ///
    /// When another client already owns the subsystem, re-initializes
    /// against `device` (or the currently active device) instead of
    /// failing.
    pub fn acquire(&self, device: Option<usize>, sample_rate: u32) -> Result<OutputLease, VoiceError> {
        let mut leases = self.leases.lock();

        match self.backend.init(device, sample_rate, InitMode::Fresh) {
            Ok(()) => {}
            Err(BackendError::AlreadyInitialized) => {
                let target = device.or_else(|| self.backend.current_device());
                log::info!("output already initialized, reinitializing on {:?}", target);
                self.backend
                    .init(target, sample_rate, InitMode::Reinit)
                    .map_err(|e| VoiceError::DeviceOpen(e.to_string()))?;
            }
            Err(e) => return Err(VoiceError::DeviceOpen(e.to_string())),
        }

        *leases += 1;
        Ok(OutputLease {
            backend: Arc::clone(&self.backend),
            leases: Arc::clone(&self.leases),
        })
    }
}

/// Keeps the output subsystem initialized while held.
pub struct OutputLease {
    backend: Arc<dyn PlaybackBackend>,
    leases: Arc<Mutex<usize>>,
}

impl OutputLease {
    pub fn backend(&self) -> &Arc<dyn PlaybackBackend> {
        &self.backend
    }
}

impl Drop for OutputLease {
    fn drop(&mut self) {
        let mut leases = self.leases.lock();
        *leases = leases.saturating_sub(1);
        if *leases == 0 {
            log::debug!("last output lease released, freeing backend");
            self.backend.free();
        }
    }
}
