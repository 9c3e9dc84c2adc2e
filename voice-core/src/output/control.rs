use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::devices;
use crate::models::error::VoiceError;
use crate::output::engine::EngineShared;
use crate::output::queue::RequestReceiver;
use crate::output::stream::{self, StreamEnv};

/// The output control thread's state and fixed-period loop.
///
/// Everything that touches the backend's device state runs here: global
/// gain, listener pose, device switches, buffering and channel creation.
pub(crate) struct ControlLoop {
    shared: Arc<EngineShared>,
    requests: RequestReceiver,
    env: StreamEnv,
    tick_period: Duration,
    active_device: Option<usize>,
    applied_buffering: Option<u32>,
}

impl ControlLoop {
    pub(crate) fn new(
        shared: Arc<EngineShared>,
        requests: RequestReceiver,
        env: StreamEnv,
        tick_period: Duration,
    ) -> Self {
        let active_device = shared.backend().current_device();
        Self {
            shared,
            requests,
            env,
            tick_period,
            active_device,
            applied_buffering: None,
        }
    }

    /// Tick until the engine is dropped.
    pub(crate) fn run(&mut self) {
        while self.shared.is_alive() {
            let started = Instant::now();
            self.tick();
            if let Some(rest) = self.tick_period.checked_sub(started.elapsed()) {
                thread::sleep(rest);
            }
        }
    }

    pub(crate) fn tick(&mut self) {
        let backend = Arc::clone(self.shared.backend());

        backend.set_global_volume(self.shared.gain());

        {
            let pose = self.shared.listener.lock();
            backend.set_listener(&pose);
            backend.apply_3d();
        }

        if self.shared.switch_pending.load(Ordering::Acquire) {
            self.switch_device();
            self.shared.switch_pending.store(false, Ordering::Release);
        }

        self.apply_buffering();
        self.create_streams();
    }

    fn switch_device(&mut self) {
        let backend = self.shared.backend();
        let requested = self.shared.pending_device.lock().take().unwrap_or_default();

        let switched = match devices::find_output_device(backend.as_ref(), &requested) {
            Some(index) => match backend.set_device(index) {
                Ok(()) => {
                    self.active_device = Some(index);
                    true
                }
                Err(e) => {
                    log::warn!("couldn't switch output to '{}': {}", requested, e);
                    false
                }
            },
            None => {
                log::warn!("output device '{}' not found", requested);
                false
            }
        };

        if switched {
            log::info!("output switched to '{}'", requested);
            return;
        }

        if let Some(previous) = self.active_device {
            if let Err(e) = backend.set_device(previous) {
                log::error!("couldn't restore output device {}: {}", previous, e);
            }
        }
    }

    fn apply_buffering(&mut self) {
        let requested = self.shared.buffering_ms();
        if requested.is_some() && requested != self.applied_buffering {
            if let Some(ms) = requested {
                self.shared.backend().set_buffer_length(ms);
            }
            self.applied_buffering = requested;
        }
    }

    fn create_streams(&mut self) {
        for request in self.requests.drain() {
            let result = stream::create_stream(request.remote, &self.env).map_err(|e| {
                log::warn!("stream creation failed: {}", e);
                VoiceError::StreamCreation(Box::new(e))
            });
            (request.on_created)(result);
        }
    }

    /// Complete everything still queued with `EngineStopped`.
    pub(crate) fn shutdown(&mut self) {
        let mut abandoned = 0;
        for request in self.requests.drain() {
            request.fail(VoiceError::EngineStopped);
            abandoned += 1;
        }
        if abandoned > 0 {
            log::debug!("failed {} queued stream requests at shutdown", abandoned);
        }
    }
}
