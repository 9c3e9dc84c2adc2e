use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::RecvError;
use parking_lot::Mutex;

use crate::devices;
use crate::models::config::OutputConfig;
use crate::models::error::VoiceError;
use crate::models::spatial::{ListenerPose, Vector3};
use crate::output::control::ControlLoop;
use crate::output::lease::{OutputLease, SharedBackend};
use crate::output::queue::{creation_queue, CreationRequest, RemoteSource, RequestSender};
use crate::output::stream::{Stream, StreamEnv};
use crate::traits::codec::Codec;
use crate::traits::playback_backend::PlaybackBackend;

const CONTROL_THREAD_NAME: &str = "voice-output-control";

/// State shared between the engine handle, its control thread and the
/// streams it created.
pub(crate) struct EngineShared {
    backend: Arc<dyn PlaybackBackend>,
    alive: AtomicBool,
    gain: AtomicU32,
    /// Requested backend buffer length in ms; 0 leaves the backend default.
    buffering_ms: AtomicU32,
    pub(crate) switch_pending: AtomicBool,
    pub(crate) pending_device: Mutex<Option<String>>,
    pub(crate) listener: Mutex<ListenerPose>,
    live_streams: AtomicUsize,
}

impl EngineShared {
    pub(crate) fn new(backend: Arc<dyn PlaybackBackend>, gain: f32, buffering_ms: Option<u32>) -> Self {
        Self {
            backend,
            alive: AtomicBool::new(true),
            gain: AtomicU32::new(gain.to_bits()),
            buffering_ms: AtomicU32::new(buffering_ms.unwrap_or(0)),
            switch_pending: AtomicBool::new(false),
            pending_device: Mutex::new(None),
            listener: Mutex::new(ListenerPose::default()),
            live_streams: AtomicUsize::new(0),
        }
    }

    pub(crate) fn backend(&self) -> &Arc<dyn PlaybackBackend> {
        &self.backend
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    pub(crate) fn gain(&self) -> f32 {
        f32::from_bits(self.gain.load(Ordering::Relaxed))
    }

    pub(crate) fn set_gain(&self, gain: f32) {
        self.gain.store(gain.to_bits(), Ordering::Relaxed);
    }

    pub(crate) fn buffering_ms(&self) -> Option<u32> {
        Some(self.buffering_ms.load(Ordering::Relaxed)).filter(|&ms| ms > 0)
    }

    pub(crate) fn set_buffering_ms(&self, ms: u32) {
        self.buffering_ms.store(ms, Ordering::Relaxed);
    }

    /// Record a device switch unless one is already pending.
    pub(crate) fn request_device(&self, device_id: &str) -> bool {
        let mut pending = self.pending_device.lock();
        if self.switch_pending.load(Ordering::Acquire) {
            return false;
        }
        *pending = Some(device_id.to_owned());
        self.switch_pending.store(true, Ordering::Release);
        true
    }

    pub(crate) fn live_streams(&self) -> usize {
        self.live_streams.load(Ordering::Relaxed)
    }

    pub(crate) fn stream_opened(&self) {
        self.live_streams.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn stream_closed(&self) {
        self.live_streams.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Output device owner with a dedicated control thread.
///
/// ```text
/// callers ──set_gain / set_my_* / change_device──► shared state ─┐
/// callers ──create_stream────────► [bounded queue] ──────────────┤
///                                                                ▼
///                    [voice-output-control] tick every 16 ms:
///                    gain → listener → device switch → buffering → create streams
/// ```
/// The backend is initialized on the control thread and only that thread
/// changes device state. Listener and gain updates take effect on the next
/// tick.
///
/// Streams created by an engine must be dropped before it.
pub struct PlaybackEngine {
    shared: Arc<EngineShared>,
    requests: RequestSender,
    config: OutputConfig,
    thread: Option<JoinHandle<()>>,
}

impl PlaybackEngine {
    /// Open the output device on a new control thread.
    ///
    /// Blocks until the backend is initialized. An unknown device id falls
    /// back to the default device.
    pub fn new(backend: SharedBackend, codec: Arc<dyn Codec>, config: OutputConfig) -> Result<Self, VoiceError> {
        config.validate().map_err(VoiceError::Configuration)?;

        let shared = Arc::new(EngineShared::new(
            Arc::clone(backend.backend()),
            1.0,
            config.buffering_ms,
        ));
        let (requests, receiver) = creation_queue(config.queue_capacity);
        let (init_tx, init_rx) = crossbeam_channel::bounded::<Result<(), VoiceError>>(1);

        let env = StreamEnv {
            backend: Arc::clone(backend.backend()),
            codec,
            sample_rate: config.sample_rate,
            buffer_capacity: config.stream_buffer_capacity,
            engine: Arc::downgrade(&shared),
        };
        let thread_shared = Arc::clone(&shared);
        let thread_config = config.clone();

        let handle = thread::Builder::new()
            .name(CONTROL_THREAD_NAME.into())
            .spawn(move || {
                let lease = match open_output(&backend, &thread_config) {
                    Ok(lease) => lease,
                    Err(e) => {
                        let _ = init_tx.send(Err(e));
                        return;
                    }
                };
                let _ = init_tx.send(Ok(()));

                let mut control = ControlLoop::new(thread_shared, receiver, env, thread_config.tick());
                control.run();
                control.shutdown();
                drop(control);
                drop(lease);
                log::info!("output control thread stopped");
            })
            .map_err(|e| VoiceError::DeviceStart(format!("couldn't spawn output thread: {}", e)))?;

        match init_rx.recv() {
            Ok(Ok(())) => {
                log::info!("output engine started at {} Hz", config.sample_rate);
                Ok(Self {
                    shared,
                    requests,
                    config,
                    thread: Some(handle),
                })
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(RecvError) => {
                let _ = handle.join();
                Err(VoiceError::DeviceStart("output thread exited during init".into()))
            }
        }
    }

    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    pub fn set_my_position(&self, position: Vector3) {
        self.shared.listener.lock().position = position;
    }

    pub fn set_my_velocity(&self, velocity: Vector3) {
        self.shared.listener.lock().velocity = velocity;
    }

    pub fn set_my_orientation_up(&self, up: Vector3) {
        self.shared.listener.lock().up = up;
    }

    pub fn set_my_orientation_front(&self, front: Vector3) {
        self.shared.listener.lock().front = front;
    }

    /// Listener pose the next tick will apply.
    pub fn listener(&self) -> ListenerPose {
        *self.shared.listener.lock()
    }

    /// Global output gain, applied on the next tick.
    pub fn set_gain(&self, gain: f32) {
        self.shared.set_gain(gain);
    }

    pub fn gain(&self) -> f32 {
        self.shared.gain()
    }

    /// Backend buffer length, pushed on the next tick.
    pub fn set_buffering_time(&self, ms: u32) {
        self.shared.set_buffering_ms(ms);
    }

    /// Request a switch to the output device with identifier `device_id`.
    ///
    /// Returns false, doing nothing, while an earlier switch is still
    /// pending. If the device can't be bound the engine stays on the
    /// current one.
    pub fn change_device(&self, device_id: &str) -> bool {
        self.shared.request_device(device_id)
    }

    pub fn is_switch_pending(&self) -> bool {
        self.shared.switch_pending.load(Ordering::Acquire)
    }

    /// Queue creation of a locally-fed stream.
    ///
    /// `on_created` runs on the control thread with the stream or a
    /// `StreamCreation` error. Fails with `QueueFull` instead of blocking.
    pub fn create_stream<F>(&self, on_created: F) -> Result<(), VoiceError>
    where
        F: FnOnce(Result<Stream, VoiceError>) + Send + 'static,
    {
        self.requests.submit(CreationRequest::local(Box::new(on_created)))
    }

    /// Queue creation of a stream fed from `url`, starting
    /// `start_offset_secs` into the source.
    pub fn create_url_stream<F>(&self, url: &str, start_offset_secs: u32, on_created: F) -> Result<(), VoiceError>
    where
        F: FnOnce(Result<Stream, VoiceError>) + Send + 'static,
    {
        let source = RemoteSource {
            url: url.to_owned(),
            start_offset_secs,
        };
        self.requests
            .submit(CreationRequest::remote(source, Box::new(on_created)))
    }

    /// Streams created by this engine that are still alive.
    pub fn active_streams(&self) -> usize {
        self.shared.live_streams()
    }
}

/// Resolve the device and initialize the backend on the calling thread.
fn open_output(backend: &SharedBackend, config: &OutputConfig) -> Result<OutputLease, VoiceError> {
    let device = match devices::requested_id(config.device_id.as_deref()) {
        Some(id) => {
            let index = devices::find_output_device(backend.backend().as_ref(), id);
            if index.is_none() {
                log::warn!("output device '{}' not found, using default", id);
            }
            index
        }
        None => None,
    };

    let lease = backend.acquire(device, config.sample_rate)?;

    if let Err(e) = lease.backend().warm_up() {
        log::warn!("output warm-up failed: {}", e);
    }
    Ok(lease)
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.shared.alive.store(false, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                log::error!("output control thread panicked");
            }
        }

        let live = self.shared.live_streams();
        if live > 0 {
            log::warn!("output engine dropped with {} live streams", live);
        }
    }
}
