use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use crate::models::device::{DeviceInfo, DeviceKind};
use crate::models::error::BackendError;
use crate::models::spatial::{Channel3dAttributes, ListenerPose, Vector3};
use crate::traits::playback_backend::{
    DownloadObserver, EndCallback, InitMode, OutputChannel, PlaybackBackend, PlaybackSource,
    SeekMode,
};

/// Backend-level calls recorded by `MockPlaybackBackend`.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Init { device: Option<usize>, mode: InitMode },
    SetDevice(usize),
    WarmUp,
    GlobalVolume(f32),
    BufferLength(u32),
    Listener(ListenerPose),
    Apply3d,
    Free,
}

#[derive(Default)]
struct BackendState {
    initialized: bool,
    owned_elsewhere: bool,
    fail_init: bool,
    fail_warm_up: bool,
    fail_push: bool,
    urls_unseekable: bool,
    current: Option<usize>,
    failing_devices: HashSet<usize>,
    failing_urls: HashSet<String>,
    calls: Vec<BackendCall>,
    init_thread: Option<ThreadId>,
    creation_threads: Vec<ThreadId>,
}

/// In-memory output backend.
///
/// Records every backend call, keeps every channel it created for
/// inspection, and lets tests act as the mixing thread (`pull`), the
/// network fetcher (`download`) and the end-of-source signal (`finish`).
pub struct MockPlaybackBackend {
    devices: Vec<DeviceInfo>,
    state: Mutex<BackendState>,
    channels: Mutex<Vec<Arc<MockChannel>>>,
}

impl MockPlaybackBackend {
    /// A backend with a single default output device.
    pub fn new() -> Self {
        Self::with_devices(vec![DeviceInfo::new(
            "default-out",
            "Default Output",
            DeviceKind::Speakers,
        )])
    }

    pub fn with_devices(devices: Vec<DeviceInfo>) -> Self {
        Self {
            devices,
            state: Mutex::new(BackendState::default()),
            channels: Mutex::new(Vec::new()),
        }
    }

    /// Simulate another client already owning the output subsystem.
    pub fn set_owned_elsewhere(&self, owned: bool) {
        self.state.lock().owned_elsewhere = owned;
    }

    pub fn fail_init(&self, fail: bool) {
        self.state.lock().fail_init = fail;
    }

    pub fn fail_warm_up(&self, fail: bool) {
        self.state.lock().fail_warm_up = fail;
    }

    pub fn fail_push_channels(&self, fail: bool) {
        self.state.lock().fail_push = fail;
    }

    pub fn fail_device(&self, index: usize) {
        self.state.lock().failing_devices.insert(index);
    }

    pub fn fail_url(&self, url: &str) {
        self.state.lock().failing_urls.insert(url.to_owned());
    }

    /// New URL channels reject seeks until `MockChannel::set_seekable`.
    pub fn set_urls_unseekable(&self, unseekable: bool) {
        self.state.lock().urls_unseekable = unseekable;
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Thread that last called `init`.
    pub fn init_thread(&self) -> Option<ThreadId> {
        self.state.lock().init_thread
    }

    /// Thread that created each channel, in creation order.
    pub fn creation_threads(&self) -> Vec<ThreadId> {
        self.state.lock().creation_threads.clone()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.lock().len()
    }

    /// The `index`-th channel created by this backend.
    pub fn channel(&self, index: usize) -> Arc<MockChannel> {
        Arc::clone(&self.channels.lock()[index])
    }

    /// Pull from a push channel as the mixing thread would.
    pub fn pull(&self, index: usize, out: &mut [f32]) -> usize {
        self.channel(index).pull(out)
    }

    /// Report freshly downloaded data on a URL channel.
    pub fn download(&self, index: usize) {
        self.channel(index).download();
    }

    /// Signal natural end of a channel's source.
    pub fn finish(&self, index: usize) {
        self.channel(index).finish();
    }

    fn record(&self, call: BackendCall) {
        self.state.lock().calls.push(call);
    }

    fn register(&self, channel: MockChannel) -> Box<dyn OutputChannel> {
        let channel = Arc::new(channel);
        self.channels.lock().push(Arc::clone(&channel));
        self.state.lock().creation_threads.push(thread::current().id());
        Box::new(MockChannelHandle { channel })
    }
}

impl Default for MockPlaybackBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackBackend for MockPlaybackBackend {
    fn playback_devices(&self) -> Vec<DeviceInfo> {
        self.devices.clone()
    }

    fn init(&self, device: Option<usize>, _sample_rate: u32, mode: InitMode) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.calls.push(BackendCall::Init { device, mode });

        if state.fail_init {
            return Err(BackendError::DeviceUnavailable("mock init failure".into()));
        }
        if mode == InitMode::Fresh && (state.initialized || state.owned_elsewhere) {
            return Err(BackendError::AlreadyInitialized);
        }
        if let Some(index) = device {
            if index >= self.devices.len() {
                return Err(BackendError::DeviceUnavailable(format!("no device {}", index)));
            }
        }

        state.initialized = true;
        state.current = device.or(if self.devices.is_empty() { None } else { Some(0) });
        state.init_thread = Some(thread::current().id());
        Ok(())
    }

    fn current_device(&self) -> Option<usize> {
        self.state.lock().current
    }

    fn set_device(&self, device: usize) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.calls.push(BackendCall::SetDevice(device));
        if device >= self.devices.len() || state.failing_devices.contains(&device) {
            return Err(BackendError::DeviceUnavailable(format!("no device {}", device)));
        }
        state.current = Some(device);
        Ok(())
    }

    fn warm_up(&self) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.calls.push(BackendCall::WarmUp);
        if state.fail_warm_up {
            return Err(BackendError::Failed("mock warm-up failure".into()));
        }
        Ok(())
    }

    fn set_global_volume(&self, gain: f32) {
        self.record(BackendCall::GlobalVolume(gain));
    }

    fn set_buffer_length(&self, ms: u32) {
        self.record(BackendCall::BufferLength(ms));
    }

    fn set_listener(&self, pose: &ListenerPose) {
        self.record(BackendCall::Listener(*pose));
    }

    fn apply_3d(&self) {
        self.record(BackendCall::Apply3d);
    }

    fn create_push_channel(
        &self,
        sample_rate: u32,
        source: Box<dyn PlaybackSource>,
    ) -> Result<Box<dyn OutputChannel>, BackendError> {
        if self.state.lock().fail_push {
            return Err(BackendError::Failed("mock push channel failure".into()));
        }
        let channel = MockChannel::new(None, sample_rate, true);
        *channel.source.lock() = Some(source);
        Ok(self.register(channel))
    }

    fn create_url_channel(
        &self,
        url: &str,
        observer: Box<dyn DownloadObserver>,
    ) -> Result<Box<dyn OutputChannel>, BackendError> {
        let seekable = {
            let state = self.state.lock();
            if state.failing_urls.contains(url) {
                return Err(BackendError::Failed(format!("couldn't fetch {}", url)));
            }
            !state.urls_unseekable
        };
        let channel = MockChannel::new(Some(url.to_owned()), 48_000, seekable);
        *channel.observer.lock() = Some(observer);
        Ok(self.register(channel))
    }

    fn free(&self) {
        let mut state = self.state.lock();
        state.calls.push(BackendCall::Free);
        state.initialized = false;
        state.current = None;
    }
}

#[derive(Debug, Clone, Default)]
struct ChannelState {
    playing: bool,
    freed: bool,
    volume: f32,
    granule: Option<u32>,
    attributes: Vec<Channel3dAttributes>,
    position: Option<(Vector3, Vector3, Vector3)>,
    seeks: Vec<(u64, SeekMode)>,
}

/// A channel created by `MockPlaybackBackend`.
pub struct MockChannel {
    url: Option<String>,
    sample_rate: u32,
    seekable: AtomicBool,
    state: Mutex<ChannelState>,
    source: Mutex<Option<Box<dyn PlaybackSource>>>,
    observer: Mutex<Option<Box<dyn DownloadObserver>>>,
    end: Mutex<Option<EndCallback>>,
}

impl MockChannel {
    fn new(url: Option<String>, sample_rate: u32, seekable: bool) -> Self {
        Self {
            url,
            sample_rate,
            seekable: AtomicBool::new(seekable),
            state: Mutex::new(ChannelState {
                volume: 1.0,
                ..Default::default()
            }),
            source: Mutex::new(None),
            observer: Mutex::new(None),
            end: Mutex::new(None),
        }
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn volume(&self) -> f32 {
        self.state.lock().volume
    }

    pub fn granule(&self) -> Option<u32> {
        self.state.lock().granule
    }

    pub fn is_freed(&self) -> bool {
        self.state.lock().freed
    }

    /// Every 3D attribute set applied, oldest first.
    pub fn attribute_history(&self) -> Vec<Channel3dAttributes> {
        self.state.lock().attributes.clone()
    }

    /// Last (position, direction, velocity) applied.
    pub fn position(&self) -> Option<(Vector3, Vector3, Vector3)> {
        self.state.lock().position
    }

    pub fn seeks(&self) -> Vec<(u64, SeekMode)> {
        self.state.lock().seeks.clone()
    }

    pub fn set_seekable(&self, seekable: bool) {
        self.seekable.store(seekable, Ordering::SeqCst);
    }

    pub fn pull(&self, out: &mut [f32]) -> usize {
        match self.source.lock().as_mut() {
            Some(source) => source.process_output(out),
            None => 0,
        }
    }

    pub fn download(&self) {
        let mut observer = self.observer.lock().take();
        if let Some(observer) = observer.as_mut() {
            observer.on_download(self);
        }
        let mut slot = self.observer.lock();
        if slot.is_none() && !self.is_freed() {
            *slot = observer;
        }
    }

    pub fn finish(&self) {
        if self.is_freed() {
            return;
        }
        self.state.lock().playing = false;
        let mut callback = self.end.lock().take();
        if let Some(callback) = callback.as_mut() {
            callback();
        }
        let mut slot = self.end.lock();
        if slot.is_none() && !self.is_freed() {
            *slot = callback;
        }
    }

    fn free(&self) {
        self.state.lock().freed = true;
        self.state.lock().playing = false;
        *self.source.lock() = None;
        *self.observer.lock() = None;
        *self.end.lock() = None;
    }
}

impl OutputChannel for MockChannel {
    fn play(&self) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        if state.freed {
            return Err(BackendError::Failed("channel freed".into()));
        }
        state.playing = true;
        Ok(())
    }

    fn pause(&self) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        if state.freed {
            return Err(BackendError::Failed("channel freed".into()));
        }
        state.playing = false;
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    fn set_volume(&self, gain: f32) {
        self.state.lock().volume = gain;
    }

    fn set_granule(&self, samples: u32) {
        self.state.lock().granule = Some(samples);
    }

    fn seconds_to_bytes(&self, seconds: f64) -> u64 {
        (seconds * self.sample_rate as f64) as u64 * std::mem::size_of::<f32>() as u64
    }

    fn set_position(&self, bytes: u64, mode: SeekMode) -> Result<(), BackendError> {
        self.state.lock().seeks.push((bytes, mode));
        if mode == SeekMode::Byte && !self.seekable.load(Ordering::SeqCst) {
            return Err(BackendError::Failed("position not downloaded yet".into()));
        }
        Ok(())
    }

    fn set_3d_attributes(&self, attributes: Channel3dAttributes) {
        self.state.lock().attributes.push(attributes);
    }

    fn set_3d_position(&self, position: Vector3, direction: Vector3, velocity: Vector3) {
        self.state.lock().position = Some((position, direction, velocity));
    }

    fn on_end(&self, callback: EndCallback) {
        *self.end.lock() = Some(callback);
    }
}

/// Owned handle given to the stream; dropping it frees the channel.
struct MockChannelHandle {
    channel: Arc<MockChannel>,
}

impl OutputChannel for MockChannelHandle {
    fn play(&self) -> Result<(), BackendError> {
        self.channel.play()
    }

    fn pause(&self) -> Result<(), BackendError> {
        self.channel.pause()
    }

    fn is_playing(&self) -> bool {
        self.channel.is_playing()
    }

    fn set_volume(&self, gain: f32) {
        self.channel.set_volume(gain)
    }

    fn set_granule(&self, samples: u32) {
        self.channel.set_granule(samples)
    }

    fn seconds_to_bytes(&self, seconds: f64) -> u64 {
        self.channel.seconds_to_bytes(seconds)
    }

    fn set_position(&self, bytes: u64, mode: SeekMode) -> Result<(), BackendError> {
        self.channel.set_position(bytes, mode)
    }

    fn set_3d_attributes(&self, attributes: Channel3dAttributes) {
        self.channel.set_3d_attributes(attributes)
    }

    fn set_3d_position(&self, position: Vector3, direction: Vector3, velocity: Vector3) {
        self.channel.set_3d_position(position, direction, velocity)
    }

    fn on_end(&self, callback: EndCallback) {
        self.channel.on_end(callback)
    }
}

impl Drop for MockChannelHandle {
    fn drop(&mut self) {
        self.channel.free();
    }
}
