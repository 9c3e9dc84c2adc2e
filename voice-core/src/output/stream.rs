use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::error::VoiceError;
use crate::models::spatial::{SpatialAttributes, Vector3};
use crate::models::state::{StreamKind, StreamState};
use crate::output::engine::EngineShared;
use crate::output::queue::RemoteSource;
use crate::processing::level;
use crate::processing::ring_buffer::{RingBuffer, RingConsumer, RingProducer};
use crate::traits::codec::{Codec, Decoder};
use crate::traits::playback_backend::{
    DownloadObserver, OutputChannel, PlaybackBackend, PlaybackSource, SeekMode,
};

/// Largest frame one packet can decode to (120 ms at 48 kHz).
pub const DECODE_SCRATCH_SAMPLES: usize = 5760;

/// Samples per pull requested for local streams.
pub const LOCAL_GRANULE: u32 = 480;

/// Invoked once when the backend reports the end of a stream's source.
pub type EndOfStreamCallback = Box<dyn FnOnce() + Send>;

/// Opaque stream identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(Uuid);

impl StreamId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pull side of a local stream, run on the backend's mixing thread.
struct RingFeed {
    consumer: RingConsumer<f32>,
}

impl PlaybackSource for RingFeed {
    fn process_output(&mut self, out: &mut [f32]) -> usize {
        if self.consumer.is_empty() {
            return 0;
        }
        let count = out.len().min(self.consumer.read_available());
        self.consumer.read(&mut out[..count])
    }
}

/// Start offset still waiting for the download to reach it, in seconds.
struct DeferredStart {
    offset_secs: AtomicU32,
}

/// Seeks a URL channel to its start offset once enough data has arrived,
/// then starts playback.
struct StartOffsetObserver {
    start: Arc<DeferredStart>,
}

impl DownloadObserver for StartOffsetObserver {
    fn on_download(&mut self, channel: &dyn OutputChannel) {
        let offset = self.start.offset_secs.load(Ordering::Acquire);
        if offset == 0 {
            return;
        }

        let bytes = channel.seconds_to_bytes(offset as f64);
        let _ = channel.set_position(bytes, SeekMode::DecodeTo);
        if channel.set_position(bytes, SeekMode::Byte).is_err() {
            return;
        }

        if self
            .start
            .offset_secs
            .compare_exchange(offset, 0, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            if let Err(e) = channel.play() {
                log::warn!("couldn't start stream at {}s: {}", offset, e);
            }
        }
    }
}

/// End-of-source notification shared with the backend's end callback.
struct EndOfStream {
    callback: Mutex<Option<EndOfStreamCallback>>,
    fired: AtomicBool,
    detached: AtomicBool,
}

impl EndOfStream {
    fn new() -> Self {
        Self {
            callback: Mutex::new(None),
            fired: AtomicBool::new(false),
            detached: AtomicBool::new(false),
        }
    }

    fn fire(&self) {
        if self.detached.load(Ordering::Acquire) || self.fired.swap(true, Ordering::AcqRel) {
            return;
        }
        let callback = self.callback.lock().take();
        if let Some(callback) = callback {
            callback();
        }
    }

    fn detach(&self) {
        self.detached.store(true, Ordering::Release);
        self.callback.lock().take();
    }
}

enum Feed {
    Local {
        decoder: Box<dyn Decoder>,
        producer: RingProducer<f32>,
        scratch: Vec<f32>,
    },
    Remote {
        url: String,
        start: Arc<DeferredStart>,
    },
}

/// Everything the control thread needs to build a stream.
pub(crate) struct StreamEnv {
    pub backend: Arc<dyn PlaybackBackend>,
    pub codec: Arc<dyn Codec>,
    pub sample_rate: u32,
    pub buffer_capacity: usize,
    pub engine: Weak<EngineShared>,
}

/// One playback source: a device channel plus its feed, gain and spatial
/// state.
///
/// Local streams are fed by `push` / `push_encoded` through a ring buffer
/// the backend drains on its mixing thread:
/// ```text
/// push_encoded → decode → extra gain → [RingBuffer] → mixing thread pull
/// ```
/// Remote streams are fed by the backend from a URL.
///
/// Spatial setters only record state; `update` and `set_spatial_enabled`
/// push it to the device.
///
/// A stream must be dropped before the `PlaybackEngine` that created it.
/// Dropping the stream frees its device channel without firing the
/// end-of-stream callback.
pub struct Stream {
    id: StreamId,
    channel: Box<dyn OutputChannel>,
    feed: Feed,
    end: Arc<EndOfStream>,
    spatial: SpatialAttributes,
    gain: f32,
    muted: bool,
    extra_gain: f32,
    engine: Weak<EngineShared>,
}

/// Build the stream a request asks for: local without a remote source,
/// URL-fed otherwise. Runs on the control thread.
pub(crate) fn create_stream(remote: Option<RemoteSource>, env: &StreamEnv) -> Result<Stream, VoiceError> {
    let stream = match remote {
        None => Stream::local(env)?,
        Some(source) => Stream::remote(source, env)?,
    };

    log::debug!("created {:?} stream {}", stream.kind(), stream.id);
    Ok(stream)
}

impl Stream {
    fn local(env: &StreamEnv) -> Result<Self, VoiceError> {
        let (producer, consumer) = RingBuffer::new(env.buffer_capacity).split();

        let channel = env
            .backend
            .create_push_channel(env.sample_rate, Box::new(RingFeed { consumer }))
            .map_err(|e| VoiceError::DeviceOpen(format!("couldn't create local stream: {}", e)))?;

        let decoder = env
            .codec
            .create_decoder(env.sample_rate, 1)
            .map_err(|e| VoiceError::CodecInit(format!("decoder at {} Hz: {}", env.sample_rate, e)))?;

        let stream = Self::with_channel(
            channel,
            Feed::Local {
                decoder,
                producer,
                scratch: vec![0.0; DECODE_SCRATCH_SAMPLES],
            },
            env,
        );
        stream.channel.set_granule(LOCAL_GRANULE);
        stream
            .channel
            .play()
            .map_err(|e| VoiceError::DeviceStart(e.to_string()))?;
        Ok(stream)
    }

    fn remote(source: RemoteSource, env: &StreamEnv) -> Result<Self, VoiceError> {
        let start = Arc::new(DeferredStart {
            offset_secs: AtomicU32::new(source.start_offset_secs),
        });

        let observer = StartOffsetObserver {
            start: Arc::clone(&start),
        };
        let channel = env
            .backend
            .create_url_channel(&source.url, Box::new(observer))
            .map_err(|e| VoiceError::DeviceOpen(format!("couldn't open {}: {}", source.url, e)))?;

        let stream = Self::with_channel(
            channel,
            Feed::Remote {
                url: source.url,
                start,
            },
            env,
        );
        if source.start_offset_secs == 0 {
            stream
                .channel
                .play()
                .map_err(|e| VoiceError::DeviceStart(e.to_string()))?;
        }
        Ok(stream)
    }

    fn with_channel(channel: Box<dyn OutputChannel>, feed: Feed, env: &StreamEnv) -> Self {
        let end = Arc::new(EndOfStream::new());
        let on_end = Arc::clone(&end);
        channel.on_end(Box::new(move || on_end.fire()));

        if let Some(engine) = env.engine.upgrade() {
            engine.stream_opened();
        }

        Self {
            id: StreamId::new(),
            channel,
            feed,
            end,
            spatial: SpatialAttributes::default(),
            gain: 1.0,
            muted: false,
            extra_gain: 1.0,
            engine: env.engine.clone(),
        }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn kind(&self) -> StreamKind {
        match self.feed {
            Feed::Local { .. } => StreamKind::Local,
            Feed::Remote { .. } => StreamKind::RemoteUrl,
        }
    }

    pub fn state(&self) -> StreamState {
        if self.end.fired.load(Ordering::Acquire) {
            StreamState::Ended
        } else {
            StreamState::Active
        }
    }

    /// Source URL of a remote stream.
    pub fn url(&self) -> Option<&str> {
        match &self.feed {
            Feed::Remote { url, .. } => Some(url),
            Feed::Local { .. } => None,
        }
    }

    /// Start offset a remote stream is still waiting to reach, if any.
    pub fn pending_start_offset(&self) -> Option<u32> {
        match &self.feed {
            Feed::Remote { start, .. } => {
                Some(start.offset_secs.load(Ordering::Acquire)).filter(|&secs| secs > 0)
            }
            Feed::Local { .. } => None,
        }
    }

    /// Samples waiting in a local stream's buffer.
    pub fn buffered_samples(&self) -> usize {
        match &self.feed {
            Feed::Local { producer, .. } => producer.capacity() - producer.write_available(),
            Feed::Remote { .. } => 0,
        }
    }

    /// Queue raw samples for playback. Returns how many fit.
    pub fn push(&mut self, samples: &[f32]) -> Result<usize, VoiceError> {
        match &mut self.feed {
            Feed::Local { producer, .. } => {
                let accepted = producer.write(samples);
                if accepted < samples.len() {
                    log::trace!("stream {} full, dropped {} samples", self.id, samples.len() - accepted);
                }
                Ok(accepted)
            }
            Feed::Remote { .. } => Err(VoiceError::Unsupported("push on a URL stream".into())),
        }
    }

    /// Decode one packet, scale it by the extra gain and queue it.
    ///
    /// Returns the number of samples queued. A packet that fails to decode
    /// is dropped and reported as zero samples.
    pub fn push_encoded(&mut self, packet: &[u8]) -> Result<usize, VoiceError> {
        let Feed::Local {
            decoder,
            producer,
            scratch,
        } = &mut self.feed
        else {
            return Err(VoiceError::Unsupported("push_encoded on a URL stream".into()));
        };

        let decoded = match decoder.decode(packet, scratch) {
            Ok(count) => count.min(scratch.len()),
            Err(e) => {
                log::trace!("stream {} dropping packet: {}", self.id, e);
                return Ok(0);
            }
        };

        let frame = &mut scratch[..decoded];
        level::apply_gain(frame, self.extra_gain);

        let accepted = producer.write(frame);
        if accepted < decoded {
            log::trace!("stream {} full, dropped {} samples", self.id, decoded - accepted);
        }
        Ok(accepted)
    }

    pub fn set_position(&mut self, position: Vector3) {
        self.spatial.position = position;
    }

    pub fn set_velocity(&mut self, velocity: Vector3) {
        self.spatial.velocity = velocity;
    }

    pub fn set_direction(&mut self, direction: Vector3) {
        self.spatial.direction = direction;
    }

    pub fn set_min_distance(&mut self, distance: f32) {
        self.spatial.min_distance = distance;
    }

    pub fn set_max_distance(&mut self, distance: f32) {
        self.spatial.max_distance = distance;
    }

    pub fn set_rolloff_factor(&mut self, rolloff: f32) {
        self.spatial.rolloff_factor = rolloff;
    }

    /// Switch between positional and non-positional playback.
    pub fn set_spatial_enabled(&mut self, enabled: bool) {
        if self.spatial.enabled == enabled {
            return;
        }
        self.spatial.enabled = enabled;
        self.apply_spatial();
    }

    /// Push the current spatial attributes to the device.
    pub fn update(&self) {
        self.apply_spatial();
    }

    pub fn spatial(&self) -> &SpatialAttributes {
        &self.spatial
    }

    /// Set channel volume. While muted the value is stored for `unmute`.
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
        if !self.muted {
            self.channel.set_volume(gain);
        }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn mute(&mut self) {
        self.muted = true;
        self.channel.set_volume(0.0);
    }

    pub fn unmute(&mut self) {
        self.muted = false;
        self.channel.set_volume(self.gain);
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Scale applied to decoded packets before they are buffered.
    pub fn set_extra_gain(&mut self, gain: f32) {
        self.extra_gain = gain;
    }

    pub fn extra_gain(&self) -> f32 {
        self.extra_gain
    }

    /// Register the callback for natural end of the source, replacing any
    /// earlier one. Never called for a dropped stream.
    pub fn on_end_of_stream<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        *self.end.callback.lock() = Some(Box::new(callback));
    }

    /// Preferred number of samples per device pull.
    pub fn set_granularity(&self, samples: u32) {
        self.channel.set_granule(samples);
    }

    pub fn is_playing(&self) -> bool {
        self.channel.is_playing()
    }

    pub fn pause(&self) -> Result<(), VoiceError> {
        self.channel
            .pause()
            .map_err(|e| VoiceError::InvalidState(format!("couldn't pause stream {}: {}", self.id, e)))
    }

    pub fn resume(&self) -> Result<(), VoiceError> {
        self.channel
            .play()
            .map_err(|e| VoiceError::DeviceStart(format!("couldn't resume stream {}: {}", self.id, e)))
    }

    fn apply_spatial(&self) {
        self.channel.set_3d_attributes(self.spatial.channel_attributes());
        if self.spatial.enabled {
            self.channel.set_3d_position(
                self.spatial.position,
                self.spatial.direction,
                self.spatial.velocity,
            );
        }
        if let Some(engine) = self.engine.upgrade() {
            engine.backend().apply_3d();
        }
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("state", &self.state())
            .field("gain", &self.gain)
            .field("muted", &self.muted)
            .finish()
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        self.end.detach();
        if let Some(engine) = self.engine.upgrade() {
            engine.stream_closed();
        }
        log::debug!("stream {} released", self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::atomic::AtomicUsize;

    use crate::models::spatial::Mode3d;
    use crate::testing::{BackendCall, MockCodec, MockPlaybackBackend};

    struct Fixture {
        mock: Arc<MockPlaybackBackend>,
        codec: MockCodec,
        env: StreamEnv,
    }

    fn fixture(capacity: usize) -> Fixture {
        let mock = Arc::new(MockPlaybackBackend::new());
        let codec = MockCodec::new();
        let env = StreamEnv {
            backend: Arc::clone(&mock) as Arc<dyn PlaybackBackend>,
            codec: Arc::new(codec.clone()),
            sample_rate: 48_000,
            buffer_capacity: capacity,
            engine: Weak::new(),
        };
        Fixture { mock, codec, env }
    }

    fn remote(url: &str, offset: u32) -> Option<RemoteSource> {
        Some(RemoteSource {
            url: url.into(),
            start_offset_secs: offset,
        })
    }

    #[test]
    fn local_stream_starts_playing_with_voice_granule() {
        let fx = fixture(8192);
        let stream = create_stream(None, &fx.env).unwrap();

        assert_eq!(stream.kind(), StreamKind::Local);
        assert_eq!(stream.state(), StreamState::Active);
        assert!(stream.is_playing());
        assert_eq!(fx.mock.channel(0).granule(), Some(LOCAL_GRANULE));
        assert!(stream.url().is_none());
    }

    #[test]
    fn pull_returns_partial_data_without_ending() {
        let fx = fixture(8192);
        let mut stream = create_stream(None, &fx.env).unwrap();

        assert_eq!(stream.push(&[0.5; 300]).unwrap(), 300);

        let mut out = vec![0.0; 1024];
        assert_eq!(fx.mock.pull(0, &mut out), 300);
        assert!(out[..300].iter().all(|&s| s == 0.5));
        assert_eq!(stream.state(), StreamState::Active);

        assert_eq!(fx.mock.pull(0, &mut out), 0);
        assert_eq!(stream.state(), StreamState::Active);
    }

    #[test]
    fn pull_fills_whole_request_when_enough_is_buffered() {
        let fx = fixture(8192);
        let mut stream = create_stream(None, &fx.env).unwrap();

        stream.push(&[0.25; 1000]).unwrap();
        let mut out = vec![0.0; 480];
        assert_eq!(fx.mock.pull(0, &mut out), 480);
        assert_eq!(stream.buffered_samples(), 520);
    }

    #[test]
    fn push_drops_newest_on_overflow() {
        let fx = fixture(100);
        let mut stream = create_stream(None, &fx.env).unwrap();

        assert_eq!(stream.push(&[1.0; 80]).unwrap(), 80);
        assert_eq!(stream.push(&[2.0; 50]).unwrap(), 20);

        let mut out = vec![0.0; 200];
        assert_eq!(fx.mock.pull(0, &mut out), 100);
        assert!(out[..80].iter().all(|&s| s == 1.0));
        assert!(out[80..100].iter().all(|&s| s == 2.0));
    }

    #[test]
    fn push_encoded_decodes_and_applies_extra_gain() {
        let fx = fixture(8192);
        let mut stream = create_stream(None, &fx.env).unwrap();
        stream.set_extra_gain(2.0);
        stream.set_gain(0.3);

        let packet = MockCodec::encode_packet(&[0.25; 960]);
        assert_eq!(stream.push_encoded(&packet).unwrap(), 960);
        assert_eq!(fx.codec.decode_calls(), 1);

        let mut out = vec![0.0; 960];
        assert_eq!(fx.mock.pull(0, &mut out), 960);
        for sample in out {
            assert_relative_eq!(sample, 0.5, epsilon = 1e-3);
        }
        assert_relative_eq!(fx.mock.channel(0).volume(), 0.3);
    }

    #[test]
    fn undecodable_packet_is_dropped() {
        let fx = fixture(8192);
        let mut stream = create_stream(None, &fx.env).unwrap();

        assert_eq!(stream.push_encoded(&[1, 2, 3]).unwrap(), 0);
        assert_eq!(stream.buffered_samples(), 0);

        let packet = MockCodec::encode_packet(&[0.1; 480]);
        assert_eq!(stream.push_encoded(&packet).unwrap(), 480);
    }

    #[test]
    fn remote_stream_rejects_pushed_audio() {
        let fx = fixture(8192);
        let mut stream = create_stream(remote("https://example.com/a.mp3", 0), &fx.env).unwrap();

        assert!(matches!(stream.push(&[0.0; 10]), Err(VoiceError::Unsupported(_))));
        assert!(matches!(stream.push_encoded(&[0, 0]), Err(VoiceError::Unsupported(_))));
        assert_eq!(stream.url(), Some("https://example.com/a.mp3"));
        assert_eq!(stream.kind(), StreamKind::RemoteUrl);
    }

    #[test]
    fn remote_stream_without_offset_plays_immediately() {
        let fx = fixture(8192);
        let stream = create_stream(remote("https://example.com/a.mp3", 0), &fx.env).unwrap();

        assert!(stream.is_playing());
        assert_eq!(stream.pending_start_offset(), None);

        fx.mock.download(0);
        assert!(fx.mock.channel(0).seeks().is_empty());
    }

    #[test]
    fn deferred_offset_holds_playback_until_reachable() {
        let fx = fixture(8192);
        fx.mock.set_urls_unseekable(true);
        let stream = create_stream(remote("https://example.com/a.mp3", 30), &fx.env).unwrap();

        assert!(!stream.is_playing());
        assert_eq!(stream.pending_start_offset(), Some(30));

        fx.mock.download(0);
        assert!(!stream.is_playing());
        assert_eq!(stream.pending_start_offset(), Some(30));

        fx.mock.channel(0).set_seekable(true);
        fx.mock.download(0);
        assert!(stream.is_playing());
        assert_eq!(stream.pending_start_offset(), None);

        let expected = 30 * 48_000 * 4;
        let seeks = fx.mock.channel(0).seeks();
        assert_eq!(seeks.last(), Some(&(expected, SeekMode::Byte)));
        assert!(seeks.contains(&(expected, SeekMode::DecodeTo)));

        // Offset is cleared; later downloads leave the position alone.
        let before = seeks.len();
        fx.mock.download(0);
        assert_eq!(fx.mock.channel(0).seeks().len(), before);
    }

    #[test]
    fn spatial_setters_wait_for_update() {
        let fx = fixture(8192);
        let mut stream = create_stream(None, &fx.env).unwrap();

        stream.set_position(Vector3::new(1.0, 2.0, 3.0));
        stream.set_min_distance(2.0);
        stream.set_max_distance(50.0);
        assert!(fx.mock.channel(0).attribute_history().is_empty());

        stream.set_spatial_enabled(true);
        let history = fx.mock.channel(0).attribute_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].mode, Mode3d::Normal);
        assert_relative_eq!(history[0].min_distance, 2.0);
        assert_relative_eq!(history[0].max_distance, 50.0);
        assert_eq!(
            fx.mock.channel(0).position().map(|(p, _, _)| p),
            Some(Vector3::new(1.0, 2.0, 3.0))
        );

        // Unchanged flag is a no-op.
        stream.set_spatial_enabled(true);
        assert_eq!(fx.mock.channel(0).attribute_history().len(), 1);

        stream.set_position(Vector3::new(4.0, 0.0, 0.0));
        stream.update();
        assert_eq!(fx.mock.channel(0).attribute_history().len(), 2);
        assert_eq!(
            fx.mock.channel(0).position().map(|(p, _, _)| p),
            Some(Vector3::new(4.0, 0.0, 0.0))
        );

        stream.set_spatial_enabled(false);
        let history = fx.mock.channel(0).attribute_history();
        assert_eq!(history.last().map(|a| a.mode), Some(Mode3d::Off));
    }

    #[test]
    fn spatial_apply_without_engine_skips_backend_recompute() {
        let fx = fixture(8192);
        let mut stream = create_stream(None, &fx.env).unwrap();
        fx.mock.clear_calls();

        stream.set_spatial_enabled(true);
        assert!(!fx.mock.calls().contains(&BackendCall::Apply3d));
    }

    #[test]
    fn mute_and_unmute_restore_gain() {
        let fx = fixture(8192);
        let mut stream = create_stream(None, &fx.env).unwrap();
        let channel = fx.mock.channel(0);

        stream.set_gain(0.7);
        stream.mute();
        assert!(stream.is_muted());
        assert_relative_eq!(channel.volume(), 0.0);

        stream.set_gain(0.4);
        assert_relative_eq!(channel.volume(), 0.0);

        stream.unmute();
        assert!(!stream.is_muted());
        assert_relative_eq!(channel.volume(), 0.4);
        assert_relative_eq!(stream.gain(), 0.4);
    }

    #[test]
    fn end_of_stream_fires_once() {
        let fx = fixture(8192);
        let stream = create_stream(remote("https://example.com/a.mp3", 0), &fx.env).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        stream.on_end_of_stream(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        fx.mock.finish(0);
        fx.mock.finish(0);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(stream.state(), StreamState::Ended);
    }

    #[test]
    fn dropping_stream_frees_channel_without_end_callback() {
        let fx = fixture(8192);
        let stream = create_stream(None, &fx.env).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        stream.on_end_of_stream(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let channel = fx.mock.channel(0);
        drop(stream);

        assert!(channel.is_freed());
        fx.mock.finish(0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn pause_and_resume_toggle_playback() {
        let fx = fixture(8192);
        let stream = create_stream(None, &fx.env).unwrap();

        stream.pause().unwrap();
        assert!(!stream.is_playing());
        stream.resume().unwrap();
        assert!(stream.is_playing());

        stream.set_granularity(960);
        assert_eq!(fx.mock.channel(0).granule(), Some(960));
    }

    #[test]
    fn decoder_failure_is_a_codec_error() {
        let fx = fixture(8192);
        fx.codec.fail_decoder_creation();

        let err = create_stream(None, &fx.env).unwrap_err();
        assert!(matches!(err, VoiceError::CodecInit(_)));
    }

    #[test]
    fn unreachable_url_is_a_device_error() {
        let fx = fixture(8192);
        fx.mock.fail_url("https://example.com/missing.mp3");

        let err = create_stream(remote("https://example.com/missing.mp3", 0), &fx.env).unwrap_err();
        assert!(matches!(err, VoiceError::DeviceOpen(_)));
    }

    #[test]
    fn streams_get_distinct_ids() {
        let fx = fixture(8192);
        let a = create_stream(None, &fx.env).unwrap();
        let b = create_stream(None, &fx.env).unwrap();
        assert_ne!(a.id(), b.id());
        assert_ne!(a.id().to_string(), b.id().to_string());
    }
}
