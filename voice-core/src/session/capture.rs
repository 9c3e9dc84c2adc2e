use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::devices;
use crate::models::config::CaptureConfig;
use crate::models::error::{BackendError, VoiceError};
use crate::models::state::CaptureState;
use crate::processing::level;
use crate::processing::ring_buffer::RingBuffer;
use crate::traits::capture_backend::{CaptureBackend, CaptureChannel, CaptureSink};
use crate::traits::codec::{Codec, Encoder};
use crate::traits::denoiser::Denoiser;

/// Called with each encoded packet, on the capture thread.
pub type PacketCallback = Box<dyn FnMut(&[u8]) + Send>;

/// Called with each raw captured chunk and its peak level, on the capture thread.
pub type RawInputCallback = Box<dyn FnMut(&[f32], f32) + Send>;

/// Counters for debugging a capture session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub chunks_received: u64,
    pub samples_received: u64,
    /// Samples that did not fit in the ring buffer.
    pub samples_dropped: u64,
    pub frames_encoded: u64,
    /// Frames lost to encode failures or oversized packets.
    pub frames_dropped: u64,
}

/// Frame accumulation → denoise → encode, run on the capture thread.
///
/// Field order is teardown order: encoder before denoiser.
struct FramePipeline {
    encoder: Box<dyn Encoder>,
    denoiser: Box<dyn Denoiser>,
    buffer: RingBuffer<f32>,
    frame: Vec<f32>,
    packet: Vec<u8>,
    denoise_enabled: Arc<AtomicBool>,
    on_packet: Option<PacketCallback>,
    on_raw_input: Option<RawInputCallback>,
    stats: CaptureStats,
}

impl FramePipeline {
    fn process(&mut self, samples: &[f32]) {
        self.stats.chunks_received += 1;
        self.stats.samples_received += samples.len() as u64;

        if let Some(cb) = self.on_raw_input.as_mut() {
            cb(samples, level::peak_level(samples));
        }

        let accepted = self.buffer.write(samples);
        if accepted < samples.len() {
            self.stats.samples_dropped += (samples.len() - accepted) as u64;
            log::trace!("capture buffer full, dropped {} samples", samples.len() - accepted);
        }

        while self.buffer.read_available() >= self.frame.len() {
            let count = self.buffer.read(&mut self.frame);

            if self.denoise_enabled.load(Ordering::Relaxed) {
                self.denoiser.process_frame(&mut self.frame[..count]);
            }

            match self.encoder.encode(&self.frame[..count], &mut self.packet) {
                Ok(len) if len <= self.packet.len() => {
                    self.stats.frames_encoded += 1;
                    if let Some(cb) = self.on_packet.as_mut() {
                        cb(&self.packet[..len]);
                    }
                }
                Ok(len) => {
                    self.stats.frames_dropped += 1;
                    log::trace!("dropping {}-byte packet over the {}-byte limit", len, self.packet.len());
                }
                Err(e) => {
                    self.stats.frames_dropped += 1;
                    log::trace!("dropping frame: {}", e);
                }
            }
        }
    }
}

/// Sink registered with the backend; forwards into the shared pipeline.
struct PipelineSink {
    pipeline: Arc<Mutex<FramePipeline>>,
}

impl CaptureSink for PipelineSink {
    fn on_captured_samples(&mut self, samples: &[f32]) {
        self.pipeline.lock().process(samples);
    }
}

/// Microphone capture bound to one input device.
///
/// Captured chunks are accumulated into fixed-size frames, optionally
/// denoised, encoded, and handed to the packet callback:
/// ```text
/// [Backend capture thread] → [RingBuffer] → frame → (denoise) → encode → on_packet
///                          ↘ on_raw_input(chunk, peak)
/// ```
/// Frames that fail to encode are dropped; the capture thread never stalls.
///
/// Dropping the session releases the device binding first, then the
/// encoder, then the denoiser.
pub struct CaptureSession {
    channel: Option<Box<dyn CaptureChannel>>,
    pipeline: Arc<Mutex<FramePipeline>>,
    backend: Arc<dyn CaptureBackend>,
    denoise_enabled: Arc<AtomicBool>,
    config: CaptureConfig,
    device_id: Option<String>,
    gain: f32,
    enabled: bool,
}

impl CaptureSession {
    /// Bind the configured capture device and create the encoder.
    ///
    /// The device starts paused; call `enable` to begin capturing.
    pub fn open(
        backend: Arc<dyn CaptureBackend>,
        codec: &dyn Codec,
        denoiser: Box<dyn Denoiser>,
        config: CaptureConfig,
    ) -> Result<Self, VoiceError> {
        config.validate().map_err(VoiceError::Configuration)?;

        let encoder = codec
            .create_encoder(config.sample_rate, 1, config.bitrate)
            .map_err(|e| {
                VoiceError::CodecInit(format!(
                    "couldn't create encoder at {} bit/s: {}",
                    config.bitrate, e
                ))
            })?;

        let denoise_enabled = Arc::new(AtomicBool::new(false));
        let pipeline = Arc::new(Mutex::new(FramePipeline {
            encoder,
            denoiser,
            buffer: RingBuffer::new(config.buffer_capacity),
            frame: vec![0.0; config.frame_size],
            packet: vec![0; config.max_packet_size],
            denoise_enabled: Arc::clone(&denoise_enabled),
            on_packet: None,
            on_raw_input: None,
            stats: CaptureStats::default(),
        }));

        let device_id = devices::requested_id(config.device_id.as_deref()).map(str::to_owned);
        let channel = Self::bind(&*backend, device_id.as_deref(), &config, &pipeline)?;

        let mut session = Self {
            channel: Some(channel),
            pipeline,
            backend,
            denoise_enabled,
            config,
            device_id,
            gain: 1.0,
            enabled: false,
        };
        session.set_gain(session.gain);

        log::info!(
            "capture opened on {} at {} Hz, {}-sample frames",
            session.device_label(),
            session.config.sample_rate,
            session.config.frame_size
        );
        Ok(session)
    }

    pub fn state(&self) -> CaptureState {
        match (&self.channel, self.enabled) {
            (None, _) => CaptureState::NoDevice,
            (Some(_), true) => CaptureState::Capturing,
            (Some(_), false) => CaptureState::Paused,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn is_denoise_enabled(&self) -> bool {
        self.denoise_enabled.load(Ordering::Relaxed)
    }

    /// Identifier of the bound device, None for the default device.
    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn stats(&self) -> CaptureStats {
        self.pipeline.lock().stats
    }

    /// Samples buffered but not yet part of a full frame.
    pub fn buffered_samples(&self) -> usize {
        self.pipeline.lock().buffer.read_available()
    }

    /// Start capturing. Fails if already capturing.
    pub fn enable(&mut self) -> Result<(), VoiceError> {
        if self.enabled {
            return Err(VoiceError::InvalidState("input already enabled".into()));
        }
        let channel = self
            .channel
            .as_mut()
            .ok_or_else(|| VoiceError::InvalidState("no capture device".into()))?;

        channel
            .play()
            .map_err(|e| VoiceError::DeviceStart(format!("couldn't start capture: {}", e)))?;
        self.enabled = true;
        Ok(())
    }

    /// Pause capturing. Fails if already paused.
    pub fn disable(&mut self) -> Result<(), VoiceError> {
        if !self.enabled {
            return Err(VoiceError::InvalidState("input already disabled".into()));
        }
        let channel = self
            .channel
            .as_mut()
            .ok_or_else(|| VoiceError::InvalidState("no capture device".into()))?;

        channel
            .pause()
            .map_err(|e| VoiceError::DeviceStart(format!("couldn't pause capture: {}", e)))?;
        self.enabled = false;
        Ok(())
    }

    /// Set the input volume. Kept across device changes.
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
        if let Some(channel) = self.channel.as_mut() {
            channel.set_volume(gain);
        }
    }

    /// Toggle noise suppression; takes effect on the next drained frame.
    pub fn set_denoise_enabled(&self, enabled: bool) {
        self.denoise_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn set_packet_callback(&self, callback: PacketCallback) {
        self.pipeline.lock().on_packet = Some(callback);
    }

    pub fn set_raw_input_callback(&self, callback: RawInputCallback) {
        self.pipeline.lock().on_raw_input = Some(callback);
    }

    pub fn clear_callbacks(&self) {
        let mut pipeline = self.pipeline.lock();
        pipeline.on_packet = None;
        pipeline.on_raw_input = None;
    }

    /// Rebind to another capture device, keeping gain and enabled state.
    ///
    /// On failure the session is left without a device (`CaptureState::NoDevice`);
    /// a later successful `change_device` recovers it.
    pub fn change_device(&mut self, device_id: Option<&str>) -> Result<(), VoiceError> {
        // Release the old binding before opening the new one.
        self.channel = None;
        self.pipeline.lock().buffer.clear();

        let device_id = devices::requested_id(device_id).map(str::to_owned);
        let channel = match Self::bind(&*self.backend, device_id.as_deref(), &self.config, &self.pipeline) {
            Ok(channel) => channel,
            Err(e) => {
                log::error!("capture device change failed: {}", e);
                self.device_id = device_id;
                return Err(e);
            }
        };

        self.channel = Some(channel);
        self.device_id = device_id;
        self.set_gain(self.gain);

        if self.enabled {
            if let Some(channel) = self.channel.as_mut() {
                channel.play().map_err(|e| {
                    VoiceError::DeviceStart(format!("couldn't resume capture: {}", e))
                })?;
            }
        }

        log::info!("capture switched to {}", self.device_label());
        Ok(())
    }

    fn bind(
        backend: &dyn CaptureBackend,
        device_id: Option<&str>,
        config: &CaptureConfig,
        pipeline: &Arc<Mutex<FramePipeline>>,
    ) -> Result<Box<dyn CaptureChannel>, VoiceError> {
        let index = match device_id {
            None => None,
            Some(id) => Some(devices::find_capture_device(backend, id).ok_or_else(|| {
                VoiceError::DeviceOpen(format!("couldn't open capture device {}", id))
            })?),
        };

        let sink = Box::new(PipelineSink {
            pipeline: Arc::clone(pipeline),
        });

        backend
            .open_capture(index, config.sample_rate, config.frames_per_buffer, sink)
            .map_err(|e| {
                let label = device_id.unwrap_or("default");
                match &e {
                    BackendError::Failed(_) => {
                        VoiceError::DeviceStart(format!("couldn't start capture on device {}: {}", label, e))
                    }
                    _ => VoiceError::DeviceOpen(format!("couldn't open capture device {}: {}", label, e)),
                }
            })
    }

    fn device_label(&self) -> &str {
        self.device_id.as_deref().unwrap_or("default device")
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.channel = None;
        log::debug!("capture session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::device::{DeviceInfo, DeviceKind};
    use crate::testing::{MockCaptureBackend, MockCodec, MockDenoiser};
    use approx::assert_relative_eq;

    fn backend() -> Arc<MockCaptureBackend> {
        Arc::new(MockCaptureBackend::with_devices(vec![
            DeviceInfo::new("mic-a", "Mic A", DeviceKind::Microphone),
            DeviceInfo::new("mic-b", "Mic B", DeviceKind::Headset),
        ]))
    }

    fn open(backend: &Arc<MockCaptureBackend>, codec: &MockCodec) -> CaptureSession {
        CaptureSession::open(
            backend.clone(),
            codec,
            Box::new(MockDenoiser::new(0.5)),
            CaptureConfig::default(),
        )
        .unwrap()
    }

    fn collect_packets(session: &CaptureSession) -> Arc<Mutex<Vec<Vec<u8>>>> {
        let packets = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&packets);
        session.set_packet_callback(Box::new(move |p| sink.lock().push(p.to_vec())));
        packets
    }

    #[test]
    fn opens_paused() {
        let backend = backend();
        let session = open(&backend, &MockCodec::new());

        assert_eq!(session.state(), CaptureState::Paused);
        assert!(!backend.is_playing());
        assert_relative_eq!(backend.volume(), 1.0);
    }

    #[test]
    fn frames_are_chunked_across_pushes() {
        let backend = backend();
        let codec = MockCodec::new();
        let session = open(&backend, &codec);
        let packets = collect_packets(&session);

        backend.deliver(&[0.1; 2000]);
        assert_eq!(codec.encode_calls(), 2);
        assert_eq!(session.buffered_samples(), 80);

        backend.deliver(&[0.1; 40]);
        assert_eq!(codec.encode_calls(), 2);
        assert_eq!(session.buffered_samples(), 120);

        backend.deliver(&[0.1; 840]);
        assert_eq!(codec.encode_calls(), 3);
        assert_eq!(session.buffered_samples(), 0);
        assert_eq!(packets.lock().len(), 3);
    }

    #[test]
    fn raw_callback_sees_chunk_and_peak() {
        let backend = backend();
        let session = open(&backend, &MockCodec::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        session.set_raw_input_callback(Box::new(move |chunk, peak| {
            sink.lock().push((chunk.len(), peak));
        }));

        backend.deliver(&[0.1, -0.7, 0.3]);

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, 3);
        assert_relative_eq!(seen[0].1, 0.7);
    }

    #[test]
    fn failed_encode_drops_only_that_frame() {
        let backend = backend();
        let codec = MockCodec::new();
        let session = open(&backend, &codec);
        let packets = collect_packets(&session);

        codec.fail_next_encodes(1);
        backend.deliver(&[0.2; 960 * 3]);

        assert_eq!(codec.encode_calls(), 3);
        assert_eq!(packets.lock().len(), 2);
        let stats = session.stats();
        assert_eq!(stats.frames_encoded, 2);
        assert_eq!(stats.frames_dropped, 1);
    }

    #[test]
    fn oversized_packets_are_dropped() {
        let backend = backend();
        let codec = MockCodec::new();
        let config = CaptureConfig {
            max_packet_size: 100,
            ..Default::default()
        };
        let session =
            CaptureSession::open(backend.clone(), &codec, Box::new(MockDenoiser::new(1.0)), config)
                .unwrap();
        let packets = collect_packets(&session);

        backend.deliver(&[0.2; 960]);

        assert_eq!(codec.encode_calls(), 1);
        assert!(packets.lock().is_empty());
        assert_eq!(session.stats().frames_dropped, 1);
    }

    #[test]
    fn denoise_toggle_keeps_frame_cadence() {
        let backend = backend();
        let codec = MockCodec::new();
        let session = open(&backend, &codec);
        let packets = collect_packets(&session);

        backend.deliver(&[0.5; 960]);
        session.set_denoise_enabled(true);
        backend.deliver(&[0.5; 960]);
        session.set_denoise_enabled(false);
        backend.deliver(&[0.5; 960]);

        assert_eq!(codec.encode_calls(), 3);
        assert_eq!(codec.encoded_frame_sizes(), vec![960, 960, 960]);

        let packets = packets.lock();
        let first = MockCodec::decode_packet(&packets[0]);
        let second = MockCodec::decode_packet(&packets[1]);
        assert_relative_eq!(first[0], 0.5, epsilon = 1e-3);
        assert_relative_eq!(second[0], 0.25, epsilon = 1e-3);
    }

    #[test]
    fn overflowing_chunk_drops_newest_samples() {
        let backend = backend();
        let codec = MockCodec::new();
        let config = CaptureConfig {
            buffer_capacity: 1000,
            ..Default::default()
        };
        let session =
            CaptureSession::open(backend.clone(), &codec, Box::new(MockDenoiser::new(1.0)), config)
                .unwrap();

        backend.deliver(&[0.1; 1500]);

        // 1000 accepted: one frame encoded, 40 left over.
        assert_eq!(codec.encode_calls(), 1);
        assert_eq!(session.buffered_samples(), 40);
        assert_eq!(session.stats().samples_dropped, 500);
    }

    #[test]
    fn enable_and_disable_are_not_repeatable() {
        let backend = backend();
        let mut session = open(&backend, &MockCodec::new());

        assert!(session.enable().is_ok());
        assert!(backend.is_playing());
        assert!(matches!(session.enable(), Err(VoiceError::InvalidState(_))));

        assert!(session.disable().is_ok());
        assert!(!backend.is_playing());
        assert!(matches!(session.disable(), Err(VoiceError::InvalidState(_))));
    }

    #[test]
    fn gain_reaches_channel() {
        let backend = backend();
        let mut session = open(&backend, &MockCodec::new());

        session.set_gain(0.25);
        assert_relative_eq!(backend.volume(), 0.25);
        assert_relative_eq!(session.gain(), 0.25);
    }

    #[test]
    fn unknown_device_fails_to_open() {
        let backend = backend();
        let config = CaptureConfig {
            device_id: Some("missing".into()),
            ..Default::default()
        };
        let result = CaptureSession::open(
            backend.clone(),
            &MockCodec::new(),
            Box::new(MockDenoiser::new(1.0)),
            config,
        );
        assert!(matches!(result, Err(VoiceError::DeviceOpen(_))));
        assert_eq!(backend.open_count(), 0);
    }

    #[test]
    fn encoder_failure_is_codec_init_error() {
        let backend = backend();
        let codec = MockCodec::new();
        codec.fail_encoder_creation();

        let result = CaptureSession::open(
            backend.clone(),
            &codec,
            Box::new(MockDenoiser::new(1.0)),
            CaptureConfig::default(),
        );
        assert!(matches!(result, Err(VoiceError::CodecInit(_))));
        assert_eq!(backend.open_count(), 0);
    }

    #[test]
    fn change_device_restores_gain_and_enabled_state() {
        let backend = backend();
        let mut session = open(&backend, &MockCodec::new());
        session.set_gain(0.4);
        session.enable().unwrap();

        session.change_device(Some("mic-b")).unwrap();

        assert_eq!(backend.opened_devices(), vec![None, Some(1)]);
        assert_eq!(session.device_id(), Some("mic-b"));
        assert!(backend.is_playing());
        assert_relative_eq!(backend.volume(), 0.4);
        assert_eq!(session.state(), CaptureState::Capturing);
    }

    #[test]
    fn change_device_keeps_paused_state() {
        let backend = backend();
        let mut session = open(&backend, &MockCodec::new());

        session.change_device(Some("mic-a")).unwrap();

        assert!(!backend.is_playing());
        assert_eq!(session.state(), CaptureState::Paused);
    }

    #[test]
    fn failed_device_change_leaves_session_without_device() {
        let backend = backend();
        let mut session = open(&backend, &MockCodec::new());
        session.enable().unwrap();

        let result = session.change_device(Some("missing"));

        assert!(matches!(result, Err(VoiceError::DeviceOpen(_))));
        assert_eq!(session.state(), CaptureState::NoDevice);
        assert!(!backend.has_binding());
        assert!(matches!(session.disable(), Err(VoiceError::InvalidState(_))));

        session.change_device(None).unwrap();
        assert_eq!(session.state(), CaptureState::Capturing);
    }

    #[test]
    fn change_device_discards_partial_frame() {
        let backend = backend();
        let codec = MockCodec::new();
        let mut session = open(&backend, &codec);

        backend.deliver(&[0.1; 500]);
        session.change_device(Some("mic-b")).unwrap();
        backend.deliver(&[0.1; 500]);

        assert_eq!(codec.encode_calls(), 0);
        assert_eq!(session.buffered_samples(), 500);
    }

    #[test]
    fn drop_releases_device() {
        let backend = backend();
        let session = open(&backend, &MockCodec::new());
        assert!(backend.has_binding());

        drop(session);
        assert!(!backend.has_binding());
    }
}
