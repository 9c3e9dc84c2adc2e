use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::error::CodecError;
use crate::traits::codec::{Codec, Decoder, Encoder};
use crate::traits::denoiser::Denoiser;

#[derive(Default)]
struct CodecShared {
    encode_calls: AtomicUsize,
    decode_calls: AtomicUsize,
    failing_encodes: AtomicUsize,
    fail_encoder_creation: AtomicBool,
    fail_decoder_creation: AtomicBool,
    frame_sizes: Mutex<Vec<usize>>,
}

/// 16-bit PCM "codec" that counts calls.
///
/// Packets are little-endian i16 samples, so tests can inspect what the
/// encoder saw. Clones share counters and failure switches.
#[derive(Clone, Default)]
pub struct MockCodec {
    shared: Arc<CodecShared>,
}

impl MockCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encode_calls(&self) -> usize {
        self.shared.encode_calls.load(Ordering::SeqCst)
    }

    pub fn decode_calls(&self) -> usize {
        self.shared.decode_calls.load(Ordering::SeqCst)
    }

    /// Frame length passed to each encode call.
    pub fn encoded_frame_sizes(&self) -> Vec<usize> {
        self.shared.frame_sizes.lock().clone()
    }

    /// Make the next `count` encode calls fail.
    pub fn fail_next_encodes(&self, count: usize) {
        self.shared.failing_encodes.store(count, Ordering::SeqCst);
    }

    pub fn fail_encoder_creation(&self) {
        self.shared.fail_encoder_creation.store(true, Ordering::SeqCst);
    }

    pub fn fail_decoder_creation(&self) {
        self.shared.fail_decoder_creation.store(true, Ordering::SeqCst);
    }

    /// Encode samples the way `MockCodec` encoders do.
    pub fn encode_packet(samples: &[f32]) -> Vec<u8> {
        let mut data = Vec::with_capacity(samples.len() * 2);
        for &sample in samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            data.extend_from_slice(&value.to_le_bytes());
        }
        data
    }

    pub fn decode_packet(packet: &[u8]) -> Vec<f32> {
        packet
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / i16::MAX as f32)
            .collect()
    }
}

impl Codec for MockCodec {
    fn create_encoder(
        &self,
        _sample_rate: u32,
        channels: u16,
        bitrate: u32,
    ) -> Result<Box<dyn Encoder>, CodecError> {
        if self.shared.fail_encoder_creation.load(Ordering::SeqCst) {
            return Err(CodecError::Internal("mock encoder failure".into()));
        }
        if channels != 1 || bitrate == 0 {
            return Err(CodecError::InvalidArgument(format!(
                "{} channels at {} bit/s",
                channels, bitrate
            )));
        }
        Ok(Box::new(MockEncoder {
            shared: Arc::clone(&self.shared),
        }))
    }

    fn create_decoder(&self, _sample_rate: u32, channels: u16) -> Result<Box<dyn Decoder>, CodecError> {
        if self.shared.fail_decoder_creation.load(Ordering::SeqCst) {
            return Err(CodecError::Internal("mock decoder failure".into()));
        }
        if channels != 1 {
            return Err(CodecError::InvalidArgument(format!("{} channels", channels)));
        }
        Ok(Box::new(MockDecoder {
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct MockEncoder {
    shared: Arc<CodecShared>,
}

impl Encoder for MockEncoder {
    fn encode(&mut self, frame: &[f32], packet: &mut [u8]) -> Result<usize, CodecError> {
        self.shared.encode_calls.fetch_add(1, Ordering::SeqCst);
        self.shared.frame_sizes.lock().push(frame.len());

        let failing = self
            .shared
            .failing_encodes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(CodecError::Internal("mock encode failure".into()));
        }

        let encoded = MockCodec::encode_packet(frame);
        if encoded.len() > packet.len() {
            return Err(CodecError::BufferTooSmall);
        }
        packet[..encoded.len()].copy_from_slice(&encoded);
        Ok(encoded.len())
    }
}

struct MockDecoder {
    shared: Arc<CodecShared>,
}

impl Decoder for MockDecoder {
    fn decode(&mut self, packet: &[u8], frame: &mut [f32]) -> Result<usize, CodecError> {
        self.shared.decode_calls.fetch_add(1, Ordering::SeqCst);

        if packet.is_empty() || packet.len() % 2 != 0 {
            return Err(CodecError::CorruptedPacket);
        }
        let samples = MockCodec::decode_packet(packet);
        if samples.len() > frame.len() {
            return Err(CodecError::BufferTooSmall);
        }
        frame[..samples.len()].copy_from_slice(&samples);
        Ok(samples.len())
    }
}

/// Denoiser that scales every frame by a constant and counts frames.
pub struct MockDenoiser {
    factor: f32,
    frames: Arc<AtomicUsize>,
}

impl MockDenoiser {
    pub fn new(factor: f32) -> Self {
        Self {
            factor,
            frames: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared counter of processed frames; stays valid after the denoiser moves.
    pub fn frame_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.frames)
    }
}

impl Denoiser for MockDenoiser {
    fn process_frame(&mut self, frame: &mut [f32]) {
        self.frames.fetch_add(1, Ordering::SeqCst);
        for sample in frame.iter_mut() {
            *sample *= self.factor;
        }
    }
}
