use crate::models::error::CodecError;

/// Compresses fixed-size frames into packets.
pub trait Encoder: Send {
    /// Encode `frame` into `packet`, returning the packet length in bytes.
    fn encode(&mut self, frame: &[f32], packet: &mut [u8]) -> Result<usize, CodecError>;
}

/// Expands packets back into samples.
pub trait Decoder: Send {
    /// Decode one packet into `frame`, returning the number of samples written.
    fn decode(&mut self, packet: &[u8], frame: &mut [f32]) -> Result<usize, CodecError>;
}

/// Factory for encoder/decoder instances (e.g. an Opus binding).
pub trait Codec: Send + Sync {
    fn create_encoder(
        &self,
        sample_rate: u32,
        channels: u16,
        bitrate: u32,
    ) -> Result<Box<dyn Encoder>, CodecError>;

    fn create_decoder(&self, sample_rate: u32, channels: u16) -> Result<Box<dyn Decoder>, CodecError>;
}
