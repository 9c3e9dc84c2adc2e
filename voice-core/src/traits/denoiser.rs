/// Noise suppression filter (e.g. an RNNoise binding).
///
/// Operates in place on one codec frame at a time and is deterministic.
pub trait Denoiser: Send {
    fn process_frame(&mut self, frame: &mut [f32]);
}

/// Denoiser that leaves frames untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Denoiser for Passthrough {
    fn process_frame(&mut self, _frame: &mut [f32]) {}
}
