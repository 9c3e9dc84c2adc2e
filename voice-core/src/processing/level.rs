/// Peak absolute amplitude of a chunk (0.0 for an empty chunk).
pub fn peak_level(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
}

/// Scale samples in place. Unity gain is a no-op.
pub fn apply_gain(samples: &mut [f32], gain: f32) {
    if gain == 1.0 {
        return;
    }
    for sample in samples.iter_mut() {
        *sample *= gain;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn peak_of_empty_chunk_is_zero() {
        assert_eq!(peak_level(&[]), 0.0);
    }

    #[test]
    fn peak_uses_absolute_value() {
        assert_relative_eq!(peak_level(&[0.1, -0.5, 0.3]), 0.5);
    }

    #[test]
    fn gain_scales_samples() {
        let mut samples = [0.5, -0.25, 1.0];
        apply_gain(&mut samples, 0.5);
        assert_relative_eq!(samples[0], 0.25);
        assert_relative_eq!(samples[1], -0.125);
        assert_relative_eq!(samples[2], 0.5);
    }
}
