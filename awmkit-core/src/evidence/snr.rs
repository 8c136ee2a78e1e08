//! Signal-to-noise ratio over pre-aligned PCM sample slices.

/// Computes the signal-to-noise ratio, in dB, between a `reference` signal
/// and a `test` signal already aligned to it sample-for-sample.
///
/// `snr_db = 10 * log10(sum(reference^2) / sum((reference - test)^2))`.
///
/// Returns `f64::INFINITY` if `test` is bit-identical to `reference`
/// (zero noise energy), and `f64::NEG_INFINITY` if `reference` itself is
/// silent (zero signal energy, making the ratio undefined).
///
/// `reference` and `test` must be the same length; this function does not
/// perform alignment itself (see `orchestrator` for the caller that does).
pub fn signal_to_noise_ratio_db(reference: &[f32], test: &[f32]) -> f64 {
    debug_assert_eq!(reference.len(), test.len(), "slices must be pre-aligned");

    let mut signal_energy = 0.0f64;
    let mut noise_energy = 0.0f64;
    for (&r, &t) in reference.iter().zip(test.iter()) {
        let r = r as f64;
        let t = t as f64;
        signal_energy += r * r;
        let diff = r - t;
        noise_energy += diff * diff;
    }

    if signal_energy == 0.0 {
        return f64::NEG_INFINITY;
    }
    if noise_energy == 0.0 {
        return f64::INFINITY;
    }
    10.0 * (signal_energy / noise_energy).log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_signals_have_infinite_snr() {
        let reference = vec![0.1, -0.2, 0.3, 0.0];
        assert_eq!(signal_to_noise_ratio_db(&reference, &reference), f64::INFINITY);
    }

    #[test]
    fn silent_reference_has_negative_infinite_snr() {
        let reference = vec![0.0; 8];
        let test = vec![0.01; 8];
        assert_eq!(signal_to_noise_ratio_db(&reference, &test), f64::NEG_INFINITY);
    }

    #[test]
    fn larger_noise_lowers_snr() {
        let reference = vec![1.0; 100];
        let small_noise: Vec<f32> = reference.iter().map(|&r| r + 0.01).collect();
        let large_noise: Vec<f32> = reference.iter().map(|&r| r + 0.5).collect();

        let snr_small = signal_to_noise_ratio_db(&reference, &small_noise);
        let snr_large = signal_to_noise_ratio_db(&reference, &large_noise);
        assert!(snr_small > snr_large);
    }
}
