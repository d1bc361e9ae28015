//! Loudness from frequency-bin magnitudes
//!
//! A host analyser hands over byte magnitudes per frequency bin. The mouth is
//! driven by their mean, normalised to [0, 1].

use std::f32::consts::PI;

/// `sum(bins) / (n * 255)`; zero for an empty frame.
pub fn mean_bin_amplitude(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    let sum: u64 = bins.iter().map(|b| *b as u64).sum();
    sum as f32 / (bins.len() as f32 * 255.0)
}

/// Deterministic speech-like loudness: syllable pulses under a slow phrase
/// contour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyllableEnvelope {
    pub syllables_per_sec: f32,
    /// Loudest mean bin level, in [0, 1]
    pub peak: f32,
}

impl Default for SyllableEnvelope {
    fn default() -> Self {
        Self {
            syllables_per_sec: 4.0,
            peak: 0.6,
        }
    }
}

impl SyllableEnvelope {
    /// Loudness `t` seconds into a clip.
    pub fn amplitude_at(&self, t: f32) -> f32 {
        if !t.is_finite() || t < 0.0 {
            return 0.0;
        }
        let pulse = (PI * self.syllables_per_sec * t).sin().abs().sqrt();
        let phrase = 0.75 + 0.25 * (t * 1.3).sin();
        (pulse * phrase * self.peak).clamp(0.0, 1.0)
    }

    /// Analyser frame with a falling spectral tilt whose mean bin level is
    /// close to `amplitude_at(t)`.
    pub fn bins_at(&self, t: f32, bin_count: usize) -> Vec<u8> {
        let level = self.amplitude_at(t);
        if bin_count == 0 {
            return Vec::new();
        }
        (0..bin_count)
            .map(|i| {
                // Tilt from 1.5x at the lowest bin to 0.5x at the highest; mean 1.0.
                let tilt = 1.5 - i as f32 / (bin_count.max(2) - 1) as f32;
                (level * tilt * 255.0).round().clamp(0.0, 255.0) as u8
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_bin_amplitude() {
        assert_eq!(mean_bin_amplitude(&[]), 0.0);
        assert_eq!(mean_bin_amplitude(&[255, 255]), 1.0);
        assert_eq!(mean_bin_amplitude(&[0, 0, 0]), 0.0);
        assert!((mean_bin_amplitude(&[255, 0]) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_envelope_is_bounded_and_pulses() {
        let env = SyllableEnvelope::default();
        let samples: Vec<f32> = (0..1000).map(|i| env.amplitude_at(i as f32 * 0.01)).collect();
        assert!(samples.iter().all(|a| (0.0..=1.0).contains(a)));
        // Gaps between syllables fall under the lip-sync deadzone
        assert!(samples.iter().any(|a| *a < 0.02));
        assert!(samples.iter().any(|a| *a > 0.3));
        assert_eq!(env.amplitude_at(-1.0), 0.0);
    }

    #[test]
    fn test_bins_round_trip_to_level() {
        let env = SyllableEnvelope::default();
        for i in 0..50 {
            let t = 0.13 + i as f32 * 0.07;
            let level = env.amplitude_at(t);
            let mean = mean_bin_amplitude(&env.bins_at(t, 32));
            assert!((mean - level).abs() < 0.01, "t={} level={} mean={}", t, level, mean);
        }
    }
}
