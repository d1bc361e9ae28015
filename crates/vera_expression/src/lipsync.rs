//! Audio-amplitude lip-sync
//!
//! While speaking, mouth openness chases `amplitude * gain` whenever the
//! amplitude clears the deadzone, and decays geometrically otherwise. After
//! speech ends the mouth keeps decaying instead of snapping shut.

use vera_core::{DecayMode, LipSyncConfig};

/// Speaking flag plus the smoothed mouth it drives.
///
/// INVARIANT: `mouth_openness` and `current_amplitude` stay in [0, 1].
#[derive(Debug, Clone)]
pub struct SpeakingState {
    config: LipSyncConfig,
    is_speaking: bool,
    mouth_openness: f32,
    current_amplitude: f32,
}

impl SpeakingState {
    pub fn new(config: LipSyncConfig) -> Self {
        Self {
            config,
            is_speaking: false,
            mouth_openness: 0.0,
            current_amplitude: 0.0,
        }
    }

    /// Returns false if already speaking (re-entrant start is a no-op).
    pub fn start(&mut self) -> bool {
        if self.is_speaking {
            return false;
        }
        self.is_speaking = true;
        true
    }

    /// Returns false if not speaking.
    pub fn stop(&mut self) -> bool {
        if !self.is_speaking {
            return false;
        }
        self.is_speaking = false;
        self.current_amplitude = 0.0;
        true
    }

    pub fn is_speaking(&self) -> bool {
        self.is_speaking
    }

    pub fn mouth_openness(&self) -> f32 {
        self.mouth_openness
    }

    pub fn current_amplitude(&self) -> f32 {
        self.current_amplitude
    }

    /// Secondary smile while the voice is audible.
    pub fn joy(&self) -> f32 {
        if self.is_speaking && self.current_amplitude > self.config.deadzone {
            self.config.joy_weight
        } else {
            0.0
        }
    }

    /// Advance one frame with the polled amplitude. Ignored while silent.
    pub fn update(&mut self, amplitude: f32, delta: f32) {
        let amplitude = if self.is_speaking {
            sanitize_amplitude(amplitude)
        } else {
            0.0
        };
        self.current_amplitude = amplitude;

        let cfg = &self.config;
        let frames = delta.max(0.0) * cfg.reference_fps;
        if amplitude > cfg.deadzone {
            let target = amplitude * cfg.gain;
            let alpha = match cfg.decay_mode {
                DecayMode::PerFrame => cfg.attack,
                DecayMode::TimeScaled => 1.0 - (1.0 - cfg.attack).powf(frames),
            };
            self.mouth_openness += (target - self.mouth_openness) * alpha;
        } else {
            let factor = match cfg.decay_mode {
                DecayMode::PerFrame => cfg.decay,
                DecayMode::TimeScaled => cfg.decay.powf(frames),
            };
            self.mouth_openness *= factor;
        }
        self.mouth_openness = self.mouth_openness.clamp(0.0, 1.0);
    }
}

fn sanitize_amplitude(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        tracing::warn!("Non-finite audio amplitude {}, treating as silence", v);
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: f32 = 1.0 / 60.0;

    fn speaking(mode: DecayMode) -> SpeakingState {
        let mut s = SpeakingState::new(LipSyncConfig {
            decay_mode: mode,
            ..LipSyncConfig::default()
        });
        assert!(s.start());
        s
    }

    #[test]
    fn test_start_stop_are_guarded() {
        let mut s = SpeakingState::new(LipSyncConfig::default());
        assert!(!s.stop());
        assert!(s.start());
        assert!(!s.start());
        assert!(s.stop());
        assert!(!s.is_speaking());
    }

    #[test]
    fn test_per_frame_attack_matches_formula() {
        let mut s = speaking(DecayMode::PerFrame);
        s.update(0.5, FRAME);
        // 0 + (0.75 - 0) * 0.4
        assert!((s.mouth_openness() - 0.3).abs() < 1e-6);
        assert!((s.joy() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_per_frame_decay_ignores_delta() {
        let mut a = speaking(DecayMode::PerFrame);
        let mut b = speaking(DecayMode::PerFrame);
        a.update(0.5, FRAME);
        b.update(0.5, FRAME);
        a.update(0.0, FRAME);
        b.update(0.0, 10.0 * FRAME);
        assert!((a.mouth_openness() - 0.24).abs() < 1e-6);
        assert_eq!(a.mouth_openness(), b.mouth_openness());
        assert_eq!(a.joy(), 0.0);
    }

    #[test]
    fn test_time_scaled_matches_per_frame_at_reference_rate() {
        let mut a = speaking(DecayMode::PerFrame);
        let mut b = speaking(DecayMode::TimeScaled);
        for amp in [0.4, 0.6, 0.01, 0.0, 0.3] {
            a.update(amp, FRAME);
            b.update(amp, FRAME);
            assert!((a.mouth_openness() - b.mouth_openness()).abs() < 1e-4);
        }
    }

    #[test]
    fn test_time_scaled_decay_is_frame_rate_independent() {
        let mut fast = speaking(DecayMode::TimeScaled);
        let mut slow = speaking(DecayMode::TimeScaled);
        fast.update(0.6, FRAME);
        slow.update(0.6, FRAME);
        // 0.2 s of silence at 120 fps vs 30 fps
        for _ in 0..24 {
            fast.update(0.0, 1.0 / 120.0);
        }
        for _ in 0..6 {
            slow.update(0.0, 1.0 / 30.0);
        }
        assert!(fast.mouth_openness() > 0.01);
        assert!((fast.mouth_openness() - slow.mouth_openness()).abs() < 1e-5);
    }

    #[test]
    fn test_loud_audio_saturates_at_one() {
        let mut s = speaking(DecayMode::PerFrame);
        for _ in 0..100 {
            s.update(1.0, FRAME);
        }
        assert!(s.mouth_openness() <= 1.0);
        assert!(s.mouth_openness() > 0.99);
    }

    #[test]
    fn test_stop_lets_mouth_decay() {
        let mut s = speaking(DecayMode::TimeScaled);
        s.update(0.6, FRAME);
        let open = s.mouth_openness();
        s.stop();
        s.update(0.9, FRAME); // amplitude ignored once silent
        assert!(s.mouth_openness() < open);
        assert!(s.mouth_openness() > 0.0);
        assert_eq!(s.current_amplitude(), 0.0);
    }

    #[test]
    fn test_nan_amplitude_is_silence() {
        let mut s = speaking(DecayMode::PerFrame);
        s.update(f32::NAN, FRAME);
        assert_eq!(s.current_amplitude(), 0.0);
        assert_eq!(s.mouth_openness(), 0.0);
    }
}
