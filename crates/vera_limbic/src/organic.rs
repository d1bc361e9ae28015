//! Organic motion floor
//!
//! Breathing, weight shift, body sway and limb micro-sway. Always on,
//! independent of behavior state, and small enough to be added on top of
//! whatever pose is being held.

use serde::Serialize;
use std::f32::consts::TAU;
use std::f64::consts::TAU as TAU_F64;
use vera_core::JointRotation;

// Breathing
const BREATH_RATE: f32 = 0.8;
const BREATH_VARIATION_HZ: f64 = 0.1;
const BREATH_VARIATION_DEPTH: f32 = 0.15;
const BREATH_AMPLITUDE: f32 = 0.003;
const ROOT_BOB_AMPLITUDE: f32 = 0.002;

// Weight shift
const SHIFT_RATE: f32 = 0.15;
const SHIFT_DEPTH_RATIO: f32 = 0.7;
const SHIFT_LATERAL: f32 = 0.012;
const SHIFT_DEPTH: f32 = 0.006;

/// Per-joint weights of the breathing signal.
pub const BREATH_WEIGHT_CHEST: f32 = 1.2;
pub const BREATH_WEIGHT_SPINE: f32 = 0.8;
pub const BREATH_WEIGHT_HEAD: f32 = 0.5;

/// Organic offsets for one frame. Radians, except `root_bob` (scene units).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct OrganicOffsets {
    /// Unweighted breathing pitch
    pub breath: f32,
    pub root_bob: f32,
    /// Lateral (roll) weight shift
    pub shift_lateral: f32,
    /// Front/back (pitch) weight shift
    pub shift_depth: f32,
    /// Unweighted body sway
    pub sway: f32,
    pub left_shoulder_roll: f32,
    pub right_shoulder_roll: f32,
    pub left_upper_arm: JointRotation,
    pub left_lower_arm: JointRotation,
    pub right_upper_arm: JointRotation,
    pub right_lower_arm: JointRotation,
}

/// Phase accumulators for the breathing and weight-shift generators.
#[derive(Debug, Clone, Default)]
pub struct OrganicMotion {
    breath_phase: f32,
    shift_phase_lateral: f32,
    shift_phase_depth: f32,
}

impl OrganicMotion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn breath_phase(&self) -> f32 {
        self.breath_phase
    }

    /// Advance the accumulators by `delta` and sample every generator at `time`.
    pub fn update(&mut self, time: f64, delta: f32) -> OrganicOffsets {
        let variation =
            1.0 + BREATH_VARIATION_DEPTH * wave(time, TAU_F64 * BREATH_VARIATION_HZ, 0.0);
        self.breath_phase = (self.breath_phase + delta * BREATH_RATE * variation) % TAU;
        self.shift_phase_lateral = (self.shift_phase_lateral + delta * SHIFT_RATE) % TAU;
        self.shift_phase_depth =
            (self.shift_phase_depth + delta * SHIFT_RATE * SHIFT_DEPTH_RATIO) % TAU;

        let breath_wave = self.breath_phase.sin();

        OrganicOffsets {
            breath: breath_wave * BREATH_AMPLITUDE,
            root_bob: breath_wave * ROOT_BOB_AMPLITUDE,
            shift_lateral: self.shift_phase_lateral.sin() * SHIFT_LATERAL,
            shift_depth: self.shift_phase_depth.sin() * SHIFT_DEPTH,
            sway: sway(time),
            left_shoulder_roll: wave(time, 0.35, 0.0) * 0.01 + wave(time, 0.13, 0.5) * 0.005,
            right_shoulder_roll: -(wave(time, 0.38, 1.0) * 0.01 + wave(time, 0.17, 2.0) * 0.005),
            left_upper_arm: JointRotation::new(
                wave(time, 0.4, 0.0) * 0.015,
                0.0,
                wave(time, 0.6, 0.0) * 0.02 + wave(time, 0.27, 0.0) * 0.01,
            ),
            left_lower_arm: JointRotation::new(wave(time, 0.5, 0.0) * 0.015, 0.0, 0.0),
            right_upper_arm: JointRotation::new(
                wave(time, 0.5, 0.0) * 0.015,
                0.0,
                wave(time, 0.7, 0.0) * 0.02 + wave(time, 0.31, 0.0) * 0.01,
            ),
            right_lower_arm: JointRotation::new(wave(time, 0.6, 0.0) * 0.015, 0.0, 0.0),
        }
    }
}

/// `sin(time * rate + phase)`, evaluated in `f64` so large `time` stays smooth.
pub(crate) fn wave(time: f64, rate: f64, phase: f64) -> f32 {
    (time * rate + phase).sin() as f32
}

/// Three incommensurate low-frequency sines, roughly 0.17 to 0.3 Hz.
fn sway(time: f64) -> f32 {
    wave(time, TAU_F64 * 0.17, 0.0) * 0.004
        + wave(time, TAU_F64 * 0.23, 1.3) * 0.003
        + wave(time, TAU_F64 * 0.3, 2.1) * 0.002
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(seconds: f32, dt: f32) -> Vec<OrganicOffsets> {
        let mut motion = OrganicMotion::new();
        let steps = (seconds / dt) as usize;
        (1..=steps)
            .map(|i| motion.update(i as f64 * dt as f64, dt))
            .collect()
    }

    #[test]
    fn test_offsets_stay_small() {
        for o in run(120.0, 1.0 / 30.0) {
            assert!(o.breath.abs() <= BREATH_AMPLITUDE + 1e-6);
            assert!(o.root_bob.abs() <= ROOT_BOB_AMPLITUDE + 1e-6);
            assert!(o.shift_lateral.abs() <= SHIFT_LATERAL + 1e-6);
            assert!(o.shift_depth.abs() <= SHIFT_DEPTH + 1e-6);
            assert!(o.sway.abs() <= 0.009 + 1e-6);
            assert!(o.left_shoulder_roll.abs() <= 0.015 + 1e-6);
            assert!(o.right_upper_arm.z.abs() <= 0.03 + 1e-6);
        }
    }

    #[test]
    fn test_breathing_actually_moves() {
        let samples = run(20.0, 1.0 / 60.0);
        let max = samples.iter().map(|o| o.breath).fold(f32::MIN, f32::max);
        let min = samples.iter().map(|o| o.breath).fold(f32::MAX, f32::min);
        assert!(max > 0.0025);
        assert!(min < -0.0025);
    }

    #[test]
    fn test_zero_delta_holds_phases() {
        let mut motion = OrganicMotion::new();
        motion.update(1.0, 0.5);
        let phase = motion.breath_phase();
        motion.update(1.0, 0.0);
        assert_eq!(motion.breath_phase(), phase);
    }

    #[test]
    fn test_left_and_right_limbs_differ() {
        let o = run(3.0, 0.1).pop().unwrap();
        assert_ne!(o.left_upper_arm, o.right_upper_arm);
        assert_ne!(o.left_shoulder_roll, -o.right_shoulder_roll);
    }
}
