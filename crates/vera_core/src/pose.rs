//! Pose vectors, the fixed pose tables and the pose blender
//!
//! A pose is six joint-rotation offsets in radians. The blender is a
//! first-order exponential filter: `current += (target - current) * rate`.
//! For `rate` in (0, 1] each component approaches its target monotonically
//! and never overshoots.

use serde::{Deserialize, Serialize};

/// Six joint-rotation offsets describing one authored stance.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseVector {
    pub head_yaw: f32,
    pub head_pitch: f32,
    pub head_roll: f32,
    pub spine_yaw: f32,
    pub spine_roll: f32,
    pub chest_yaw: f32,
}

impl PoseVector {
    pub const NEUTRAL: PoseVector = PoseVector::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0);

    pub const fn new(
        head_yaw: f32,
        head_pitch: f32,
        head_roll: f32,
        spine_yaw: f32,
        spine_roll: f32,
        chest_yaw: f32,
    ) -> Self {
        Self {
            head_yaw,
            head_pitch,
            head_roll,
            spine_yaw,
            spine_roll,
            chest_yaw,
        }
    }

    /// Neutral pose with only the head turned (sneeze and shy targets).
    pub const fn head(yaw: f32, pitch: f32) -> Self {
        Self::new(yaw, pitch, 0.0, 0.0, 0.0, 0.0)
    }

    pub fn components(&self) -> [f32; 6] {
        [
            self.head_yaw,
            self.head_pitch,
            self.head_roll,
            self.spine_yaw,
            self.spine_roll,
            self.chest_yaw,
        ]
    }

    pub fn from_components(c: [f32; 6]) -> Self {
        Self::new(c[0], c[1], c[2], c[3], c[4], c[5])
    }

    /// One blender step toward `target`.
    pub fn step_toward(&self, target: &PoseVector, rate: f32) -> PoseVector {
        let cur = self.components();
        let tgt = target.components();
        let mut out = [0.0; 6];
        for i in 0..6 {
            out[i] = cur[i] + (tgt[i] - cur[i]) * rate;
        }
        PoseVector::from_components(out)
    }

    /// Largest per-component absolute difference.
    pub fn max_abs_diff(&self, other: &PoseVector) -> f32 {
        self.components()
            .iter()
            .zip(other.components().iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f32::max)
    }
}

// ============================================================================
// Pose tables
// ============================================================================

/// Idle stances with spine and chest follow-through. Entry 0 is neutral.
pub const FULL_POSE_TABLE: [PoseVector; 13] = [
    PoseVector::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0),
    PoseVector::new(0.15, 0.0, 0.0, 0.05, 0.0, 0.03),
    PoseVector::new(0.2, 0.03, 0.0, 0.08, 0.0, 0.05),
    PoseVector::new(-0.15, 0.0, 0.0, -0.05, 0.0, -0.03),
    PoseVector::new(-0.2, 0.03, 0.0, -0.08, 0.0, -0.05),
    PoseVector::new(0.05, 0.0, 0.1, 0.02, 0.03, 0.0),
    PoseVector::new(-0.05, 0.0, -0.1, -0.02, -0.03, 0.0),
    PoseVector::new(0.12, 0.04, 0.08, 0.04, 0.02, 0.03),
    PoseVector::new(-0.12, 0.04, -0.08, -0.04, -0.02, -0.03),
    PoseVector::new(0.05, 0.08, 0.06, 0.02, 0.02, 0.0),
    PoseVector::new(0.0, -0.1, 0.0, 0.0, 0.0, 0.0),
    PoseVector::new(0.08, 0.0, 0.05, 0.03, 0.04, 0.02),
    PoseVector::new(-0.08, 0.0, -0.05, -0.03, -0.04, -0.02),
];

/// Head-only stances; spine and chest stay at rest.
pub const HEAD_ONLY_POSE_TABLE: [PoseVector; 13] = [
    PoseVector::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0),
    PoseVector::new(0.15, 0.0, 0.0, 0.0, 0.0, 0.0),
    PoseVector::new(0.2, 0.03, 0.0, 0.0, 0.0, 0.0),
    PoseVector::new(-0.15, 0.0, 0.0, 0.0, 0.0, 0.0),
    PoseVector::new(-0.2, 0.03, 0.0, 0.0, 0.0, 0.0),
    PoseVector::new(0.05, 0.0, 0.1, 0.0, 0.0, 0.0),
    PoseVector::new(-0.05, 0.0, -0.1, 0.0, 0.0, 0.0),
    PoseVector::new(0.12, 0.04, 0.08, 0.0, 0.0, 0.0),
    PoseVector::new(-0.12, 0.04, -0.08, 0.0, 0.0, 0.0),
    PoseVector::new(0.05, 0.08, 0.06, 0.0, 0.0, 0.0),
    PoseVector::new(0.0, -0.1, 0.0, 0.0, 0.0, 0.0),
    PoseVector::new(0.08, 0.0, 0.05, 0.0, 0.0, 0.0),
    PoseVector::new(-0.08, 0.0, -0.05, 0.0, 0.0, 0.0),
];

/// Which fixed table the idle selector samples from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseTableKind {
    #[default]
    Full,
    HeadOnly,
}

impl PoseTableKind {
    pub fn poses(&self) -> &'static [PoseVector] {
        match self {
            Self::Full => &FULL_POSE_TABLE,
            Self::HeadOnly => &HEAD_ONLY_POSE_TABLE,
        }
    }

    /// Default `[min, max)` band for the idle change interval, in seconds.
    pub fn default_interval(&self) -> (f32, f32) {
        match self {
            Self::Full => (2.5, 6.5),
            Self::HeadOnly => (2.0, 6.0),
        }
    }
}

// ============================================================================
// Pose state + blender
// ============================================================================

/// Smallest accepted transition rate; zero would freeze the blender.
const MIN_TRANSITION_RATE: f32 = 0.001;

/// Blended pose plus the idle selector's bookkeeping.
///
/// `current` is only written by [`PoseState::blend`]. `target` and
/// `transition_rate` are only written through [`PoseState::retarget`].
#[derive(Debug, Clone, PartialEq)]
pub struct PoseState {
    pub current: PoseVector,
    pub target: PoseVector,
    pub transition_rate: f32,
    pub idle_elapsed: f32,
    pub next_change_interval: f32,
}

impl Default for PoseState {
    fn default() -> Self {
        Self {
            current: PoseVector::NEUTRAL,
            target: PoseVector::NEUTRAL,
            transition_rate: 0.02,
            idle_elapsed: 0.0,
            next_change_interval: 3.0,
        }
    }
}

impl PoseState {
    /// Assert a new target and the rate at which to approach it.
    /// The rate is clamped into (0, 1].
    pub fn retarget(&mut self, target: PoseVector, rate: f32) {
        self.target = target;
        self.transition_rate = if rate.is_finite() {
            rate.clamp(MIN_TRANSITION_RATE, 1.0)
        } else {
            tracing::warn!("Non-finite transition rate, keeping {}", self.transition_rate);
            self.transition_rate
        };
    }

    /// Restart the idle countdown with a fresh interval.
    pub fn reset_idle(&mut self, next_interval: f32) {
        self.idle_elapsed = 0.0;
        self.next_change_interval = next_interval;
    }

    /// One pose blender step.
    pub fn blend(&mut self) {
        self.current = self.current.step_toward(&self.target, self.transition_rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_start_neutral() {
        assert_eq!(FULL_POSE_TABLE[0], PoseVector::NEUTRAL);
        assert_eq!(HEAD_ONLY_POSE_TABLE[0], PoseVector::NEUTRAL);
        for pose in HEAD_ONLY_POSE_TABLE.iter() {
            assert_eq!(pose.spine_yaw, 0.0);
            assert_eq!(pose.spine_roll, 0.0);
            assert_eq!(pose.chest_yaw, 0.0);
        }
    }

    #[test]
    fn test_blend_converges() {
        let mut state = PoseState::default();
        state.retarget(FULL_POSE_TABLE[2], 0.05);
        for _ in 0..500 {
            state.blend();
        }
        assert!(state.current.max_abs_diff(&state.target) < 1e-4);
    }

    #[test]
    fn test_rate_one_snaps() {
        let mut state = PoseState::default();
        state.retarget(PoseVector::head(0.15, 0.15), 1.0);
        state.blend();
        assert!(state.current.max_abs_diff(&state.target) < 1e-7);
    }

    #[test]
    fn test_retarget_clamps_rate() {
        let mut state = PoseState::default();
        state.retarget(PoseVector::NEUTRAL, 3.0);
        assert_eq!(state.transition_rate, 1.0);
        state.retarget(PoseVector::NEUTRAL, 0.0);
        assert_eq!(state.transition_rate, MIN_TRANSITION_RATE);
        state.retarget(PoseVector::NEUTRAL, f32::NAN);
        assert_eq!(state.transition_rate, MIN_TRANSITION_RATE);
    }

    #[test]
    fn test_table_kind_intervals() {
        assert_eq!(PoseTableKind::Full.default_interval(), (2.5, 6.5));
        assert_eq!(PoseTableKind::HeadOnly.default_interval(), (2.0, 6.0));
        assert_eq!(PoseTableKind::Full.poses().len(), 13);
    }

    #[test]
    fn test_head_only_table_mirrors_full_heads() {
        let head_only = PoseTableKind::HeadOnly.poses();
        assert_eq!(head_only.len(), FULL_POSE_TABLE.len());
        for (h, f) in head_only.iter().zip(FULL_POSE_TABLE.iter()) {
            assert_eq!(
                (h.head_yaw, h.head_pitch, h.head_roll),
                (f.head_yaw, f.head_pitch, f.head_roll)
            );
        }
    }
}
