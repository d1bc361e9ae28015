//! Eye-gaze saccades
//!
//! The eyes alternate between a brief glance away and a longer centered hold.
//! Each switch draws a new target and a new interval; the current gaze chases
//! the target through a fixed-rate exponential filter.

use rand::Rng;
use serde::Serialize;
use vera_core::GazeConfig;

const UP_RANGE: (f32, f32) = (0.03, 0.06);
const DOWN_RANGE: (f32, f32) = (-0.06, -0.03);
/// Small lateral drift that accompanies up/down glances.
const GLANCE_DRIFT: f32 = 0.02;
const LATERAL_OFFSET: f32 = 0.04;

/// Eye rotation in radians. Pitch is the vertical component.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct GazeSample {
    pub yaw: f32,
    pub pitch: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EyeGazeState {
    pub current_yaw: f32,
    pub current_pitch: f32,
    pub target_yaw: f32,
    pub target_pitch: f32,
    pub elapsed_since_move: f32,
    pub move_interval: f32,
    pub is_glancing: bool,
}

impl Default for EyeGazeState {
    fn default() -> Self {
        Self {
            current_yaw: 0.0,
            current_pitch: 0.0,
            target_yaw: 0.0,
            target_pitch: 0.0,
            elapsed_since_move: 0.0,
            move_interval: 3.0,
            is_glancing: false,
        }
    }
}

pub struct EyeGazeController {
    config: GazeConfig,
    state: EyeGazeState,
}

impl EyeGazeController {
    pub fn new(config: GazeConfig) -> Self {
        Self {
            config,
            state: EyeGazeState::default(),
        }
    }

    pub fn state(&self) -> &EyeGazeState {
        &self.state
    }

    pub fn sample(&self) -> GazeSample {
        GazeSample {
            yaw: self.state.current_yaw,
            pitch: self.state.current_pitch,
        }
    }

    /// Advance one frame. `head_yaw` is the blended head yaw used for the
    /// eye-contact bias. While `suspended` the eyes are pinned to center and
    /// the saccade timer does not run.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        delta: f32,
        head_yaw: f32,
        suspended: bool,
        rng: &mut R,
    ) -> GazeSample {
        if suspended {
            let s = &mut self.state;
            s.current_yaw = 0.0;
            s.current_pitch = 0.0;
            s.target_yaw = 0.0;
            s.target_pitch = 0.0;
            return self.sample();
        }

        self.state.elapsed_since_move += delta;
        if self.state.elapsed_since_move >= self.state.move_interval {
            self.switch(head_yaw, rng);
        }

        let k = self.config.smoothing;
        let s = &mut self.state;
        s.current_yaw += (s.target_yaw - s.current_yaw) * k;
        s.current_pitch += (s.target_pitch - s.current_pitch) * k;
        self.sample()
    }

    fn switch<R: Rng + ?Sized>(&mut self, head_yaw: f32, rng: &mut R) {
        let cfg = &self.config;
        let glancing = !self.state.is_glancing;
        let (yaw, pitch, interval) = if glancing {
            let (yaw, pitch) = draw_glance(cfg, rng);
            (yaw, pitch, rng.gen_range(cfg.glance_secs[0]..cfg.glance_secs[1]))
        } else {
            (0.0, 0.0, rng.gen_range(cfg.hold_secs[0]..cfg.hold_secs[1]))
        };
        let (yaw, pitch) = bias_and_clamp(yaw, pitch, head_yaw, cfg);

        let s = &mut self.state;
        s.is_glancing = glancing;
        s.target_yaw = yaw;
        s.target_pitch = pitch;
        s.move_interval = interval;
        s.elapsed_since_move = 0.0;
        tracing::trace!(
            "Gaze {} -> ({:.3}, {:.3}) for {:.2}s",
            if glancing { "glance" } else { "center" },
            yaw,
            pitch,
            interval
        );
    }
}

/// Unbiased glance offset: mostly up or down, otherwise a pure lateral look.
fn draw_glance<R: Rng + ?Sized>(cfg: &GazeConfig, rng: &mut R) -> (f32, f32) {
    let roll: f32 = rng.gen();
    if roll < cfg.up_probability {
        (
            rng.gen_range(-GLANCE_DRIFT..GLANCE_DRIFT),
            rng.gen_range(UP_RANGE.0..UP_RANGE.1),
        )
    } else if roll < cfg.up_probability + cfg.down_probability {
        (
            rng.gen_range(-GLANCE_DRIFT..GLANCE_DRIFT),
            rng.gen_range(DOWN_RANGE.0..DOWN_RANGE.1),
        )
    } else if rng.gen_bool(0.5) {
        (LATERAL_OFFSET, 0.0)
    } else {
        (-LATERAL_OFFSET, 0.0)
    }
}

/// Add the eye-contact bias to the vertical component and clamp both.
pub fn bias_and_clamp(yaw: f32, pitch: f32, head_yaw: f32, cfg: &GazeConfig) -> (f32, f32) {
    let head_yaw = if head_yaw.is_finite() { head_yaw } else { 0.0 };
    let pitch = pitch - head_yaw * cfg.head_yaw_bias;
    (
        yaw.clamp(-cfg.limit, cfg.limit),
        pitch.clamp(-cfg.limit, cfg.limit),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_alternates_glance_and_hold() {
        let mut gaze = EyeGazeController::new(GazeConfig::default());
        let mut rng = StdRng::seed_from_u64(3);
        let mut switches = Vec::new();
        let mut last = gaze.state().is_glancing;
        for _ in 0..6000 {
            gaze.update(0.01, 0.0, false, &mut rng);
            let s = gaze.state();
            if s.is_glancing != last {
                switches.push((s.is_glancing, s.move_interval));
                last = s.is_glancing;
            }
        }
        assert!(switches.len() >= 10);
        for (glancing, interval) in switches {
            if glancing {
                assert!((0.5..1.5).contains(&interval));
            } else {
                assert!((2.0..5.0).contains(&interval));
            }
        }
    }

    #[test]
    fn test_smoothing_approaches_target() {
        let mut gaze = EyeGazeController::new(GazeConfig::default());
        let mut rng = StdRng::seed_from_u64(5);
        // First switch happens at the 3 s default interval.
        for _ in 0..301 {
            gaze.update(0.01, 0.0, false, &mut rng);
        }
        let s = gaze.state().clone();
        assert!(s.is_glancing);
        let before = (s.target_pitch - s.current_pitch).abs() + (s.target_yaw - s.current_yaw).abs();
        gaze.update(0.01, 0.0, false, &mut rng);
        let s = gaze.state();
        let after = (s.target_pitch - s.current_pitch).abs() + (s.target_yaw - s.current_yaw).abs();
        assert!(after < before);
    }

    #[test]
    fn test_suspended_pins_center_and_freezes_timer() {
        let mut gaze = EyeGazeController::new(GazeConfig::default());
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..350 {
            gaze.update(0.01, 0.0, false, &mut rng);
        }
        let elapsed = gaze.state().elapsed_since_move;
        let sample = gaze.update(0.5, 0.2, true, &mut rng);
        assert_eq!(sample, GazeSample::default());
        assert_eq!(gaze.state().target_pitch, 0.0);
        assert_eq!(gaze.state().elapsed_since_move, elapsed);
    }

    #[test]
    fn test_bias_is_clamped() {
        let cfg = GazeConfig::default();
        let (_, pitch) = bias_and_clamp(0.0, 0.05, -1.0, &cfg);
        assert_eq!(pitch, 0.08);
        let (_, pitch) = bias_and_clamp(0.0, 0.0, 0.1, &cfg);
        assert!((pitch + 0.03).abs() < 1e-6);
        let (yaw, pitch) = bias_and_clamp(0.5, 0.0, f32::NAN, &cfg);
        assert_eq!((yaw, pitch), (0.08, 0.0));
    }
}
