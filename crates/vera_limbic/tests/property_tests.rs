//! Property-based tests for vera_limbic.
//!
//! Envelope bounds, sneeze phase layout and the gaze clamp must hold for any
//! timing, any configuration in range and any head pose.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use vera_core::{AvatarEvent, FrameTime, GazeConfig, VeraConfig};
use vera_limbic::{
    bias_and_clamp, dance_intensity, phase_at, AvatarController, BehaviorMode, EyeGazeController,
    SneezePhase,
};

// ============================================================================
// Strategies
// ============================================================================

/// (duration, fade) with room for a full-intensity plateau.
fn arb_envelope() -> impl Strategy<Value = (f32, f32)> {
    (0.1f32..5.0, 2.0f32..4.0).prop_map(|(fade, k)| (fade * k, fade))
}

fn arb_phase_durations() -> impl Strategy<Value = [f32; 4]> {
    proptest::array::uniform4(0.05f32..3.0)
}

// ============================================================================
// Dance envelope
// ============================================================================

proptest! {
    #[test]
    fn intensity_is_bounded((duration, fade) in arb_envelope(), frac in 0.0f32..=1.0) {
        let t = duration * frac;
        let i = dance_intensity(t, duration, fade);
        prop_assert!((0.0..=1.0).contains(&i));
    }

    #[test]
    fn intensity_endpoints((duration, fade) in arb_envelope()) {
        prop_assert_eq!(dance_intensity(0.0, duration, fade), 0.0);
        prop_assert_eq!(dance_intensity(duration, duration, fade), 0.0);
        prop_assert!((dance_intensity(fade, duration, fade) - 1.0).abs() < 1e-5);
    }
}

// ============================================================================
// Sneeze phases
// ============================================================================

proptest! {
    /// Sampled in order, phases never go backwards, never skip past the end
    /// and the time within a phase never exceeds its duration.
    #[test]
    fn sneeze_phases_are_contiguous(
        durations in arb_phase_durations(),
        mut samples in proptest::collection::vec(0.0f32..1.0, 1..200),
    ) {
        let total: f32 = durations.iter().sum();
        samples.sort_by(|a, b| a.total_cmp(b));

        let mut last_index = 0usize;
        for frac in samples {
            let elapsed = frac * total;
            let (phase, within) = match phase_at(elapsed, &durations) {
                Some(p) => p,
                None => {
                    prop_assert!(elapsed >= total);
                    continue;
                }
            };
            let index = SneezePhase::ALL.iter().position(|p| *p == phase).unwrap();
            prop_assert!(index >= last_index);
            prop_assert!(within >= -1e-5);
            prop_assert!(within <= durations[index] + 1e-4);
            last_index = index;
        }
        prop_assert!(phase_at(total, &durations).is_none());
        prop_assert_eq!(phase_at(0.0, &durations).map(|p| p.0), Some(SneezePhase::BuildUp));
    }
}

// ============================================================================
// Gaze
// ============================================================================

proptest! {
    /// The vertical target stays inside the clamp whatever the head does.
    #[test]
    fn gaze_bias_never_escapes_clamp(
        pitch in -0.06f32..0.06,
        yaw in -0.04f32..0.04,
        head_yaw in -50.0f32..50.0,
    ) {
        let cfg = GazeConfig::default();
        let (y, p) = bias_and_clamp(yaw, pitch, head_yaw, &cfg);
        prop_assert!(p.abs() <= cfg.limit);
        prop_assert!(y.abs() <= cfg.limit);
    }

    #[test]
    fn gaze_state_stays_clamped(
        seed in any::<u64>(),
        head in proptest::collection::vec(-3.0f32..3.0, 50..400),
    ) {
        let cfg = GazeConfig::default();
        let limit = cfg.limit;
        let mut gaze = EyeGazeController::new(cfg);
        let mut rng = StdRng::seed_from_u64(seed);
        for h in head {
            gaze.update(0.05, h, false, &mut rng);
            let s = gaze.state();
            prop_assert!(s.target_pitch.abs() <= limit);
            prop_assert!(s.target_yaw.abs() <= limit);
            prop_assert!(s.current_pitch.abs() <= limit + 1e-6);
            prop_assert!(s.current_yaw.abs() <= limit + 1e-6);
        }
    }
}

// ============================================================================
// Controller
// ============================================================================

fn arb_event() -> impl Strategy<Value = AvatarEvent> {
    prop_oneof![
        Just(AvatarEvent::Click),
        Just(AvatarEvent::KeyDown("k".to_string())),
        Just(AvatarEvent::TriggerSneeze),
        Just(AvatarEvent::SpeakingStarted),
        Just(AvatarEvent::SpeakingEnded),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Bored and Sneeze are never active together, and every output weight
    /// and rotation stays finite, for any event schedule.
    #[test]
    fn controller_keeps_exclusion_and_finite_output(
        seed in any::<u64>(),
        schedule in proptest::collection::vec((0u32..3000, arb_event()), 0..30),
        dt in 0.005f32..0.1,
    ) {
        let mut cfg = VeraConfig::default();
        cfg.bored.trigger_threshold_secs = 5.0;
        let mut ctl = AvatarController::with_seed(cfg, seed);
        let mut t = 0.0f64;
        for frame in 0..3000u32 {
            for (_, e) in schedule.iter().filter(|(at, _)| *at == frame) {
                ctl.push_event(e.clone());
            }
            t += dt as f64;
            let out = ctl.advance(FrameTime::new(t, dt), 0.4);
            let b = ctl.behavior();
            prop_assert!(!(b.bored().active && b.sneeze().active));
            if b.sneeze().active {
                prop_assert_eq!(out.mode, BehaviorMode::Sneezing);
            }
            for (_, w) in out.expressions.iter() {
                prop_assert!((0.0..=1.0).contains(&w));
            }
            for (_, r) in out.bones.iter() {
                prop_assert!(r.is_finite());
            }
        }
    }
}
