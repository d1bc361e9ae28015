//! Behavior state machine
//!
//! Arbitrates Idle, Bored (dance), Sneeze and Speaking. Sneeze has the
//! highest priority: it cancels a dance, pins the face and cannot itself be
//! cancelled. Bored is cancelled by any interaction, by a sneeze or by
//! speech. Speaking never owns the pose, only the mouth.
//!
//! Every mutation happens inside [`BehaviorMachine::handle_event`] or
//! [`BehaviorMachine::step`], both stamped with the current frame's time.

use crate::idle::IdlePoseSelector;
use rand::Rng;
use serde::Serialize;
use std::f32::consts::PI;
use vera_core::{
    AvatarEvent, BoredConfig, FrameTime, PoseState, PoseVector, SneezeConfig, VeraConfig,
};
use vera_expression::{ExpressionOverrides, SpeakingState};

/// Time constant of the dance release after a cancelled episode.
const DANCE_RELEASE_SECS: f32 = 0.25;

const JOLT_SPINE: f32 = 0.12;
const JOLT_CHEST: f32 = 0.06;

// ============================================================================
// State types
// ============================================================================

/// Which behavior owns the body this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorMode {
    Idle,
    Bored,
    Sneezing,
}

impl std::fmt::Display for BehaviorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BehaviorMode::Idle => "idle",
            BehaviorMode::Bored => "bored",
            BehaviorMode::Sneezing => "sneezing",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoredState {
    pub active: bool,
    /// Frame time at activation
    pub started_at: f64,
    pub elapsed: f32,
}

impl BoredState {
    pub fn intensity(&self, config: &BoredConfig) -> f32 {
        if !self.active {
            return 0.0;
        }
        dance_intensity(self.elapsed, config.duration_secs, config.fade_duration_secs)
    }
}

/// Trapezoidal 0 -> 1 -> 0 envelope over a dance episode.
pub fn dance_intensity(elapsed: f32, duration: f32, fade: f32) -> f32 {
    let fade_in = (elapsed / fade).min(1.0);
    let fade_out = ((duration - elapsed) / fade).min(1.0);
    fade_in.min(fade_out).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SneezePhase {
    BuildUp,
    Release,
    Recovery,
    Shy,
}

impl SneezePhase {
    pub const ALL: [SneezePhase; 4] = [
        SneezePhase::BuildUp,
        SneezePhase::Release,
        SneezePhase::Recovery,
        SneezePhase::Shy,
    ];
}

/// Phase active at `elapsed` seconds into a sneeze, with the time spent in
/// that phase. `None` once the sequence is over.
///
/// The first three phases include their end instant: at exactly 1.5 s the
/// build-up is at full progress.
pub fn phase_at(elapsed: f32, durations: &[f32; 4]) -> Option<(SneezePhase, f32)> {
    let elapsed = elapsed.max(0.0);
    let total: f32 = durations.iter().sum();
    if elapsed >= total {
        return None;
    }
    let mut start = 0.0;
    for (i, d) in durations.iter().enumerate() {
        let end = start + d;
        if elapsed <= end || i == durations.len() - 1 {
            return Some((SneezePhase::ALL[i], elapsed - start));
        }
        start = end;
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SneezeState {
    pub active: bool,
    pub started_at: f64,
    pub elapsed: f32,
}

// ============================================================================
// Motion offsets
// ============================================================================

/// Dance motion added on top of the blended pose.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DanceOffsets {
    pub spine_roll: f32,
    pub chest_yaw: f32,
    pub head_pitch: f32,
    pub head_roll: f32,
}

impl DanceOffsets {
    pub const ZERO: DanceOffsets = DanceOffsets {
        spine_roll: 0.0,
        chest_yaw: 0.0,
        head_pitch: 0.0,
        head_roll: 0.0,
    };

    /// Offsets at absolute `time`; the rhythm is not reset per episode.
    pub fn at(time: f64, rhythm_speed: f32, intensity: f32) -> Self {
        let rhythm = time * rhythm_speed as f64;
        let (sin, cos) = (rhythm.sin() as f32, rhythm.cos() as f32);
        Self {
            spine_roll: sin * 0.06 * intensity,
            chest_yaw: cos * 0.03 * intensity,
            head_pitch: sin.abs() * 0.05 * intensity,
            head_roll: sin * 0.03 * intensity,
        }
    }

    pub fn scaled(&self, k: f32) -> Self {
        Self {
            spine_roll: self.spine_roll * k,
            chest_yaw: self.chest_yaw * k,
            head_pitch: self.head_pitch * k,
            head_roll: self.head_roll * k,
        }
    }
}

/// Forward jolt of the torso during the sneeze release.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SneezeJolt {
    pub spine_pitch: f32,
    pub chest_pitch: f32,
}

/// Everything the machine asserts for one frame besides the pose itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BehaviorOutput {
    pub mode: BehaviorMode,
    pub sneeze_phase: Option<SneezePhase>,
    pub dance_intensity: f32,
    pub dance: DanceOffsets,
    pub jolt: SneezeJolt,
    pub overrides: ExpressionOverrides,
}

// ============================================================================
// Machine
// ============================================================================

pub struct BehaviorMachine {
    bored_config: BoredConfig,
    sneeze_config: SneezeConfig,
    bored: BoredState,
    sneeze: SneezeState,
    pose: PoseState,
    selector: IdlePoseSelector,
    speaking: SpeakingState,
    last_interaction: f64,
    dance: DanceOffsets,
}

impl BehaviorMachine {
    pub fn new(config: &VeraConfig) -> Self {
        Self {
            bored_config: config.bored.clone(),
            sneeze_config: config.sneeze.clone(),
            bored: BoredState::default(),
            sneeze: SneezeState::default(),
            pose: PoseState::default(),
            selector: IdlePoseSelector::new(&config.pose),
            speaking: SpeakingState::new(config.lipsync.clone()),
            last_interaction: 0.0,
            dance: DanceOffsets::ZERO,
        }
    }

    pub fn mode(&self) -> BehaviorMode {
        if self.sneeze.active {
            BehaviorMode::Sneezing
        } else if self.bored.active {
            BehaviorMode::Bored
        } else {
            BehaviorMode::Idle
        }
    }

    pub fn bored(&self) -> &BoredState {
        &self.bored
    }

    pub fn bored_config(&self) -> &BoredConfig {
        &self.bored_config
    }

    pub fn sneeze(&self) -> &SneezeState {
        &self.sneeze
    }

    pub fn pose(&self) -> &PoseState {
        &self.pose
    }

    pub fn speaking(&self) -> &SpeakingState {
        &self.speaking
    }

    pub fn selector(&self) -> &IdlePoseSelector {
        &self.selector
    }

    pub fn last_interaction(&self) -> f64 {
        self.last_interaction
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking.is_speaking()
    }

    /// Apply one input event at frame time `now`.
    pub fn handle_event(&mut self, event: &AvatarEvent, now: f64) {
        if event.is_interaction() {
            self.interact(now);
            return;
        }
        match event {
            AvatarEvent::Click | AvatarEvent::KeyDown(_) => {}
            AvatarEvent::TriggerSneeze => self.trigger_sneeze(now),
            AvatarEvent::SpeakingStarted => {
                if self.speaking.start() {
                    tracing::debug!("[{:.2}s] speaking started", now);
                    self.interact(now);
                } else {
                    tracing::debug!("[{:.2}s] already speaking, start ignored", now);
                }
            }
            AvatarEvent::SpeakingEnded => {
                if self.speaking.stop() {
                    tracing::debug!("[{:.2}s] speaking ended", now);
                    self.last_interaction = now;
                }
            }
        }
    }

    /// Reset the inactivity timer; a running dance is cancelled.
    fn interact(&mut self, now: f64) {
        self.last_interaction = now;
        if self.bored.active {
            self.cancel_bored(now, "interaction");
            self.pose
                .retarget(PoseVector::NEUTRAL, self.bored_config.recovery_transition_rate);
        }
    }

    fn cancel_bored(&mut self, now: f64, reason: &str) {
        self.bored = BoredState::default();
        self.pose.idle_elapsed = 0.0;
        tracing::debug!("[{:.2}s] bored -> idle ({})", now, reason);
    }

    fn trigger_sneeze(&mut self, now: f64) {
        if self.sneeze.active {
            tracing::debug!("[{:.2}s] already sneezing, trigger ignored", now);
            return;
        }
        if self.bored.active {
            self.cancel_bored(now, "sneeze");
        }
        self.sneeze = SneezeState {
            active: true,
            started_at: now,
            elapsed: 0.0,
        };
        self.pose
            .retarget(PoseVector::NEUTRAL, self.sneeze_config.build_up_rate);
        tracing::debug!("[{:.2}s] -> sneeze", now);
    }

    /// Run the per-frame behavior step: bored trigger, active behavior or idle
    /// selection, then one blender step and the lip-sync update.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        frame: FrameTime,
        amplitude: f32,
        rng: &mut R,
    ) -> BehaviorOutput {
        let now = frame.elapsed;
        let since_interaction = now - self.last_interaction;

        if !self.bored.active
            && !self.sneeze.active
            && !self.speaking.is_speaking()
            && since_interaction > self.bored_config.trigger_threshold_secs as f64
        {
            self.bored = BoredState {
                active: true,
                started_at: now,
                elapsed: 0.0,
            };
            self.pose
                .retarget(PoseVector::NEUTRAL, self.bored_config.entry_transition_rate);
            tracing::debug!(
                "[{:.2}s] idle -> bored after {:.1}s without interaction",
                now,
                since_interaction
            );
        }

        let mut dance = None;
        let mut intensity = 0.0;
        let mut sneeze_phase = None;
        let mut jolt = SneezeJolt::default();
        let mut overrides = ExpressionOverrides::NONE;

        if self.bored.active {
            self.bored.elapsed = (now - self.bored.started_at) as f32;
            if self.bored.elapsed >= self.bored_config.duration_secs {
                self.bored = BoredState::default();
                self.last_interaction = now;
                self.selector.choose(&mut self.pose, rng);
                tracing::debug!("[{:.2}s] bored -> idle (episode complete)", now);
            } else {
                intensity = self.bored.intensity(&self.bored_config);
                dance = Some(DanceOffsets::at(
                    now,
                    self.bored_config.rhythm_speed,
                    intensity,
                ));
            }
        } else if self.sneeze.active {
            self.sneeze.elapsed = (now - self.sneeze.started_at) as f32;
            match phase_at(self.sneeze.elapsed, &self.sneeze_config.phase_durations) {
                Some((phase, phase_elapsed)) => {
                    sneeze_phase = Some(phase);
                    let (o, j) = self.apply_sneeze_phase(phase, phase_elapsed);
                    overrides = o;
                    jolt = j;
                }
                None => {
                    self.sneeze = SneezeState::default();
                    self.selector.choose(&mut self.pose, rng);
                    tracing::debug!("[{:.2}s] sneeze -> idle", now);
                }
            }
        } else {
            self.selector.tick(&mut self.pose, frame.delta, rng);
        }

        self.dance = match dance {
            Some(d) => d,
            None => self
                .dance
                .scaled((-frame.delta / DANCE_RELEASE_SECS).exp()),
        };

        self.pose.blend();
        self.speaking.update(amplitude, frame.delta);

        BehaviorOutput {
            mode: self.mode(),
            sneeze_phase,
            dance_intensity: intensity,
            dance: self.dance,
            jolt,
            overrides,
        }
    }

    /// Assert the phase's pose target and face; return the torso jolt.
    fn apply_sneeze_phase(
        &mut self,
        phase: SneezePhase,
        phase_elapsed: f32,
    ) -> (ExpressionOverrides, SneezeJolt) {
        let cfg = &self.sneeze_config;
        let duration = cfg.phase_durations[phase as usize];
        let progress = (phase_elapsed / duration).clamp(0.0, 1.0);
        match phase {
            SneezePhase::BuildUp => {
                self.pose.retarget(
                    PoseVector::head(0.0, cfg.build_up_pitch * progress),
                    cfg.build_up_rate,
                );
                (
                    ExpressionOverrides::sneeze(progress, 0.3 * progress, 0.0),
                    SneezeJolt::default(),
                )
            }
            SneezePhase::Release => {
                self.pose
                    .retarget(PoseVector::head(0.0, cfg.release_pitch), cfg.release_rate);
                let k = (PI * progress).sin();
                (
                    ExpressionOverrides::sneeze(1.0, 1.0, 0.0),
                    SneezeJolt {
                        spine_pitch: JOLT_SPINE * k,
                        chest_pitch: JOLT_CHEST * k,
                    },
                )
            }
            SneezePhase::Recovery => {
                self.pose.retarget(PoseVector::NEUTRAL, cfg.recovery_rate);
                (
                    ExpressionOverrides::sneeze(0.0, 0.0, 0.0),
                    SneezeJolt::default(),
                )
            }
            SneezePhase::Shy => {
                self.pose
                    .retarget(PoseVector::head(cfg.shy_yaw, cfg.shy_pitch), cfg.shy_rate);
                (
                    ExpressionOverrides::sneeze(0.0, 0.0, 1.0),
                    SneezeJolt::default(),
                )
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
