//! The avatar controller
//!
//! Owns every piece of behavior state and runs the single per-frame update.
//! Input arrives through the event queue and is applied at the start of the
//! next frame, so callbacks never race the step in progress.

use crate::behavior::{BehaviorMachine, BehaviorMode, SneezePhase};
use crate::gaze::{EyeGazeController, GazeSample};
use crate::organic::OrganicMotion;
use crate::writer::{BoneInputs, BoneTargets, BoneWriter, WindForce};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use vera_core::{AvatarEvent, AvatarRig, EventQueue, EventSender, FrameTime, PoseVector, VeraConfig};
use vera_expression::{compose, ExpressionWeights};

/// Whether the procedural step may touch the avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    NotLoaded,
    /// Only the rig's own update runs for this many more frames
    WarmingUp { remaining: u32 },
    Ready,
}

/// Everything computed for one frame.
#[derive(Debug, Clone, Serialize)]
pub struct FrameOutput {
    pub time: f64,
    pub mode: BehaviorMode,
    pub speaking: bool,
    pub sneeze_phase: Option<SneezePhase>,
    pub dance_intensity: f32,
    pub pose: PoseVector,
    pub pose_target: PoseVector,
    pub gaze: GazeSample,
    pub bones: BoneTargets,
    pub expressions: ExpressionWeights,
    pub root_offset_y: f32,
    pub wind: WindForce,
}

pub struct AvatarController {
    config: VeraConfig,
    rng: StdRng,
    events: EventQueue,
    behavior: BehaviorMachine,
    gaze: EyeGazeController,
    organic: OrganicMotion,
    writer: BoneWriter,
    lifecycle: Lifecycle,
}

impl AvatarController {
    /// Seeded from `[avatar] seed` when set, otherwise from OS entropy.
    pub fn new(config: VeraConfig) -> Self {
        let rng = match config.avatar.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }

    pub fn with_seed(config: VeraConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: VeraConfig, rng: StdRng) -> Self {
        Self {
            behavior: BehaviorMachine::new(&config),
            gaze: EyeGazeController::new(config.gaze.clone()),
            organic: OrganicMotion::new(),
            writer: BoneWriter::new(),
            events: EventQueue::new(),
            lifecycle: Lifecycle::NotLoaded,
            rng,
            config,
        }
    }

    pub fn config(&self) -> &VeraConfig {
        &self.config
    }

    pub fn behavior(&self) -> &BehaviorMachine {
        &self.behavior
    }

    pub fn gaze(&self) -> &EyeGazeController {
        &self.gaze
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn writer(&self) -> &BoneWriter {
        &self.writer
    }

    /// Handle for callbacks and other tasks.
    pub fn event_sender(&self) -> EventSender {
        self.events.sender()
    }

    /// Queue an event for the next frame.
    pub fn push_event(&self, event: AvatarEvent) {
        self.events.push(event);
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// The asset finished loading: write the rest pose and spring settings,
    /// then start the warm-up window.
    pub fn on_avatar_loaded(&mut self, rig: &mut dyn AvatarRig) {
        self.writer.prepare(rig, &self.config.wind);
        let frames = self.config.avatar.warmup_frames;
        self.lifecycle = if frames == 0 {
            Lifecycle::Ready
        } else {
            Lifecycle::WarmingUp { remaining: frames }
        };
        tracing::info!("Avatar loaded, warming up for {} frames", frames);
    }

    pub fn on_avatar_unloaded(&mut self) {
        self.lifecycle = Lifecycle::NotLoaded;
        tracing::info!("Avatar unloaded");
    }

    /// Per-frame entry point for a host with a (possibly absent) avatar.
    ///
    /// Returns the computed frame once the avatar is ready; before that the
    /// procedural step does not run and queued events wait.
    pub fn drive(
        &mut self,
        frame: FrameTime,
        rig: Option<&mut dyn AvatarRig>,
        amplitude: f32,
    ) -> Option<FrameOutput> {
        let rig = rig?;
        match self.lifecycle {
            Lifecycle::NotLoaded => None,
            Lifecycle::WarmingUp { remaining } => {
                rig.update(frame.delta);
                self.lifecycle = if remaining <= 1 {
                    tracing::debug!("Warm-up finished at {:.2}s", frame.elapsed);
                    Lifecycle::Ready
                } else {
                    Lifecycle::WarmingUp {
                        remaining: remaining - 1,
                    }
                };
                None
            }
            Lifecycle::Ready => {
                let output = self.advance(frame, amplitude);
                self.writer.apply(
                    rig,
                    &output.bones,
                    &output.expressions,
                    output.root_offset_y,
                    &output.wind,
                );
                rig.update(frame.delta);
                Some(output)
            }
        }
    }

    /// The procedural step: drain events, run behavior and the signal
    /// generators, and compose bones and expressions. Never fails.
    pub fn advance(&mut self, frame: FrameTime, amplitude: f32) -> FrameOutput {
        let now = frame.elapsed;
        for event in self.events.drain() {
            tracing::trace!("[{:.2}s] event {:?}", now, event);
            self.behavior.handle_event(&event, now);
        }

        let behavior = self.behavior.step(frame, amplitude, &mut self.rng);
        let pose = self.behavior.pose();

        let gaze = self.gaze.update(
            frame.delta,
            pose.current.head_yaw,
            behavior.mode == BehaviorMode::Sneezing,
            &mut self.rng,
        );
        let organic = self.organic.update(now, frame.delta);

        let bones = BoneTargets::compose(&BoneInputs {
            time: now,
            pose: &pose.current,
            organic: &organic,
            gaze,
            dance: &behavior.dance,
            jolt: &behavior.jolt,
        });
        let expressions = compose(now, &behavior.overrides, self.behavior.speaking());

        FrameOutput {
            time: now,
            mode: behavior.mode,
            speaking: self.behavior.is_speaking(),
            sneeze_phase: behavior.sneeze_phase,
            dance_intensity: behavior.dance_intensity,
            pose: pose.current,
            pose_target: pose.target,
            gaze,
            bones,
            expressions,
            root_offset_y: organic.root_bob,
            wind: WindForce::at(now, self.config.wind.gravity_power),
        }
    }
}
