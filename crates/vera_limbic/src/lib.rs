//! # Vera Limbic
//!
//! The per-frame behavior core of the avatar. One [`AvatarController`] owns:
//!
//! - the **behavior machine**: Idle, Bored (dance), Sneeze and Speaking, with
//!   Sneeze taking priority over everything else
//! - the **idle pose selector** and the pose blender state
//! - the **eye-gaze controller** (saccades with an eye-contact bias)
//! - the **organic motion floor**: breathing, weight shift, sway, limb sway
//! - the **bone writer**, which sums all of the above per humanoid bone and
//!   computes the wind forcing for the spring-bone solver
//!
//! ## Frame order
//!
//! Every frame reads one `FrameTime`:
//! 1. Drain queued input events
//! 2. Behavior step (bored trigger, sneeze phases, idle selection, blend)
//! 3. Gaze, organic motion
//! 4. Compose bones and expressions, write them to the rig

mod behavior;
mod controller;
mod gaze;
mod idle;
mod organic;
mod writer;

pub use behavior::{
    dance_intensity, phase_at, BehaviorMachine, BehaviorMode, BehaviorOutput, BoredState,
    DanceOffsets, SneezeJolt, SneezePhase, SneezeState,
};
pub use controller::{AvatarController, FrameOutput, Lifecycle};
pub use gaze::{bias_and_clamp, EyeGazeController, EyeGazeState, GazeSample};
pub use idle::IdlePoseSelector;
pub use organic::{OrganicMotion, OrganicOffsets};
pub use writer::{BoneInputs, BoneTargets, BoneWriter, MicroJitter, WindForce};
