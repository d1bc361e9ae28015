//! # Vera Core
//!
//! Shared vocabulary for the avatar engine: the frame time source, pose
//! vectors and the pose blender, the humanoid rig boundary, input events and
//! the configuration tree.
//!
//! Nothing in here branches on behavior state. The behavior machine lives in
//! `vera_limbic`, facial mapping in `vera_expression`.

pub mod config;
pub mod error;
pub mod events;
pub mod pose;
pub mod rig;
pub mod time;

pub use config::{
    AvatarConfig, BoredConfig, DecayMode, GazeConfig, LipSyncConfig, PoseConfig, SneezeConfig,
    VeraConfig, WindConfig,
};
pub use error::ConfigError;
pub use events::{AvatarEvent, EventQueue, EventSender};
pub use pose::{PoseState, PoseTableKind, PoseVector};
pub use rig::{
    AvatarRig, ExpressionName, HumanoidBone, JointRotation, RecordingRig, SpringJointSettings,
};
pub use time::{FrameClock, FrameTime};
