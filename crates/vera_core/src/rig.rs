//! Humanoid rig boundary
//!
//! The skeleton, expression manager and spring-bone solver belong to the
//! renderer. The engine only sees them through [`AvatarRig`]: a bone lookup
//! that may come back empty, a named expression setter, a root offset, and the
//! per-joint spring settings. Every write site tolerates a missing bone by
//! skipping it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Standardised humanoid joint identifiers (VRM naming).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HumanoidBone {
    Head,
    Spine,
    Chest,
    Hips,
    LeftShoulder,
    RightShoulder,
    LeftUpperArm,
    RightUpperArm,
    LeftLowerArm,
    RightLowerArm,
    LeftEye,
    RightEye,
}

impl HumanoidBone {
    pub const ALL: [HumanoidBone; 12] = [
        HumanoidBone::Head,
        HumanoidBone::Spine,
        HumanoidBone::Chest,
        HumanoidBone::Hips,
        HumanoidBone::LeftShoulder,
        HumanoidBone::RightShoulder,
        HumanoidBone::LeftUpperArm,
        HumanoidBone::RightUpperArm,
        HumanoidBone::LeftLowerArm,
        HumanoidBone::RightLowerArm,
        HumanoidBone::LeftEye,
        HumanoidBone::RightEye,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Spine => "spine",
            Self::Chest => "chest",
            Self::Hips => "hips",
            Self::LeftShoulder => "leftShoulder",
            Self::RightShoulder => "rightShoulder",
            Self::LeftUpperArm => "leftUpperArm",
            Self::RightUpperArm => "rightUpperArm",
            Self::LeftLowerArm => "leftLowerArm",
            Self::RightLowerArm => "rightLowerArm",
            Self::LeftEye => "leftEye",
            Self::RightEye => "rightEye",
        }
    }

    /// Dense index into [`HumanoidBone::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for HumanoidBone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HumanoidBone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HumanoidBone::ALL
            .iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown humanoid bone: {}", s))
    }
}

/// Facial expression weights the engine drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpressionName {
    Blink,
    Sorrow,
    /// Mouth open ("aa" viseme)
    Aa,
    Joy,
}

impl ExpressionName {
    pub const ALL: [ExpressionName; 4] = [
        ExpressionName::Blink,
        ExpressionName::Sorrow,
        ExpressionName::Aa,
        ExpressionName::Joy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blink => "blink",
            Self::Sorrow => "sorrow",
            Self::Aa => "aa",
            Self::Joy => "joy",
        }
    }
}

/// Local joint rotation as three independent axis angles (radians).
/// `x` is pitch, `y` is yaw, `z` is roll.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct JointRotation {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl JointRotation {
    pub const ZERO: JointRotation = JointRotation {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Per-joint settings of the external spring-bone solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpringJointSettings {
    pub stiffness: f32,
    pub drag_force: f32,
    /// Unit gravity direction
    pub gravity_dir: [f32; 3],
    pub gravity_power: f32,
}

impl Default for SpringJointSettings {
    fn default() -> Self {
        Self {
            stiffness: 1.0,
            drag_force: 0.4,
            gravity_dir: [0.0, -1.0, 0.0],
            gravity_power: 0.0,
        }
    }
}

/// What the engine needs from a loaded humanoid avatar.
pub trait AvatarRig {
    /// Look up a joint. `None` means the rig has no such bone; callers skip
    /// the write.
    fn joint_mut(&mut self, bone: HumanoidBone) -> Option<&mut JointRotation>;

    /// Set a facial expression weight. Rigs without an expression manager
    /// ignore the call.
    fn set_expression(&mut self, name: ExpressionName, weight: f32);

    /// Vertical offset of the avatar root.
    fn set_root_offset_y(&mut self, y: f32);

    /// Spring-bone joints; empty when the avatar has no secondary physics.
    fn spring_joints_mut(&mut self) -> &mut [SpringJointSettings];

    /// The skeleton's own per-frame update (spring bones, constraints).
    fn update(&mut self, delta: f32);
}

/// In-memory rig that records every write. Used by the simulator and tests.
#[derive(Debug, Clone)]
pub struct RecordingRig {
    joints: HashMap<HumanoidBone, JointRotation>,
    expressions: HashMap<ExpressionName, f32>,
    springs: Vec<SpringJointSettings>,
    root_offset_y: f32,
    update_calls: u64,
    updated_time: f32,
}

impl RecordingRig {
    /// A rig with every humanoid bone and four spring joints.
    pub fn full() -> Self {
        Self::with_bones(&HumanoidBone::ALL)
    }

    pub fn with_bones(bones: &[HumanoidBone]) -> Self {
        Self {
            joints: bones.iter().map(|b| (*b, JointRotation::ZERO)).collect(),
            expressions: HashMap::new(),
            springs: vec![SpringJointSettings::default(); 4],
            root_offset_y: 0.0,
            update_calls: 0,
            updated_time: 0.0,
        }
    }

    /// A full rig minus the given bones.
    pub fn without(missing: &[HumanoidBone]) -> Self {
        let bones: Vec<HumanoidBone> = HumanoidBone::ALL
            .iter()
            .filter(|b| !missing.contains(b))
            .copied()
            .collect();
        Self::with_bones(&bones)
    }

    pub fn with_spring_joints(mut self, count: usize) -> Self {
        self.springs = vec![SpringJointSettings::default(); count];
        self
    }

    pub fn rotation(&self, bone: HumanoidBone) -> Option<JointRotation> {
        self.joints.get(&bone).copied()
    }

    pub fn expression(&self, name: ExpressionName) -> f32 {
        self.expressions.get(&name).copied().unwrap_or(0.0)
    }

    pub fn springs(&self) -> &[SpringJointSettings] {
        &self.springs
    }

    pub fn root_offset_y(&self) -> f32 {
        self.root_offset_y
    }

    pub fn update_calls(&self) -> u64 {
        self.update_calls
    }

    /// Sum of all deltas passed to `update`.
    pub fn updated_time(&self) -> f32 {
        self.updated_time
    }
}

impl AvatarRig for RecordingRig {
    fn joint_mut(&mut self, bone: HumanoidBone) -> Option<&mut JointRotation> {
        self.joints.get_mut(&bone)
    }

    fn set_expression(&mut self, name: ExpressionName, weight: f32) {
        self.expressions.insert(name, weight);
    }

    fn set_root_offset_y(&mut self, y: f32) {
        self.root_offset_y = y;
    }

    fn spring_joints_mut(&mut self) -> &mut [SpringJointSettings] {
        &mut self.springs
    }

    fn update(&mut self, delta: f32) {
        self.update_calls += 1;
        self.updated_time += delta;
    }
}
