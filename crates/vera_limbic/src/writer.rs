//! Bone output writer and wind forcing
//!
//! Sums the blended pose, organic floor, dance/sneeze offsets, micro-jitter
//! and gaze into one rotation per humanoid bone, then writes them through the
//! rig boundary. Bones the rig does not have are skipped.

use crate::behavior::{DanceOffsets, SneezeJolt};
use crate::gaze::GazeSample;
use crate::organic::{
    wave, OrganicOffsets, BREATH_WEIGHT_CHEST, BREATH_WEIGHT_HEAD, BREATH_WEIGHT_SPINE,
};
use serde::Serialize;
use std::collections::HashSet;
use std::f32::consts::FRAC_PI_3;
use std::f64::consts::FRAC_PI_2;
use vera_core::{AvatarRig, HumanoidBone, JointRotation, PoseVector, WindConfig};
use vera_expression::ExpressionWeights;

/// Static idle arm pose written at load; organic arm sway is layered on top.
pub const REST_LEFT_UPPER_ARM: JointRotation = JointRotation::new(0.0, 0.0, -FRAC_PI_3);
pub const REST_RIGHT_UPPER_ARM: JointRotation = JointRotation::new(0.0, 0.0, FRAC_PI_3);
pub const REST_LOWER_ARM: JointRotation = JointRotation::new(-0.1, 0.0, 0.0);

// ============================================================================
// Micro-jitter
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MicroJitter {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl MicroJitter {
    pub fn at(time: f64) -> Self {
        Self {
            x: wave(time, 0.8, 0.0) * 0.003,
            y: wave(time, 0.6, 0.0) * 0.003,
            z: wave(time, 0.5, 0.0) * 0.002,
        }
    }
}

// ============================================================================
// Bone targets
// ============================================================================

/// Final rotation for every humanoid bone, indexed by `HumanoidBone::index`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneTargets {
    joints: [JointRotation; HumanoidBone::ALL.len()],
}

impl Default for BoneTargets {
    fn default() -> Self {
        Self {
            joints: [JointRotation::ZERO; HumanoidBone::ALL.len()],
        }
    }
}

/// Inputs to [`BoneTargets::compose`] for one frame.
#[derive(Debug, Clone, Copy)]
pub struct BoneInputs<'a> {
    pub time: f64,
    pub pose: &'a PoseVector,
    pub organic: &'a OrganicOffsets,
    pub gaze: GazeSample,
    pub dance: &'a DanceOffsets,
    pub jolt: &'a SneezeJolt,
}

impl BoneTargets {
    pub fn get(&self, bone: HumanoidBone) -> JointRotation {
        self.joints[bone.index()]
    }

    fn set(&mut self, bone: HumanoidBone, rotation: JointRotation) {
        self.joints[bone.index()] = rotation;
    }

    pub fn iter(&self) -> impl Iterator<Item = (HumanoidBone, JointRotation)> + '_ {
        HumanoidBone::ALL.iter().map(move |b| (*b, self.get(*b)))
    }

    pub fn compose(input: &BoneInputs<'_>) -> Self {
        let BoneInputs {
            time,
            pose,
            organic: o,
            gaze,
            dance,
            jolt,
        } = *input;
        let m = MicroJitter::at(time);
        let mut t = BoneTargets::default();

        t.set(
            HumanoidBone::Head,
            JointRotation::new(
                pose.head_pitch + m.x + dance.head_pitch + o.breath * BREATH_WEIGHT_HEAD,
                pose.head_yaw + m.y,
                pose.head_roll + dance.head_roll + o.sway * 0.5,
            ),
        );
        t.set(
            HumanoidBone::Spine,
            JointRotation::new(
                o.breath * BREATH_WEIGHT_SPINE - o.shift_depth * 0.5 + jolt.spine_pitch,
                pose.spine_yaw + m.y * 0.3 + o.sway * 0.8,
                pose.spine_roll + m.z + dance.spine_roll - o.shift_lateral * 0.5,
            ),
        );
        t.set(
            HumanoidBone::Chest,
            JointRotation::new(
                o.breath * BREATH_WEIGHT_CHEST + jolt.chest_pitch,
                pose.chest_yaw + m.y * 0.2 + dance.chest_yaw,
                -o.shift_lateral * 0.3,
            ),
        );
        t.set(
            HumanoidBone::Hips,
            JointRotation::new(o.shift_depth, o.sway * 0.4, o.shift_lateral),
        );

        t.set(
            HumanoidBone::LeftShoulder,
            JointRotation::new(0.0, 0.0, o.left_shoulder_roll),
        );
        t.set(
            HumanoidBone::RightShoulder,
            JointRotation::new(0.0, 0.0, o.right_shoulder_roll),
        );
        t.set(
            HumanoidBone::LeftUpperArm,
            add(REST_LEFT_UPPER_ARM, o.left_upper_arm),
        );
        t.set(
            HumanoidBone::RightUpperArm,
            add(REST_RIGHT_UPPER_ARM, o.right_upper_arm),
        );
        t.set(
            HumanoidBone::LeftLowerArm,
            add(REST_LOWER_ARM, o.left_lower_arm),
        );
        t.set(
            HumanoidBone::RightLowerArm,
            add(REST_LOWER_ARM, o.right_lower_arm),
        );

        let eyes = JointRotation::new(gaze.pitch, gaze.yaw, 0.0);
        t.set(HumanoidBone::LeftEye, eyes);
        t.set(HumanoidBone::RightEye, eyes);
        t
    }
}

fn add(a: JointRotation, b: JointRotation) -> JointRotation {
    JointRotation::new(a.x + b.x, a.y + b.y, a.z + b.z)
}

impl Serialize for BoneTargets {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.joints.len()))?;
        for (bone, rotation) in self.iter() {
            map.serialize_entry(bone.as_str(), &rotation)?;
        }
        map.end()
    }
}

// ============================================================================
// Wind
// ============================================================================

/// Gravity direction and magnitude handed to the spring-bone solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindForce {
    pub direction: [f32; 3],
    pub power: f32,
}

impl WindForce {
    pub fn at(time: f64, power: f32) -> Self {
        let wind_x = wave(time, 0.7, 0.0) * 0.08
            + wave(time, 1.1, 1.5) * 0.05
            + wave(time, 0.3, 0.8) * 0.03;
        // cos(x) = sin(x + pi/2)
        let wind_z =
            wave(time, 0.5, FRAC_PI_2) * 0.03 + wave(time, 0.9, 2.0 + FRAC_PI_2) * 0.02;
        // The -1 keeps the vector well away from zero length.
        let len = (wind_x * wind_x + 1.0 + wind_z * wind_z).sqrt();
        Self {
            direction: [wind_x / len, -1.0 / len, wind_z / len],
            power,
        }
    }
}

// ============================================================================
// Writer
// ============================================================================

/// Writes a frame to the rig, remembering which bones were reported missing.
#[derive(Debug, Default)]
pub struct BoneWriter {
    reported_missing: HashSet<HumanoidBone>,
}

impl BoneWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(
        &mut self,
        rig: &mut dyn AvatarRig,
        bones: &BoneTargets,
        expressions: &ExpressionWeights,
        root_offset_y: f32,
        wind: &WindForce,
    ) {
        for (bone, rotation) in bones.iter() {
            self.write_joint(rig, bone, rotation);
        }
        for (name, weight) in expressions.iter() {
            rig.set_expression(name, weight);
        }
        rig.set_root_offset_y(root_offset_y);
        for joint in rig.spring_joints_mut() {
            joint.gravity_dir = wind.direction;
            joint.gravity_power = wind.power;
        }
    }

    /// One-shot setup after the avatar loads: rest arms and spring settings.
    pub fn prepare(&mut self, rig: &mut dyn AvatarRig, wind: &WindConfig) {
        self.reported_missing.clear();
        self.write_joint(rig, HumanoidBone::LeftUpperArm, REST_LEFT_UPPER_ARM);
        self.write_joint(rig, HumanoidBone::RightUpperArm, REST_RIGHT_UPPER_ARM);
        self.write_joint(rig, HumanoidBone::LeftLowerArm, REST_LOWER_ARM);
        self.write_joint(rig, HumanoidBone::RightLowerArm, REST_LOWER_ARM);
        let springs = rig.spring_joints_mut();
        for joint in springs.iter_mut() {
            joint.stiffness = wind.stiffness;
            joint.drag_force = wind.drag_force;
        }
        tracing::info!("Avatar prepared: {} spring joints", springs.len());
    }

    pub fn reported_missing(&self) -> &HashSet<HumanoidBone> {
        &self.reported_missing
    }

    fn write_joint(&mut self, rig: &mut dyn AvatarRig, bone: HumanoidBone, rotation: JointRotation) {
        match rig.joint_mut(bone) {
            Some(joint) => *joint = rotation,
            None => {
                if self.reported_missing.insert(bone) {
                    tracing::debug!("Rig has no {} bone, skipping its writes", bone);
                }
            }
        }
    }
}
