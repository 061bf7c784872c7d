//! Degree-of-freedom tables of the generic humanoid.
//!
//! Body DoFs are grouped by body part (body, head, left leg, right leg, left arm, right arm).
//! Every DoF drives one canonical axis of one bone. Default limits are in degrees.

use super::bones::{FingerBone, HumanBone};

pub const BODY_DOF_COUNT: usize = 55;
pub const DOFS_PER_FINGER: usize = 4;
pub const FINGER_DOF_COUNT: usize = 20;

pub const SPINE_FRONT_BACK: usize = 0;
pub const SPINE_LEFT_RIGHT: usize = 1;
pub const SPINE_TWIST: usize = 2;
pub const CHEST_FRONT_BACK: usize = 3;
pub const CHEST_LEFT_RIGHT: usize = 4;
pub const CHEST_TWIST: usize = 5;
pub const UPPER_CHEST_FRONT_BACK: usize = 6;
pub const UPPER_CHEST_LEFT_RIGHT: usize = 7;
pub const UPPER_CHEST_TWIST: usize = 8;

pub const NECK_NOD: usize = 9;
pub const NECK_TILT: usize = 10;
pub const NECK_TURN: usize = 11;
pub const HEAD_NOD: usize = 12;
pub const HEAD_TILT: usize = 13;
pub const HEAD_TURN: usize = 14;
pub const LEFT_EYE_DOWN_UP: usize = 15;
pub const LEFT_EYE_IN_OUT: usize = 16;
pub const RIGHT_EYE_DOWN_UP: usize = 17;
pub const RIGHT_EYE_IN_OUT: usize = 18;
pub const JAW_CLOSE: usize = 19;
pub const JAW_LEFT_RIGHT: usize = 20;

pub const LEFT_UPPER_LEG_FRONT_BACK: usize = 21;
pub const LEFT_UPPER_LEG_IN_OUT: usize = 22;
pub const LEFT_UPPER_LEG_TWIST: usize = 23;
pub const LEFT_LOWER_LEG_STRETCH: usize = 24;
pub const LEFT_LOWER_LEG_TWIST: usize = 25;
pub const LEFT_FOOT_UP_DOWN: usize = 26;
pub const LEFT_FOOT_TWIST: usize = 27;
pub const LEFT_TOES_UP_DOWN: usize = 28;

pub const RIGHT_UPPER_LEG_FRONT_BACK: usize = 29;
pub const RIGHT_UPPER_LEG_IN_OUT: usize = 30;
pub const RIGHT_UPPER_LEG_TWIST: usize = 31;
pub const RIGHT_LOWER_LEG_STRETCH: usize = 32;
pub const RIGHT_LOWER_LEG_TWIST: usize = 33;
pub const RIGHT_FOOT_UP_DOWN: usize = 34;
pub const RIGHT_FOOT_TWIST: usize = 35;
pub const RIGHT_TOES_UP_DOWN: usize = 36;

pub const LEFT_SHOULDER_DOWN_UP: usize = 37;
pub const LEFT_SHOULDER_FRONT_BACK: usize = 38;
pub const LEFT_ARM_DOWN_UP: usize = 39;
pub const LEFT_ARM_FRONT_BACK: usize = 40;
pub const LEFT_ARM_TWIST: usize = 41;
pub const LEFT_FOREARM_STRETCH: usize = 42;
pub const LEFT_FOREARM_TWIST: usize = 43;
pub const LEFT_HAND_DOWN_UP: usize = 44;
pub const LEFT_HAND_IN_OUT: usize = 45;

pub const RIGHT_SHOULDER_DOWN_UP: usize = 46;
pub const RIGHT_SHOULDER_FRONT_BACK: usize = 47;
pub const RIGHT_ARM_DOWN_UP: usize = 48;
pub const RIGHT_ARM_FRONT_BACK: usize = 49;
pub const RIGHT_ARM_TWIST: usize = 50;
pub const RIGHT_FOREARM_STRETCH: usize = 51;
pub const RIGHT_FOREARM_TWIST: usize = 52;
pub const RIGHT_HAND_DOWN_UP: usize = 53;
pub const RIGHT_HAND_IN_OUT: usize = 54;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DofDefinition {
    pub name: &'static str,
    pub bone: HumanBone,
    /// Canonical axis: 0 = X (twist), 1 = Y, 2 = Z.
    pub axis: usize,
    pub min: f32,
    pub max: f32,
}

const fn d(name: &'static str, bone: HumanBone, axis: usize, min: f32, max: f32) -> DofDefinition {
    DofDefinition {
        name,
        bone,
        axis,
        min,
        max,
    }
}

use HumanBone as B;

#[rustfmt::skip]
pub const BODY_DOFS: [DofDefinition; BODY_DOF_COUNT] = [
    d("Spine Front-Back", B::Spine, 2, -40., 40.),
    d("Spine Left-Right", B::Spine, 1, -40., 40.),
    d("Spine Twist Left-Right", B::Spine, 0, -40., 40.),
    d("Chest Front-Back", B::Chest, 2, -40., 40.),
    d("Chest Left-Right", B::Chest, 1, -40., 40.),
    d("Chest Twist Left-Right", B::Chest, 0, -40., 40.),
    d("UpperChest Front-Back", B::UpperChest, 2, -20., 20.),
    d("UpperChest Left-Right", B::UpperChest, 1, -20., 20.),
    d("UpperChest Twist Left-Right", B::UpperChest, 0, -20., 20.),
    d("Neck Nod Down-Up", B::Neck, 2, -40., 40.),
    d("Neck Tilt Left-Right", B::Neck, 1, -40., 40.),
    d("Neck Turn Left-Right", B::Neck, 0, -40., 40.),
    d("Head Nod Down-Up", B::Head, 2, -40., 40.),
    d("Head Tilt Left-Right", B::Head, 1, -40., 40.),
    d("Head Turn Left-Right", B::Head, 0, -40., 40.),
    d("Left Eye Down-Up", B::LeftEye, 2, -10., 15.),
    d("Left Eye In-Out", B::LeftEye, 1, -20., 20.),
    d("Right Eye Down-Up", B::RightEye, 2, -10., 15.),
    d("Right Eye In-Out", B::RightEye, 1, -20., 20.),
    d("Jaw Close", B::Jaw, 2, -10., 10.),
    d("Jaw Left-Right", B::Jaw, 1, -10., 10.),
    d("Left Upper Leg Front-Back", B::LeftUpperLeg, 2, -90., 50.),
    d("Left Upper Leg In-Out", B::LeftUpperLeg, 1, -60., 60.),
    d("Left Upper Leg Twist In-Out", B::LeftUpperLeg, 0, -60., 60.),
    d("Left Lower Leg Stretch", B::LeftLowerLeg, 2, -80., 80.),
    d("Left Lower Leg Twist In-Out", B::LeftLowerLeg, 0, -90., 90.),
    d("Left Foot Up-Down", B::LeftFoot, 2, -50., 50.),
    d("Left Foot Twist In-Out", B::LeftFoot, 1, -30., 30.),
    d("Left Toes Up-Down", B::LeftToes, 2, -50., 50.),
    d("Right Upper Leg Front-Back", B::RightUpperLeg, 2, -90., 50.),
    d("Right Upper Leg In-Out", B::RightUpperLeg, 1, -60., 60.),
    d("Right Upper Leg Twist In-Out", B::RightUpperLeg, 0, -60., 60.),
    d("Right Lower Leg Stretch", B::RightLowerLeg, 2, -80., 80.),
    d("Right Lower Leg Twist In-Out", B::RightLowerLeg, 0, -90., 90.),
    d("Right Foot Up-Down", B::RightFoot, 2, -50., 50.),
    d("Right Foot Twist In-Out", B::RightFoot, 1, -30., 30.),
    d("Right Toes Up-Down", B::RightToes, 2, -50., 50.),
    d("Left Shoulder Down-Up", B::LeftShoulder, 2, -15., 30.),
    d("Left Shoulder Front-Back", B::LeftShoulder, 1, -15., 15.),
    d("Left Arm Down-Up", B::LeftUpperArm, 2, -60., 100.),
    d("Left Arm Front-Back", B::LeftUpperArm, 1, -100., 100.),
    d("Left Arm Twist In-Out", B::LeftUpperArm, 0, -90., 90.),
    d("Left Forearm Stretch", B::LeftLowerArm, 2, -80., 80.),
    d("Left Forearm Twist In-Out", B::LeftLowerArm, 0, -90., 90.),
    d("Left Hand Down-Up", B::LeftHand, 2, -80., 80.),
    d("Left Hand In-Out", B::LeftHand, 1, -40., 40.),
    d("Right Shoulder Down-Up", B::RightShoulder, 2, -15., 30.),
    d("Right Shoulder Front-Back", B::RightShoulder, 1, -15., 15.),
    d("Right Arm Down-Up", B::RightUpperArm, 2, -60., 100.),
    d("Right Arm Front-Back", B::RightUpperArm, 1, -100., 100.),
    d("Right Arm Twist In-Out", B::RightUpperArm, 0, -90., 90.),
    d("Right Forearm Stretch", B::RightLowerArm, 2, -80., 80.),
    d("Right Forearm Twist In-Out", B::RightLowerArm, 0, -90., 90.),
    d("Right Hand Down-Up", B::RightHand, 2, -80., 80.),
    d("Right Hand In-Out", B::RightHand, 1, -40., 40.),
];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FingerDofDefinition {
    pub name: &'static str,
    pub bone: FingerBone,
    pub axis: usize,
    pub min: f32,
    pub max: f32,
}

const fn f(name: &'static str, bone: FingerBone, axis: usize, min: f32, max: f32) -> FingerDofDefinition {
    FingerDofDefinition {
        name,
        bone,
        axis,
        min,
        max,
    }
}

use FingerBone as F;

#[rustfmt::skip]
pub const FINGER_DOFS: [FingerDofDefinition; FINGER_DOF_COUNT] = [
    f("Thumb Spread", F::ThumbProximal, 1, -25., 25.),
    f("Thumb 1 Stretched", F::ThumbProximal, 2, -20., 20.),
    f("Thumb 2 Stretched", F::ThumbIntermediate, 2, -40., 35.),
    f("Thumb 3 Stretched", F::ThumbDistal, 2, -40., 35.),
    f("Index Spread", F::IndexProximal, 1, -20., 20.),
    f("Index 1 Stretched", F::IndexProximal, 2, -50., 50.),
    f("Index 2 Stretched", F::IndexIntermediate, 2, -45., 45.),
    f("Index 3 Stretched", F::IndexDistal, 2, -45., 45.),
    f("Middle Spread", F::MiddleProximal, 1, -7.5, 7.5),
    f("Middle 1 Stretched", F::MiddleProximal, 2, -50., 50.),
    f("Middle 2 Stretched", F::MiddleIntermediate, 2, -45., 45.),
    f("Middle 3 Stretched", F::MiddleDistal, 2, -45., 45.),
    f("Ring Spread", F::RingProximal, 1, -7.5, 7.5),
    f("Ring 1 Stretched", F::RingProximal, 2, -50., 50.),
    f("Ring 2 Stretched", F::RingIntermediate, 2, -45., 45.),
    f("Ring 3 Stretched", F::RingDistal, 2, -45., 45.),
    f("Little Spread", F::LittleProximal, 1, -20., 20.),
    f("Little 1 Stretched", F::LittleProximal, 2, -50., 50.),
    f("Little 2 Stretched", F::LittleIntermediate, 2, -45., 45.),
    f("Little 3 Stretched", F::LittleDistal, 2, -45., 45.),
];

/// DoF index of the same motion on the other side of the body, together with the sign the value
/// takes when mirrored. Center bones keep their index and flip their lateral axes.
pub fn mirror_dof(index: usize) -> Option<(usize, f32)> {
    let definition = BODY_DOFS.get(index)?;
    let mirrored_bone = definition.bone.mirror();
    if mirrored_bone == definition.bone {
        // Twist and left-right bends change direction, front-back bends do not.
        let sign = if definition.axis == 2 { 1. } else { -1. };
        return Some((index, sign));
    }
    let target = mirrored_bone.definition().dofs[definition.axis]?;
    Some((target, 1.))
}

pub fn dof_name(index: usize) -> Option<&'static str> {
    BODY_DOFS.get(index).map(|definition| definition.name)
}

pub fn finger_dof_name(index: usize) -> Option<&'static str> {
    FINGER_DOFS.get(index).map(|definition| definition.name)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_tables_match_bone_definitions() {
        for (index, definition) in BODY_DOFS.iter().enumerate() {
            assert_eq!(
                definition.bone.definition().dofs[definition.axis],
                Some(index),
                "{}",
                definition.name
            );
            assert!(definition.min < definition.max);
        }
        for (index, definition) in FINGER_DOFS.iter().enumerate() {
            assert_eq!(definition.bone.dofs()[definition.axis], Some(index));
        }
    }

    #[test]
    fn test_mirror_dof() {
        assert_eq!(
            mirror_dof(LEFT_ARM_DOWN_UP),
            Some((RIGHT_ARM_DOWN_UP, 1.))
        );
        assert_eq!(
            mirror_dof(RIGHT_UPPER_LEG_TWIST),
            Some((LEFT_UPPER_LEG_TWIST, 1.))
        );
        assert_eq!(mirror_dof(HEAD_TURN), Some((HEAD_TURN, -1.)));
        assert_eq!(mirror_dof(SPINE_FRONT_BACK), Some((SPINE_FRONT_BACK, 1.)));
        assert_eq!(mirror_dof(JAW_LEFT_RIGHT), Some((JAW_LEFT_RIGHT, -1.)));
        assert_eq!(mirror_dof(BODY_DOF_COUNT), None);
    }

    #[test]
    fn test_names() {
        assert_eq!(dof_name(HEAD_NOD), Some("Head Nod Down-Up"));
        assert_eq!(dof_name(99), None);
        assert_eq!(finger_dof_name(5), Some("Index 1 Stretched"));
    }
}
