use bevy::{math::Vec3, reflect::Reflect};
use serde::{Deserialize, Serialize};

use super::{axes::AxesKind, dof};
use crate::mask::BodyPart;

#[derive(Reflect, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
    Center,
}

impl Side {
    pub fn mirror(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Center => Self::Center,
        }
    }
}

/// Body bones of the generic humanoid.
#[derive(Reflect, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HumanBone {
    Hips,
    LeftUpperLeg,
    RightUpperLeg,
    LeftLowerLeg,
    RightLowerLeg,
    LeftFoot,
    RightFoot,
    Spine,
    Chest,
    UpperChest,
    Neck,
    Head,
    LeftShoulder,
    RightShoulder,
    LeftUpperArm,
    RightUpperArm,
    LeftLowerArm,
    RightLowerArm,
    LeftHand,
    RightHand,
    LeftToes,
    RightToes,
    LeftEye,
    RightEye,
    Jaw,
}

pub const HUMAN_BONE_COUNT: usize = 25;

/// Fallback for a bone's canonical X axis when none of its chain children is mapped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoneDirection {
    /// Continue the direction from the parent joint to this joint.
    FromParent,
    /// Point along the character's forward axis.
    Forward,
}

/// Character-space axis the canonical Z (bend) axis is derived from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BendReference {
    Side,
    Forward,
}

impl BendReference {
    pub fn axis(self) -> Vec3 {
        match self {
            Self::Side => Vec3::X,
            Self::Forward => Vec3::Z,
        }
    }
}

/// Constant description of one humanoid bone.
#[derive(Clone, Copy, Debug)]
pub struct BoneDefinition {
    pub parent: Option<HumanBone>,
    pub required: bool,
    pub side: Side,
    pub part: BodyPart,
    pub kind: AxesKind,
    /// DoF driving the X, Y and Z canonical axes.
    pub dofs: [Option<usize>; 3],
    /// Bones the canonical X axis points at, first mapped one wins.
    pub chain: &'static [HumanBone],
    pub direction: BoneDirection,
    pub bend: BendReference,
    /// Fraction of body mass, used for the mass-center height.
    pub mass: f32,
    /// Share of a missing bone's rotation moved onto its nearest mapped ancestor.
    pub redistribution: f32,
}

use HumanBone as B;

/// The upper chest also carries the other arm and the neck, so it only takes part of a missing
/// shoulder's rotation.
pub const SHOULDER_REDISTRIBUTION: f32 = 0.5;

const fn bone(
    parent: Option<HumanBone>,
    required: bool,
    side: Side,
    part: BodyPart,
    kind: AxesKind,
    dofs: [Option<usize>; 3],
    chain: &'static [HumanBone],
    direction: BoneDirection,
    bend: BendReference,
    mass: f32,
    redistribution: f32,
) -> BoneDefinition {
    BoneDefinition {
        parent,
        required,
        side,
        part,
        kind,
        dofs,
        chain,
        direction,
        bend,
        mass,
        redistribution,
    }
}

const fn leg(side: Side, parent: HumanBone, chain: &'static [HumanBone], dofs: [Option<usize>; 3], kind: AxesKind, mass: f32, required: bool, direction: BoneDirection) -> BoneDefinition {
    let part = match side {
        Side::Left => BodyPart::LeftLeg,
        _ => BodyPart::RightLeg,
    };
    bone(Some(parent), required, side, part, kind, dofs, chain, direction, BendReference::Side, mass, 0.)
}

const fn arm(side: Side, parent: HumanBone, chain: &'static [HumanBone], dofs: [Option<usize>; 3], kind: AxesKind, mass: f32, required: bool, redistribution: f32) -> BoneDefinition {
    let part = match side {
        Side::Left => BodyPart::LeftArm,
        _ => BodyPart::RightArm,
    };
    bone(Some(parent), required, side, part, kind, dofs, chain, BoneDirection::FromParent, BendReference::Forward, mass, redistribution)
}

const fn trunk(parent: HumanBone, chain: &'static [HumanBone], dofs: [Option<usize>; 3], part: BodyPart, mass: f32, required: bool, redistribution: f32) -> BoneDefinition {
    bone(Some(parent), required, Side::Center, part, AxesKind::ZYRoll, dofs, chain, BoneDirection::FromParent, BendReference::Side, mass, redistribution)
}

const fn eye(side: Side, dofs: [Option<usize>; 3]) -> BoneDefinition {
    bone(Some(B::Head), false, side, BodyPart::Head, AxesKind::EulerXYZ, dofs, &[], BoneDirection::Forward, BendReference::Side, 0., 0.)
}

const fn some3(x: Option<usize>, y: usize, z: usize) -> [Option<usize>; 3] {
    [x, Some(y), Some(z)]
}

#[rustfmt::skip]
pub const BONE_DEFINITIONS: [BoneDefinition; HUMAN_BONE_COUNT] = [
    // Hips
    bone(None, true, Side::Center, BodyPart::Root, AxesKind::ZYRoll, [None; 3], &[B::Spine], BoneDirection::FromParent, BendReference::Side, 0.142, 0.),
    // Upper legs
    leg(Side::Left, B::Hips, &[B::LeftLowerLeg], some3(Some(dof::LEFT_UPPER_LEG_TWIST), dof::LEFT_UPPER_LEG_IN_OUT, dof::LEFT_UPPER_LEG_FRONT_BACK), AxesKind::RollZY, 0.1, true, BoneDirection::FromParent),
    leg(Side::Right, B::Hips, &[B::RightLowerLeg], some3(Some(dof::RIGHT_UPPER_LEG_TWIST), dof::RIGHT_UPPER_LEG_IN_OUT, dof::RIGHT_UPPER_LEG_FRONT_BACK), AxesKind::RollZY, 0.1, true, BoneDirection::FromParent),
    // Lower legs
    leg(Side::Left, B::LeftUpperLeg, &[B::LeftFoot], [Some(dof::LEFT_LOWER_LEG_TWIST), None, Some(dof::LEFT_LOWER_LEG_STRETCH)], AxesKind::ZYRoll, 0.0465, true, BoneDirection::FromParent),
    leg(Side::Right, B::RightUpperLeg, &[B::RightFoot], [Some(dof::RIGHT_LOWER_LEG_TWIST), None, Some(dof::RIGHT_LOWER_LEG_STRETCH)], AxesKind::ZYRoll, 0.0465, true, BoneDirection::FromParent),
    // Feet
    leg(Side::Left, B::LeftLowerLeg, &[B::LeftToes], some3(None, dof::LEFT_FOOT_TWIST, dof::LEFT_FOOT_UP_DOWN), AxesKind::ZYRoll, 0.0145, true, BoneDirection::Forward),
    leg(Side::Right, B::RightLowerLeg, &[B::RightToes], some3(None, dof::RIGHT_FOOT_TWIST, dof::RIGHT_FOOT_UP_DOWN), AxesKind::ZYRoll, 0.0145, true, BoneDirection::Forward),
    // Spine, Chest, UpperChest
    trunk(B::Hips, &[B::Chest, B::UpperChest, B::Neck, B::Head], some3(Some(dof::SPINE_TWIST), dof::SPINE_LEFT_RIGHT, dof::SPINE_FRONT_BACK), BodyPart::Body, 0.139, true, 0.),
    trunk(B::Spine, &[B::UpperChest, B::Neck, B::Head], some3(Some(dof::CHEST_TWIST), dof::CHEST_LEFT_RIGHT, dof::CHEST_FRONT_BACK), BodyPart::Body, 0.108, false, 1.),
    trunk(B::Chest, &[B::Neck, B::Head], some3(Some(dof::UPPER_CHEST_TWIST), dof::UPPER_CHEST_LEFT_RIGHT, dof::UPPER_CHEST_FRONT_BACK), BodyPart::Body, 0.108, false, 1.),
    // Neck, Head
    trunk(B::UpperChest, &[B::Head], some3(Some(dof::NECK_TURN), dof::NECK_TILT, dof::NECK_NOD), BodyPart::Head, 0.011, false, 1.),
    trunk(B::Neck, &[], some3(Some(dof::HEAD_TURN), dof::HEAD_TILT, dof::HEAD_NOD), BodyPart::Head, 0.07, true, 0.),
    // Shoulders
    arm(Side::Left, B::UpperChest, &[B::LeftUpperArm], some3(None, dof::LEFT_SHOULDER_FRONT_BACK, dof::LEFT_SHOULDER_DOWN_UP), AxesKind::RollZY, 0., false, SHOULDER_REDISTRIBUTION),
    arm(Side::Right, B::UpperChest, &[B::RightUpperArm], some3(None, dof::RIGHT_SHOULDER_FRONT_BACK, dof::RIGHT_SHOULDER_DOWN_UP), AxesKind::RollZY, 0., false, SHOULDER_REDISTRIBUTION),
    // Upper arms
    arm(Side::Left, B::LeftShoulder, &[B::LeftLowerArm], some3(Some(dof::LEFT_ARM_TWIST), dof::LEFT_ARM_FRONT_BACK, dof::LEFT_ARM_DOWN_UP), AxesKind::RollZY, 0.028, true, 0.),
    arm(Side::Right, B::RightShoulder, &[B::RightLowerArm], some3(Some(dof::RIGHT_ARM_TWIST), dof::RIGHT_ARM_FRONT_BACK, dof::RIGHT_ARM_DOWN_UP), AxesKind::RollZY, 0.028, true, 0.),
    // Lower arms
    arm(Side::Left, B::LeftUpperArm, &[B::LeftHand], [Some(dof::LEFT_FOREARM_TWIST), None, Some(dof::LEFT_FOREARM_STRETCH)], AxesKind::ZYRoll, 0.016, true, 0.),
    arm(Side::Right, B::RightUpperArm, &[B::RightHand], [Some(dof::RIGHT_FOREARM_TWIST), None, Some(dof::RIGHT_FOREARM_STRETCH)], AxesKind::ZYRoll, 0.016, true, 0.),
    // Hands
    arm(Side::Left, B::LeftLowerArm, &[], some3(None, dof::LEFT_HAND_IN_OUT, dof::LEFT_HAND_DOWN_UP), AxesKind::ZYRoll, 0.006, true, 0.),
    arm(Side::Right, B::RightLowerArm, &[], some3(None, dof::RIGHT_HAND_IN_OUT, dof::RIGHT_HAND_DOWN_UP), AxesKind::ZYRoll, 0.006, true, 0.),
    // Toes
    leg(Side::Left, B::LeftFoot, &[], [None, None, Some(dof::LEFT_TOES_UP_DOWN)], AxesKind::ZYRoll, 0., false, BoneDirection::Forward),
    leg(Side::Right, B::RightFoot, &[], [None, None, Some(dof::RIGHT_TOES_UP_DOWN)], AxesKind::ZYRoll, 0., false, BoneDirection::Forward),
    // Eyes, Jaw
    eye(Side::Left, some3(None, dof::LEFT_EYE_IN_OUT, dof::LEFT_EYE_DOWN_UP)),
    eye(Side::Right, some3(None, dof::RIGHT_EYE_IN_OUT, dof::RIGHT_EYE_DOWN_UP)),
    bone(Some(B::Head), false, Side::Center, BodyPart::Head, AxesKind::EulerXYZ, some3(None, dof::JAW_LEFT_RIGHT, dof::JAW_CLOSE), &[], BoneDirection::Forward, BendReference::Side, 0., 0.),
];

impl HumanBone {
    pub const ALL: [HumanBone; HUMAN_BONE_COUNT] = [
        B::Hips,
        B::LeftUpperLeg,
        B::RightUpperLeg,
        B::LeftLowerLeg,
        B::RightLowerLeg,
        B::LeftFoot,
        B::RightFoot,
        B::Spine,
        B::Chest,
        B::UpperChest,
        B::Neck,
        B::Head,
        B::LeftShoulder,
        B::RightShoulder,
        B::LeftUpperArm,
        B::RightUpperArm,
        B::LeftLowerArm,
        B::RightLowerArm,
        B::LeftHand,
        B::RightHand,
        B::LeftToes,
        B::RightToes,
        B::LeftEye,
        B::RightEye,
        B::Jaw,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn definition(self) -> &'static BoneDefinition {
        &BONE_DEFINITIONS[self.index()]
    }

    pub fn parent(self) -> Option<HumanBone> {
        self.definition().parent
    }

    pub fn is_required(self) -> bool {
        self.definition().required
    }

    pub fn side(self) -> Side {
        self.definition().side
    }

    pub fn body_part(self) -> BodyPart {
        self.definition().part
    }

    pub fn mirror(self) -> HumanBone {
        match self {
            B::LeftUpperLeg => B::RightUpperLeg,
            B::RightUpperLeg => B::LeftUpperLeg,
            B::LeftLowerLeg => B::RightLowerLeg,
            B::RightLowerLeg => B::LeftLowerLeg,
            B::LeftFoot => B::RightFoot,
            B::RightFoot => B::LeftFoot,
            B::LeftShoulder => B::RightShoulder,
            B::RightShoulder => B::LeftShoulder,
            B::LeftUpperArm => B::RightUpperArm,
            B::RightUpperArm => B::LeftUpperArm,
            B::LeftLowerArm => B::RightLowerArm,
            B::RightLowerArm => B::LeftLowerArm,
            B::LeftHand => B::RightHand,
            B::RightHand => B::LeftHand,
            B::LeftToes => B::RightToes,
            B::RightToes => B::LeftToes,
            B::LeftEye => B::RightEye,
            B::RightEye => B::LeftEye,
            other => other,
        }
    }

    /// Sign applied to each canonical axis angle so that mirrored motion has equal DoF values on
    /// both sides.
    pub fn axis_sign(self) -> Vec3 {
        let definition = self.definition();
        match (definition.side, definition.bend) {
            (Side::Right, BendReference::Forward) => Vec3::new(-1., 1., -1.),
            (Side::Right, BendReference::Side) => Vec3::new(-1., -1., 1.),
            _ => Vec3::ONE,
        }
    }
}

/// Bones of one hand.
#[derive(Reflect, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FingerBone {
    ThumbProximal,
    ThumbIntermediate,
    ThumbDistal,
    IndexProximal,
    IndexIntermediate,
    IndexDistal,
    MiddleProximal,
    MiddleIntermediate,
    MiddleDistal,
    RingProximal,
    RingIntermediate,
    RingDistal,
    LittleProximal,
    LittleIntermediate,
    LittleDistal,
}

pub const FINGER_BONE_COUNT: usize = 15;

impl FingerBone {
    pub const ALL: [FingerBone; FINGER_BONE_COUNT] = [
        Self::ThumbProximal,
        Self::ThumbIntermediate,
        Self::ThumbDistal,
        Self::IndexProximal,
        Self::IndexIntermediate,
        Self::IndexDistal,
        Self::MiddleProximal,
        Self::MiddleIntermediate,
        Self::MiddleDistal,
        Self::RingProximal,
        Self::RingIntermediate,
        Self::RingDistal,
        Self::LittleProximal,
        Self::LittleIntermediate,
        Self::LittleDistal,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn finger(self) -> usize {
        self.index() / 3
    }

    /// Phalanx within the finger: 0 proximal, 1 intermediate, 2 distal.
    pub fn phalanx(self) -> usize {
        self.index() % 3
    }

    /// `None` means the hand bone itself.
    pub fn parent(self) -> Option<FingerBone> {
        match self.phalanx() {
            0 => None,
            _ => Self::from_index(self.index() - 1),
        }
    }

    pub fn child(self) -> Option<FingerBone> {
        match self.phalanx() {
            2 => None,
            _ => Self::from_index(self.index() + 1),
        }
    }

    /// Hand DoFs driving the X, Y and Z canonical axes of this bone.
    pub fn dofs(self) -> [Option<usize>; 3] {
        let base = self.finger() * dof::DOFS_PER_FINGER;
        match self.phalanx() {
            0 => [None, Some(base), Some(base + 1)],
            1 => [None, None, Some(base + 2)],
            _ => [None, None, Some(base + 3)],
        }
    }
}

/// IK goals of the generic pose.
#[derive(Reflect, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Goal {
    LeftFoot,
    RightFoot,
    LeftHand,
    RightHand,
}

pub const GOAL_COUNT: usize = 4;

impl Goal {
    pub const ALL: [Goal; GOAL_COUNT] = [
        Self::LeftFoot,
        Self::RightFoot,
        Self::LeftHand,
        Self::RightHand,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// End bone of the limb this goal drives.
    pub fn bone(self) -> HumanBone {
        match self {
            Self::LeftFoot => B::LeftFoot,
            Self::RightFoot => B::RightFoot,
            Self::LeftHand => B::LeftHand,
            Self::RightHand => B::RightHand,
        }
    }

    /// Top, mid and end bones of the limb.
    pub fn chain(self) -> [HumanBone; 3] {
        match self {
            Self::LeftFoot => [B::LeftUpperLeg, B::LeftLowerLeg, B::LeftFoot],
            Self::RightFoot => [B::RightUpperLeg, B::RightLowerLeg, B::RightFoot],
            Self::LeftHand => [B::LeftUpperArm, B::LeftLowerArm, B::LeftHand],
            Self::RightHand => [B::RightUpperArm, B::RightLowerArm, B::RightHand],
        }
    }

    pub fn body_part(self) -> BodyPart {
        match self {
            Self::LeftFoot => BodyPart::LeftFootIk,
            Self::RightFoot => BodyPart::RightFootIk,
            Self::LeftHand => BodyPart::LeftHandIk,
            Self::RightHand => BodyPart::RightHandIk,
        }
    }

    pub fn mirror(self) -> Self {
        match self {
            Self::LeftFoot => Self::RightFoot,
            Self::RightFoot => Self::LeftFoot,
            Self::LeftHand => Self::RightHand,
            Self::RightHand => Self::LeftHand,
        }
    }

    pub fn is_foot(self) -> bool {
        matches!(self, Self::LeftFoot | Self::RightFoot)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::humanoid::BODY_DOF_COUNT;

    #[test]
    fn test_bone_table_is_ordered() {
        for (index, bone) in HumanBone::ALL.iter().enumerate() {
            assert_eq!(bone.index(), index);
            if let Some(parent) = bone.parent() {
                assert_ne!(parent, *bone);
            }
        }
        assert_eq!(HumanBone::from_index(HUMAN_BONE_COUNT), None);
    }

    #[test]
    fn test_every_dof_is_driven_once() {
        let mut seen = [0; BODY_DOF_COUNT];
        for bone in HumanBone::ALL {
            for dof in bone.definition().dofs.into_iter().flatten() {
                seen[dof] += 1;
            }
        }
        assert!(seen.iter().all(|count| *count == 1), "{seen:?}");
    }

    #[test]
    fn test_mirror_is_involution() {
        for bone in HumanBone::ALL {
            assert_eq!(bone.mirror().mirror(), bone);
            assert_eq!(bone.mirror().side(), bone.side().mirror());
        }
        for goal in Goal::ALL {
            assert_eq!(goal.mirror().bone(), goal.bone().mirror());
        }
    }

    #[test]
    fn test_finger_hierarchy() {
        assert_eq!(FingerBone::IndexProximal.parent(), None);
        assert_eq!(
            FingerBone::IndexDistal.parent(),
            Some(FingerBone::IndexIntermediate)
        );
        assert_eq!(FingerBone::LittleDistal.child(), None);
        assert_eq!(FingerBone::RingProximal.dofs(), [None, Some(12), Some(13)]);
    }
}
