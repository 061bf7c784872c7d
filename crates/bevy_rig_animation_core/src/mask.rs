use bevy::reflect::Reflect;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{RigError, RigResult},
    humanoid::{BODY_DOFS, BODY_DOF_COUNT, GOAL_COUNT, Goal},
};

bitflags! {
    /// Set of body parts a layer is allowed to write.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BodyParts: u16 {
        const ROOT = 1 << 0;
        const BODY = 1 << 1;
        const HEAD = 1 << 2;
        const LEFT_LEG = 1 << 3;
        const RIGHT_LEG = 1 << 4;
        const LEFT_ARM = 1 << 5;
        const RIGHT_ARM = 1 << 6;
        const LEFT_FINGERS = 1 << 7;
        const RIGHT_FINGERS = 1 << 8;
        const LEFT_FOOT_IK = 1 << 9;
        const RIGHT_FOOT_IK = 1 << 10;
        const LEFT_HAND_IK = 1 << 11;
        const RIGHT_HAND_IK = 1 << 12;
    }
}

impl Default for BodyParts {
    fn default() -> Self {
        Self::all()
    }
}

impl BodyParts {
    pub const ARMS: Self = Self::LEFT_ARM
        .union(Self::RIGHT_ARM)
        .union(Self::LEFT_FINGERS)
        .union(Self::RIGHT_FINGERS)
        .union(Self::LEFT_HAND_IK)
        .union(Self::RIGHT_HAND_IK);

    pub const LEGS: Self = Self::LEFT_LEG
        .union(Self::RIGHT_LEG)
        .union(Self::LEFT_FOOT_IK)
        .union(Self::RIGHT_FOOT_IK);

    pub fn from_parts(parts: impl IntoIterator<Item = BodyPart>) -> Self {
        parts
            .into_iter()
            .fold(Self::empty(), |acc, part| acc | part.flag())
    }
}

/// One named body part. The serialized form of masks is a list of these.
#[derive(Reflect, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyPart {
    Root,
    Body,
    Head,
    LeftLeg,
    RightLeg,
    LeftArm,
    RightArm,
    LeftFingers,
    RightFingers,
    LeftFootIk,
    RightFootIk,
    LeftHandIk,
    RightHandIk,
}

pub const BODY_PART_COUNT: usize = 13;

impl BodyPart {
    pub const ALL: [BodyPart; BODY_PART_COUNT] = [
        Self::Root,
        Self::Body,
        Self::Head,
        Self::LeftLeg,
        Self::RightLeg,
        Self::LeftArm,
        Self::RightArm,
        Self::LeftFingers,
        Self::RightFingers,
        Self::LeftFootIk,
        Self::RightFootIk,
        Self::LeftHandIk,
        Self::RightHandIk,
    ];

    pub fn from_index(index: usize) -> RigResult<Self> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(RigError::InvalidBodyPart(index))
    }

    pub fn flag(self) -> BodyParts {
        BodyParts::from_bits_truncate(1 << self as u16)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Root => "Root",
            Self::Body => "Body",
            Self::Head => "Head",
            Self::LeftLeg => "Left Leg",
            Self::RightLeg => "Right Leg",
            Self::LeftArm => "Left Arm",
            Self::RightArm => "Right Arm",
            Self::LeftFingers => "Left Fingers",
            Self::RightFingers => "Right Fingers",
            Self::LeftFootIk => "Left Foot IK",
            Self::RightFootIk => "Right Foot IK",
            Self::LeftHandIk => "Left Hand IK",
            Self::RightHandIk => "Right Hand IK",
        }
    }
}

/// Per-field mask over a generic [`Pose`](crate::pose::Pose).
///
/// Used both as a gate (which fields a layer may touch) and as a record of which fields a pose
/// actually carries.
#[derive(Reflect, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct PoseMask {
    pub root: bool,
    pub dofs: u64,
    pub goals: u8,
    pub left_hand: bool,
    pub right_hand: bool,
}

const ALL_DOFS: u64 = (1 << BODY_DOF_COUNT) - 1;
const ALL_GOALS: u8 = (1 << GOAL_COUNT) - 1;

impl PoseMask {
    pub const ALL: Self = Self {
        root: true,
        dofs: ALL_DOFS,
        goals: ALL_GOALS,
        left_hand: true,
        right_hand: true,
    };

    pub const NONE: Self = Self {
        root: false,
        dofs: 0,
        goals: 0,
        left_hand: false,
        right_hand: false,
    };

    pub fn from_body_parts(parts: BodyParts) -> Self {
        let mut mask = Self::NONE;
        mask.root = parts.contains(BodyParts::ROOT);
        for (index, definition) in BODY_DOFS.iter().enumerate() {
            if parts.contains(definition.bone.body_part().flag()) {
                mask.dofs |= 1 << index;
            }
        }
        for goal in Goal::ALL {
            if parts.contains(goal.body_part().flag()) {
                mask.goals |= 1 << goal.index();
            }
        }
        mask.left_hand = parts.contains(BodyParts::LEFT_FINGERS);
        mask.right_hand = parts.contains(BodyParts::RIGHT_FINGERS);
        mask
    }

    pub fn has_dof(&self, index: usize) -> bool {
        index < BODY_DOF_COUNT && self.dofs & (1 << index) != 0
    }

    pub fn set_dof(&mut self, index: usize, value: bool) {
        if index >= BODY_DOF_COUNT {
            return;
        }
        if value {
            self.dofs |= 1 << index;
        } else {
            self.dofs &= !(1 << index);
        }
    }

    pub fn has_goal(&self, goal: Goal) -> bool {
        self.goals & (1 << goal.index()) != 0
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            root: self.root || other.root,
            dofs: self.dofs | other.dofs,
            goals: self.goals | other.goals,
            left_hand: self.left_hand || other.left_hand,
            right_hand: self.right_hand || other.right_hand,
        }
    }

    pub fn intersection(&self, other: &Self) -> Self {
        Self {
            root: self.root && other.root,
            dofs: self.dofs & other.dofs,
            goals: self.goals & other.goals,
            left_hand: self.left_hand && other.left_hand,
            right_hand: self.right_hand && other.right_hand,
        }
    }

    /// Fields in `self` that are not in `other`.
    pub fn difference(&self, other: &Self) -> Self {
        Self {
            root: self.root && !other.root,
            dofs: self.dofs & !other.dofs,
            goals: self.goals & !other.goals,
            left_hand: self.left_hand && !other.left_hand,
            right_hand: self.right_hand && !other.right_hand,
        }
    }

    /// Same mask with left and right swapped.
    pub fn mirrored(&self) -> Self {
        let mut mirrored = Self {
            root: self.root,
            dofs: 0,
            goals: 0,
            left_hand: self.right_hand,
            right_hand: self.left_hand,
        };
        for index in 0..BODY_DOF_COUNT {
            if self.has_dof(index) {
                if let Some((target, _)) = crate::humanoid::mirror_dof(index) {
                    mirrored.set_dof(target, true);
                }
            }
        }
        for goal in Goal::ALL {
            if self.has_goal(goal) {
                mirrored.goals |= 1 << goal.mirror().index();
            }
        }
        mirrored
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::humanoid::dof;

    #[test]
    fn test_full_body_mask_is_all() {
        assert_eq!(PoseMask::from_body_parts(BodyParts::all()), PoseMask::ALL);
        assert_eq!(
            PoseMask::from_body_parts(BodyParts::empty()),
            PoseMask::NONE
        );
    }

    #[test]
    fn test_arm_mask() {
        let mask = PoseMask::from_body_parts(BodyParts::LEFT_ARM | BodyParts::RIGHT_ARM);
        assert!(mask.has_dof(dof::LEFT_ARM_DOWN_UP));
        assert!(mask.has_dof(dof::RIGHT_SHOULDER_FRONT_BACK));
        assert!(mask.has_dof(dof::RIGHT_HAND_IN_OUT));
        assert!(!mask.has_dof(dof::SPINE_FRONT_BACK));
        assert!(!mask.has_dof(dof::LEFT_UPPER_LEG_TWIST));
        assert!(!mask.root);
        assert!(!mask.has_goal(Goal::LeftHand));
        assert!(!mask.left_hand);
    }

    #[test]
    fn test_body_part_lookup() {
        assert_eq!(BodyPart::from_index(2), Ok(BodyPart::Head));
        assert_eq!(
            BodyPart::from_index(BODY_PART_COUNT),
            Err(RigError::InvalidBodyPart(BODY_PART_COUNT))
        );
        assert_eq!(
            BodyParts::from_parts([BodyPart::Root, BodyPart::LeftHandIk]),
            BodyParts::ROOT | BodyParts::LEFT_HAND_IK
        );
    }

    #[test]
    fn test_mirrored_mask() {
        let left = PoseMask::from_body_parts(BodyParts::LEFT_LEG | BodyParts::LEFT_FOOT_IK);
        let right = PoseMask::from_body_parts(BodyParts::RIGHT_LEG | BodyParts::RIGHT_FOOT_IK);
        assert_eq!(left.mirrored(), right);
    }
}
