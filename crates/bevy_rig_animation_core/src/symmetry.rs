use bevy::{
    math::{Quat, Vec3},
    reflect::{Reflect, std_traits::ReflectDefault},
    transform::components::Transform,
};
use serde::{Deserialize, Serialize};

use crate::{
    humanoid::{BODY_DOF_COUNT, Goal, mirror_dof},
    pose::Pose,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Reflect, Serialize, Deserialize)]
#[reflect(Default)]
pub enum SymmetryMode {
    /// Mirror about the character's sagittal plane, perpendicular to the X axis.
    #[default]
    MirrorX,
}

impl SymmetryMode {
    pub fn apply_position(&self, mut input: Vec3) -> Vec3 {
        input.x *= -1.;
        input
    }

    pub fn apply_quat(&self, mut input: Quat) -> Quat {
        input.x *= -1.;
        input.w *= -1.;
        -input
    }

    pub fn apply_transform(&self, input: &Transform) -> Transform {
        Transform {
            translation: self.apply_position(input.translation),
            rotation: self.apply_quat(input.rotation),
            scale: input.scale,
        }
    }
}

impl Pose {
    /// Mirrors the pose about the character's sagittal plane: left and right DoFs, goals and
    /// hands swap, lateral DoFs of center bones change sign, and the root is reflected.
    pub fn mirror(&mut self) {
        let mode = SymmetryMode::MirrorX;
        self.root = mode.apply_transform(&self.root);

        for index in 0..BODY_DOF_COUNT {
            let Some((target, sign)) = mirror_dof(index) else {
                continue;
            };
            if target == index {
                self.dofs[index] *= sign;
            } else if target > index {
                self.dofs.swap(index, target);
            }
        }

        for goal in [Goal::LeftFoot, Goal::LeftHand] {
            self.goals.swap(goal.index(), goal.mirror().index());
        }
        for goal in &mut self.goals {
            *goal = mode.apply_transform(goal);
        }

        std::mem::swap(&mut self.left_hand, &mut self.right_hand);
    }
}
