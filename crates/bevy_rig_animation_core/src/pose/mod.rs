pub mod algebra;
pub mod channels;

use bevy::{
    math::{Quat, Vec3},
    reflect::Reflect,
    transform::components::Transform,
};

use crate::{
    humanoid::{BODY_DOF_COUNT, FINGER_DOF_COUNT, GOAL_COUNT, Goal, Side},
    ik::FootMemory,
    mask::PoseMask,
};
use algebra::{ZERO_QUAT, accumulate_quat, normalize_quat_or};

/// Finger DoFs of one hand.
#[derive(Reflect, Clone, Debug, PartialEq)]
pub struct HandPose {
    pub dofs: Vec<f32>,
}

impl Default for HandPose {
    fn default() -> Self {
        Self {
            dofs: vec![0.; FINGER_DOF_COUNT],
        }
    }
}

/// Skeleton-independent humanoid pose.
///
/// The root is the hips transform in normalized character space (translations divided by the
/// character's scale). Goals are the feet and hands, also in normalized character space, with
/// rotations relative to each goal bone's rest orientation.
#[derive(Reflect, Clone, Debug, PartialEq)]
pub struct Pose {
    pub root: Transform,
    pub dofs: Vec<f32>,
    pub goals: [Transform; GOAL_COUNT],
    pub left_hand: HandPose,
    pub right_hand: HandPose,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            root: Transform::IDENTITY,
            dofs: vec![0.; BODY_DOF_COUNT],
            goals: [Transform::IDENTITY; GOAL_COUNT],
            left_hand: HandPose::default(),
            right_hand: HandPose::default(),
        }
    }
}

impl Pose {
    pub fn goal(&self, goal: Goal) -> &Transform {
        &self.goals[goal.index()]
    }

    pub fn goal_mut(&mut self, goal: Goal) -> &mut Transform {
        &mut self.goals[goal.index()]
    }

    pub fn hand(&self, side: Side) -> &HandPose {
        match side {
            Side::Right => &self.right_hand,
            _ => &self.left_hand,
        }
    }

    pub fn hand_mut(&mut self, side: Side) -> &mut HandPose {
        match side {
            Side::Right => &mut self.right_hand,
            _ => &mut self.left_hand,
        }
    }

    /// Clears every field to the neutral value of a weighted accumulation.
    pub fn clear_accumulator(&mut self) {
        self.root = Transform {
            translation: Vec3::ZERO,
            rotation: ZERO_QUAT,
            scale: Vec3::ZERO,
        };
        self.dofs.fill(0.);
        for goal in &mut self.goals {
            goal.translation = Vec3::ZERO;
            goal.rotation = ZERO_QUAT;
            goal.scale = Vec3::ZERO;
        }
        self.left_hand.dofs.fill(0.);
        self.right_hand.dofs.fill(0.);
    }

    /// Adds `other * weight` to this pose. Rotations are summed in a common hemisphere.
    pub fn accumulate(&mut self, other: &Pose, weight: f32) {
        accumulate_transform(&mut self.root, &other.root, weight);
        for (acc, value) in self.dofs.iter_mut().zip(&other.dofs) {
            *acc += value * weight;
        }
        for (acc, value) in self.goals.iter_mut().zip(&other.goals) {
            accumulate_transform(acc, value, weight);
        }
        for (acc, value) in self.left_hand.dofs.iter_mut().zip(&other.left_hand.dofs) {
            *acc += value * weight;
        }
        for (acc, value) in self.right_hand.dofs.iter_mut().zip(&other.right_hand.dofs) {
            *acc += value * weight;
        }
    }

    /// Turns an accumulated sum into a weighted average.
    pub fn finish_accumulation(&mut self, total_weight: f32) {
        let inverse = if total_weight > 1e-6 {
            total_weight.recip()
        } else {
            0.
        };
        finish_transform(&mut self.root, inverse);
        self.dofs.iter_mut().for_each(|value| *value *= inverse);
        for goal in &mut self.goals {
            finish_transform(goal, inverse);
        }
        self.left_hand
            .dofs
            .iter_mut()
            .for_each(|value| *value *= inverse);
        self.right_hand
            .dofs
            .iter_mut()
            .for_each(|value| *value *= inverse);
    }

    /// Copies the fields selected by `mask` from `other`.
    pub fn copy_masked(&mut self, other: &Pose, mask: &PoseMask) {
        if mask.root {
            self.root = other.root;
        }
        for index in 0..BODY_DOF_COUNT {
            if mask.has_dof(index) {
                self.dofs[index] = other.dofs[index];
            }
        }
        for goal in Goal::ALL {
            if mask.has_goal(goal) {
                self.goals[goal.index()] = other.goals[goal.index()];
            }
        }
        if mask.left_hand {
            self.left_hand.dofs.clone_from(&other.left_hand.dofs);
        }
        if mask.right_hand {
            self.right_hand.dofs.clone_from(&other.right_hand.dofs);
        }
    }
}

fn accumulate_transform(acc: &mut Transform, value: &Transform, weight: f32) {
    acc.translation += value.translation * weight;
    accumulate_quat(&mut acc.rotation, value.rotation, weight);
    acc.scale += value.scale * weight;
}

fn finish_transform(transform: &mut Transform, inverse_weight: f32) {
    transform.translation *= inverse_weight;
    transform.rotation = normalize_quat_or(transform.rotation, Quat::IDENTITY);
    transform.scale *= inverse_weight;
    if inverse_weight == 0. {
        transform.scale = Vec3::ONE;
    }
}

/// Per-joint local transforms of a concrete skeleton, indexed like its joints.
#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct SkeletonPose {
    pub locals: Vec<Transform>,
}

/// Everything a tick produces besides the pose itself.
#[derive(Reflect, Clone, Debug, PartialEq)]
pub struct MotionDelta {
    /// Root displacement of this tick, in the character's frame at the start of the tick.
    pub delta: Transform,
    pub gravity_weight: f32,
    /// Previous left and right foot goals, used by foot stabilization.
    pub feet: [FootMemory; 2],
}

impl Default for MotionDelta {
    fn default() -> Self {
        Self {
            delta: Transform::IDENTITY,
            gravity_weight: 0.,
            feet: [FootMemory::default(); 2],
        }
    }
}
