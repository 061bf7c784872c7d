//! Conversion between generic humanoid poses and concrete skeleton poses.

use bevy::{math::Vec3, transform::components::Transform};

use super::{
    bones::{FingerBone, Goal, HumanBone, Side},
    map::HumanoidMap,
};
use crate::pose::{Pose, SkeletonPose, algebra::quat_weight};

fn read_values(values: &[f32], indices: [Option<usize>; 3]) -> Vec3 {
    let read = |index: Option<usize>| index.and_then(|i| values.get(i).copied()).unwrap_or(0.);
    Vec3::new(read(indices[0]), read(indices[1]), read(indices[2]))
}

fn write_values(values: &mut [f32], indices: [Option<usize>; 3], decoded: Vec3) {
    for (axis, index) in indices.into_iter().enumerate() {
        if let Some(slot) = index.and_then(|i| values.get_mut(i)) {
            *slot = decoded[axis];
        }
    }
}

impl HumanoidMap {
    /// Writes the local transforms of every mapped joint for a generic pose.
    ///
    /// Unmapped joints keep their rest transforms. Goals are ignored here; they only feed IK.
    pub fn to_skeleton(&self, pose: &Pose, out: &mut SkeletonPose) {
        out.locals.clone_from(&self.rest_locals().locals);

        if let Some(hips) = self.joint(HumanBone::Hips) {
            let rest = self.rest_globals()[hips];
            let global = Transform {
                translation: pose.root.translation * self.scale(),
                rotation: pose.root.rotation * rest.rotation,
                scale: rest.scale,
            };
            let local = *self.hips_parent_inverse() * global;
            out.locals[hips].translation = local.translation;
            out.locals[hips].rotation = local.rotation.normalize();
        }

        for bone in HumanBone::ALL.into_iter().skip(1) {
            let (Some(joint), Some(axes)) = (self.joint(bone), self.axes(bone)) else {
                continue;
            };
            let values = read_values(&pose.dofs, bone.definition().dofs);
            out.locals[joint].rotation = axes.from_axes(values);
        }

        for entry in self.redistribution() {
            let Some(joint) = self.joint(entry.target) else {
                continue;
            };
            let values = read_values(&pose.dofs, entry.bone.definition().dofs);
            let contribution = quat_weight(entry.axes.from_axes(values), entry.ratio);
            out.locals[joint].rotation = (out.locals[joint].rotation * contribution).normalize();
        }

        for side in [Side::Left, Side::Right] {
            let hand = self.hand_map(side);
            let values = &pose.hand(side).dofs;
            for finger in FingerBone::ALL {
                if let Some(joint) = hand.joints[finger.index()] {
                    out.locals[joint].rotation =
                        hand.axes[finger.index()].from_axes(read_values(values, finger.dofs()));
                }
            }
        }
    }

    /// Reads the generic pose of a skeleton pose. DoFs of unmapped bones read as zero.
    pub fn from_skeleton(&self, skeleton_pose: &SkeletonPose, out: &mut Pose) {
        let mut globals = Vec::with_capacity(self.skeleton().len());
        self.skeleton().compute_globals(skeleton_pose, &mut globals);
        let local_rotation = |joint: usize| {
            skeleton_pose
                .locals
                .get(joint)
                .map(|local| local.rotation)
                .unwrap_or(self.rest_locals().locals[joint].rotation)
        };

        if let Some(hips) = self.joint(HumanBone::Hips) {
            let rest = self.rest_globals()[hips];
            out.root = Transform {
                translation: globals[hips].translation / self.scale(),
                rotation: (globals[hips].rotation * rest.rotation.inverse()).normalize(),
                scale: Vec3::ONE,
            };
        }

        out.dofs.fill(0.);
        for bone in HumanBone::ALL.into_iter().skip(1) {
            let (Some(joint), Some(axes)) = (self.joint(bone), self.axes(bone)) else {
                continue;
            };
            let decoded = axes.to_axes(local_rotation(joint));
            write_values(&mut out.dofs, bone.definition().dofs, decoded);
        }

        for goal in Goal::ALL {
            let transform = self
                .joint(goal.bone())
                .and_then(|joint| self.goal_from_character(goal, &globals[joint]))
                .unwrap_or(Transform::IDENTITY);
            out.goals[goal.index()] = transform;
        }

        for side in [Side::Left, Side::Right] {
            let hand = self.hand_map(side);
            let values = &mut out.hand_mut(side).dofs;
            values.fill(0.);
            for finger in FingerBone::ALL {
                if let Some(joint) = hand.joints[finger.index()] {
                    let decoded = hand.axes[finger.index()].to_axes(local_rotation(joint));
                    write_values(values, finger.dofs(), decoded);
                }
            }
        }
    }
}
