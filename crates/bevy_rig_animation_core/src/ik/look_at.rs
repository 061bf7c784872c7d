use std::f32::consts::PI;

use bevy::{
    math::{Quat, Vec3},
    transform::components::Transform,
};

use super::LookAtTarget;
use crate::{
    humanoid::{HumanBone, HumanoidMap},
    pose::{SkeletonPose, algebra::quat_weight},
};

const BODY_BONES: [HumanBone; 3] = [HumanBone::Spine, HumanBone::Chest, HumanBone::UpperChest];
const HEAD_BONES: [HumanBone; 2] = [HumanBone::Neck, HumanBone::Head];
/// Extra passes on the head joint to absorb the shift of the eyes.
const HEAD_ITERATIONS: usize = 3;

/// Forward direction of `joint` in its own frame, derived from the character facing +Z at rest.
fn local_forward(map: &HumanoidMap, joint: usize) -> Vec3 {
    map.rest_globals()[joint].rotation.inverse() * Vec3::Z
}

/// Origin and direction of the character's gaze.
fn gaze(map: &HumanoidMap, globals: &[Transform], head: usize) -> (Vec3, Vec3) {
    let forward = globals[head].rotation * local_forward(map, head);
    let origin = match (
        map.joint(HumanBone::LeftEye),
        map.joint(HumanBone::RightEye),
    ) {
        (Some(left), Some(right)) => (globals[left].translation + globals[right].translation) / 2.,
        _ => globals[head].translation,
    };
    (origin, forward)
}

fn rotate_towards(
    map: &HumanoidMap,
    pose: &mut SkeletonPose,
    globals: &mut Vec<Transform>,
    joint: usize,
    from: Vec3,
    to: Vec3,
    weight: f32,
) {
    let (from, to) = (from.normalize_or_zero(), to.normalize_or_zero());
    if weight <= 0. || from == Vec3::ZERO || to == Vec3::ZERO {
        return;
    }
    let arc = quat_weight(Quat::from_rotation_arc(from, to), weight.min(1.));
    let skeleton = map.skeleton();
    skeleton.set_global_rotation(pose, globals, joint, arc * globals[joint].rotation);
    skeleton.compute_globals(pose, globals);
}

/// Point the gaze should reach: the target, pulled towards the current gaze by the overall
/// weight and limited to the clamp cone around it.
fn aim_point(origin: Vec3, forward: Vec3, target: &LookAtTarget) -> Option<Vec3> {
    let to_target = target.position - origin;
    let distance = to_target.length();
    if distance < 1e-5 {
        return None;
    }
    let direction = to_target / distance;
    let angle = forward.angle_between(direction);
    let max_angle = PI * (1. - target.clamp_weight.clamp(0., 1.));
    let limited = angle.min(max_angle) * target.weight.clamp(0., 1.);

    let axis = forward.cross(direction);
    let axis = if axis.length_squared() > 1e-10 {
        axis.normalize()
    } else {
        Vec3::Y
    };
    Some(origin + Quat::from_axis_angle(axis, limited) * forward * distance)
}

/// Mapped spine and head joints, proximal first, with the weight of their group.
fn look_at_joints(map: &HumanoidMap, target: &LookAtTarget) -> [Option<(usize, f32)>; 5] {
    let mut joints = [None; 5];
    let bones = BODY_BONES
        .iter()
        .map(|bone| (*bone, target.body_weight))
        .chain(HEAD_BONES.iter().map(|bone| (*bone, target.head_weight)));
    for (slot, (bone, weight)) in joints.iter_mut().zip(bones) {
        *slot = map.joint(bone).map(|joint| (joint, weight));
    }
    joints
}

/// Turns the spine, neck, head and eyes towards a point. `globals` must be up to date on entry
/// and is kept up to date.
pub fn solve_look_at(
    map: &HumanoidMap,
    pose: &mut SkeletonPose,
    globals: &mut Vec<Transform>,
    target: &LookAtTarget,
) {
    let Some(head) = map.joint(HumanBone::Head) else {
        return;
    };
    if target.weight <= 0. {
        return;
    }
    let (origin, forward) = gaze(map, globals, head);
    let Some(aim) = aim_point(origin, forward, target) else {
        return;
    };

    let joints = look_at_joints(map, target);
    let count = joints.iter().flatten().count();
    for (index, (joint, weight)) in joints.into_iter().flatten().enumerate() {
        let (origin, forward) = gaze(map, globals, head);
        let share = weight / (count - index) as f32;
        rotate_towards(map, pose, globals, joint, forward, aim - origin, share);
    }
    for _ in 0..HEAD_ITERATIONS {
        let (origin, forward) = gaze(map, globals, head);
        rotate_towards(map, pose, globals, head, forward, aim - origin, target.head_weight);
    }

    for eye in [HumanBone::LeftEye, HumanBone::RightEye] {
        let Some(joint) = map.joint(eye) else {
            continue;
        };
        let forward = globals[joint].rotation * local_forward(map, joint);
        let to = aim - globals[joint].translation;
        rotate_towards(map, pose, globals, joint, forward, to, target.eyes_weight);
    }
}
