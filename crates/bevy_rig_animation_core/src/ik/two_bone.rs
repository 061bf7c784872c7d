use bevy::{
    math::{Quat, Vec3},
    transform::components::Transform,
};

use crate::{
    humanoid::Skeleton,
    pose::{SkeletonPose, algebra::quat_weight},
};

const MIN_BONE_LENGTH: f32 = 1e-5;

/// Joints of a limb, with the direction its middle joint should point to when the limb is
/// straight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoBoneChain {
    pub top: usize,
    pub mid: usize,
    pub end: usize,
    pub pole: Vec3,
}

/// Ratio applied to both bones of a chain reaching `over` past its length. Tends to
/// `1 + stretch` for far targets.
pub fn soft_stretch(over: f32, stretch: f32) -> f32 {
    if over <= 0. || stretch <= 0. {
        return 1.;
    }
    1. + stretch * (1. - (-over / stretch).exp())
}

/// Bends and aims a two-bone chain so that its end reaches `target`.
///
/// The target is pulled from the current end position by `weight`, and the aim is eased by
/// `1 - (1 - weight)^4`. `globals` must be up to date on entry and is kept up to date.
pub fn solve_two_bone(
    skeleton: &Skeleton,
    pose: &mut SkeletonPose,
    globals: &mut Vec<Transform>,
    chain: TwoBoneChain,
    target: Vec3,
    weight: f32,
    stretch: f32,
) {
    if weight <= 0. {
        return;
    }
    let weight = weight.min(1.);
    let TwoBoneChain {
        top,
        mid,
        end,
        pole,
    } = chain;

    let target = globals[end].translation.lerp(target, weight);
    let top_position = globals[top].translation;
    let mut upper = top_position.distance(globals[mid].translation);
    let mut lower = globals[mid].translation.distance(globals[end].translation);
    if upper < MIN_BONE_LENGTH || lower < MIN_BONE_LENGTH {
        return;
    }
    let distance = top_position.distance(target);

    let ratio = soft_stretch(distance / (upper + lower) - 1., stretch);
    if ratio > 1. {
        pose.locals[mid].translation *= ratio;
        pose.locals[end].translation *= ratio;
        upper *= ratio;
        lower *= ratio;
        skeleton.compute_globals(pose, globals);
    }

    let mid_position = globals[mid].translation;
    let end_position = globals[end].translation;
    let to_top = top_position - mid_position;
    let to_end = end_position - mid_position;

    let reach = distance.clamp(
        (upper - lower).abs() + MIN_BONE_LENGTH,
        upper + lower - MIN_BONE_LENGTH,
    );
    let cosine = ((upper * upper + lower * lower - reach * reach) / (2. * upper * lower))
        .clamp(-1., 1.);
    let current_angle = to_top.angle_between(to_end);
    let normal = to_top.cross(to_end);
    let axis = if normal.length_squared() > 1e-8 * upper * upper * lower * lower {
        normal.normalize()
    } else {
        (end_position - top_position).cross(pole).normalize_or_zero()
    };
    let bend = if axis == Vec3::ZERO {
        Quat::IDENTITY
    } else {
        Quat::from_axis_angle(axis, cosine.acos() - current_angle)
    };
    let mid_rotation = bend * globals[mid].rotation;

    let bent_end = mid_position + bend * to_end;
    let from = (bent_end - top_position).normalize_or_zero();
    let to = (target - top_position).normalize_or_zero();
    let aim = if from == Vec3::ZERO || to == Vec3::ZERO {
        Quat::IDENTITY
    } else {
        Quat::from_rotation_arc(from, to)
    };
    let aim = quat_weight(aim, 1. - (1. - weight).powi(4));

    skeleton.set_global_rotation(pose, globals, top, aim * globals[top].rotation);
    skeleton.compute_globals(pose, globals);
    skeleton.set_global_rotation(pose, globals, mid, aim * mid_rotation);
    skeleton.compute_globals(pose, globals);
}

/// Slerps the character-space rotation of `joint` towards `rotation`.
pub fn blend_end_rotation(
    skeleton: &Skeleton,
    pose: &mut SkeletonPose,
    globals: &mut Vec<Transform>,
    joint: usize,
    rotation: Quat,
    weight: f32,
) {
    if weight <= 0. {
        return;
    }
    let blended = globals[joint].rotation.slerp(rotation, weight.min(1.));
    skeleton.set_global_rotation(pose, globals, joint, blended);
    skeleton.compute_globals(pose, globals);
}
