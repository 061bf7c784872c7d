//! Transform and quaternion helpers shared by blending, layering and IK.

use bevy::{
    math::{Quat, Vec3},
    transform::components::Transform,
};

/// A zero quaternion, the starting value of a weighted accumulation.
pub const ZERO_QUAT: Quat = Quat::from_xyzw(0., 0., 0., 0.);

/// Scales a rotation by `weight` along its shortest arc from identity.
pub fn quat_weight(q: Quat, weight: f32) -> Quat {
    Quat::IDENTITY.slerp(q, weight)
}

/// Applies `delta` on top of `base` with the given weight.
pub fn additive_blend_quat(base: Quat, delta: Quat, weight: f32) -> Quat {
    base.slerp(delta * base, weight)
}

/// Rotation taking `reference` to `value`, such that `value = delta * reference`.
pub fn quat_difference(reference: Quat, value: Quat) -> Quat {
    value * reference.inverse()
}

/// Adds `q * weight` to an accumulator, flipping `q` into the accumulator's hemisphere first.
pub fn accumulate_quat(accumulator: &mut Quat, q: Quat, weight: f32) {
    let q = if accumulator.dot(q) < 0. { -q } else { q };
    *accumulator = *accumulator + q * weight;
}

/// Normalizes an accumulated quaternion, falling back to `fallback` when nothing was added.
pub fn normalize_quat_or(q: Quat, fallback: Quat) -> Quat {
    let length_squared = q.length_squared();
    if length_squared > 1e-12 {
        q * length_squared.sqrt().recip()
    } else {
        fallback
    }
}

/// Signed geometric weighting for scale: `sign(s) * |s|^weight` per component.
pub fn scale_weight(scale: Vec3, weight: f32) -> Vec3 {
    Vec3::new(
        scale.x.signum() * scale.x.abs().powf(weight),
        scale.y.signum() * scale.y.abs().powf(weight),
        scale.z.signum() * scale.z.abs().powf(weight),
    )
}

fn safe_div(a: f32, b: f32) -> f32 {
    if b.abs() > 1e-6 { a / b } else { 1. }
}

pub fn scale_difference(reference: Vec3, value: Vec3) -> Vec3 {
    Vec3::new(
        safe_div(value.x, reference.x),
        safe_div(value.y, reference.y),
        safe_div(value.z, reference.z),
    )
}

pub fn lerp_transform(a: &Transform, b: &Transform, factor: f32) -> Transform {
    Transform {
        translation: a.translation.lerp(b.translation, factor),
        rotation: a.rotation.slerp(b.rotation, factor),
        scale: a.scale.lerp(b.scale, factor),
    }
}

/// Applies an additive delta to a transform.
pub fn additive_transform(base: &Transform, delta: &Transform, weight: f32) -> Transform {
    Transform {
        translation: base.translation + delta.translation * weight,
        rotation: additive_blend_quat(base.rotation, delta.rotation, weight),
        scale: base.scale * scale_weight(delta.scale, weight),
    }
}

/// Additive delta of `value` relative to `reference`.
pub fn difference_transform(reference: &Transform, value: &Transform) -> Transform {
    Transform {
        translation: value.translation - reference.translation,
        rotation: quat_difference(reference.rotation, value.rotation),
        scale: scale_difference(reference.scale, value.scale),
    }
}

pub fn inverse_transform(transform: &Transform) -> Transform {
    Transform::from_matrix(transform.to_matrix().inverse())
}

/// Rotation about the vertical axis contained in `q`.
pub fn yaw(q: Quat) -> Quat {
    normalize_quat_or(Quat::from_xyzw(0., q.y, 0., q.w), Quat::IDENTITY)
}

/// Ground-plane projection of a root transform: horizontal translation and yaw only.
pub fn project_to_ground(root: &Transform) -> Transform {
    Transform {
        translation: Vec3::new(root.translation.x, 0., root.translation.z),
        rotation: yaw(root.rotation),
        scale: Vec3::ONE,
    }
}

/// Motion between two projected root transforms, expressed in the frame of `from`.
pub fn motion_between(from: &Transform, to: &Transform) -> Transform {
    let inverse_rotation = from.rotation.inverse();
    Transform {
        translation: inverse_rotation * (to.translation - from.translation),
        rotation: (inverse_rotation * to.rotation).normalize(),
        scale: Vec3::ONE,
    }
}
