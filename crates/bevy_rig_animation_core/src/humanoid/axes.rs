//! Per-joint coordinate axes: the mapping between a joint's local rotation and the normalized
//! values of the DoFs driving it.

use std::f32::consts::PI;

use bevy::{
    math::{EulerRot, Mat3, Quat, Vec3},
    reflect::Reflect,
};
use serde::{Deserialize, Serialize};

/// How a canonical rotation is split into three angles.
#[derive(Reflect, Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AxesKind {
    /// Rotation about X only.
    Twist,
    /// Swing about (Y, Z) applied after a twist about X: `q = swing * twist`.
    #[default]
    ZYRoll,
    /// Twist about X applied after the swing: `q = twist * swing`.
    RollZY,
    /// Intrinsic X, Y, Z Euler angles.
    EulerXYZ,
}

#[derive(Reflect, Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub enum AxisLimit {
    /// The axis never rotates.
    #[default]
    Locked,
    /// Values are plain radians.
    Free,
    /// Values are normalized so that `min` maps to -1 and `max` maps to 1. Radians.
    Limited { min: f32, max: f32 },
}

impl AxisLimit {
    pub fn from_degrees(min: f32, max: f32) -> Self {
        Self::Limited {
            min: min.to_radians(),
            max: max.to_radians(),
        }
    }

    /// Angle in radians to normalized value.
    pub fn normalize(&self, angle: f32) -> f32 {
        match *self {
            Self::Locked => 0.,
            Self::Free => angle,
            Self::Limited { min, max } => {
                if angle >= 0. {
                    if max > f32::EPSILON { angle / max } else { 0. }
                } else if min < -f32::EPSILON {
                    angle / -min
                } else {
                    0.
                }
            }
        }
    }

    /// Normalized value to angle in radians.
    pub fn denormalize(&self, value: f32) -> f32 {
        match *self {
            Self::Locked => 0.,
            Self::Free => value,
            Self::Limited { min, max } => {
                if value >= 0. {
                    value * max
                } else {
                    value * -min
                }
            }
        }
    }

    pub fn contains(&self, angle: f32) -> bool {
        match *self {
            Self::Locked => angle.abs() <= f32::EPSILON,
            Self::Free => true,
            Self::Limited { min, max } => angle >= min && angle <= max,
        }
    }
}

/// Coordinate axes of one joint.
///
/// The local rotation of the joint is `pre * R * post⁻¹`, where `R` is a rotation in the
/// canonical frame (X along the bone, Z the bend axis) built from three angles.
#[derive(Reflect, Clone, Copy, Debug, PartialEq)]
pub struct Axes {
    pub pre: Quat,
    pub post: Quat,
    /// Per-axis sign, so mirrored joints read the same values for mirrored motion.
    pub sign: Vec3,
    pub limits: [AxisLimit; 3],
    /// Distance to the next joint along the bone.
    pub length: f32,
    pub kind: AxesKind,
}

impl Default for Axes {
    fn default() -> Self {
        Self {
            pre: Quat::IDENTITY,
            post: Quat::IDENTITY,
            sign: Vec3::ONE,
            limits: [AxisLimit::Free; 3],
            length: 0.,
            kind: AxesKind::ZYRoll,
        }
    }
}

impl Axes {
    /// Builds axes from a joint's rest local rotation and the canonical frame expressed in the
    /// joint's local space.
    pub fn from_frame(rest_local: Quat, frame: Quat) -> Self {
        Self {
            pre: rest_local * frame,
            post: frame,
            ..Default::default()
        }
    }

    /// Rotation in the canonical frame of the joint.
    pub fn to_canonical(&self, local: Quat) -> Quat {
        let canonical = self.pre.inverse() * local * self.post;
        if canonical.w < 0. { -canonical } else { canonical }
    }

    pub fn from_canonical(&self, canonical: Quat) -> Quat {
        (self.pre * canonical * self.post.inverse()).normalize()
    }

    /// Signed canonical angles of a local rotation, in radians.
    pub fn to_angles(&self, local: Quat) -> Vec3 {
        decompose(self.kind, self.to_canonical(local)) * self.sign
    }

    pub fn from_angles(&self, angles: Vec3) -> Quat {
        self.from_canonical(compose(self.kind, angles * self.sign))
    }

    /// Local rotation to normalized DoF values.
    pub fn to_axes(&self, local: Quat) -> Vec3 {
        let angles = self.to_angles(local);
        Vec3::new(
            self.limits[0].normalize(angles.x),
            self.limits[1].normalize(angles.y),
            self.limits[2].normalize(angles.z),
        )
    }

    /// Normalized DoF values to a local rotation.
    pub fn from_axes(&self, values: Vec3) -> Quat {
        let angles = Vec3::new(
            self.limits[0].denormalize(values.x),
            self.limits[1].denormalize(values.y),
            self.limits[2].denormalize(values.z),
        );
        self.from_angles(angles)
    }
}

/// Splits `q` into a twist about X and the remaining swing.
///
/// Returns the twist quaternion and its angle in `[-π, π]`. A half-turn swing leaves the twist
/// undefined; identity is returned then.
pub fn twist_about_x(q: Quat) -> (Quat, f32) {
    let len = (q.w * q.w + q.x * q.x).sqrt();
    if len < 1e-6 {
        return (Quat::IDENTITY, 0.);
    }
    let (mut w, mut x) = (q.w / len, q.x / len);
    if w < 0. {
        w = -w;
        x = -x;
    }
    (Quat::from_xyzw(x, 0., 0., w), 2. * x.atan2(w))
}

fn swing_angles(swing: Quat) -> (f32, f32) {
    let swing = if swing.w < 0. { -swing } else { swing };
    let scaled = swing.to_scaled_axis();
    (scaled.y, scaled.z)
}

/// Canonical rotation to angles.
pub fn decompose(kind: AxesKind, q: Quat) -> Vec3 {
    match kind {
        AxesKind::Twist => Vec3::new(twist_about_x(q).1, 0., 0.),
        AxesKind::ZYRoll => {
            let (twist, angle) = twist_about_x(q);
            let (y, z) = swing_angles(q * twist.inverse());
            Vec3::new(angle, y, z)
        }
        AxesKind::RollZY => {
            let (twist, angle) = twist_about_x(q);
            let (y, z) = swing_angles(twist.inverse() * q);
            Vec3::new(angle, y, z)
        }
        AxesKind::EulerXYZ => {
            let (x, y, z) = q.to_euler(EulerRot::XYZ);
            Vec3::new(x, y, z)
        }
    }
}

/// Angles to canonical rotation.
pub fn compose(kind: AxesKind, angles: Vec3) -> Quat {
    match kind {
        AxesKind::Twist => Quat::from_rotation_x(angles.x),
        AxesKind::ZYRoll => {
            Quat::from_scaled_axis(Vec3::new(0., angles.y, angles.z))
                * Quat::from_rotation_x(angles.x)
        }
        AxesKind::RollZY => {
            Quat::from_rotation_x(angles.x)
                * Quat::from_scaled_axis(Vec3::new(0., angles.y, angles.z))
        }
        AxesKind::EulerXYZ => Quat::from_euler(EulerRot::XYZ, angles.x, angles.y, angles.z),
    }
}

/// Canonical frame of a bone given in some parent space: X along `direction`, Z the component of
/// `bend` orthogonal to it.
pub fn canonical_frame(direction: Vec3, bend: Vec3) -> Quat {
    let x = direction.try_normalize().unwrap_or(Vec3::X);
    let z = bend
        .reject_from_normalized(x)
        .try_normalize()
        .unwrap_or_else(|| x.any_orthonormal_vector());
    let y = z.cross(x);
    let z = x.cross(y);
    Quat::from_mat3(&Mat3::from_cols(x, y, z))
}

/// Wraps an angle to `(-π, π]`.
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(2. * PI) - PI;
    if wrapped <= -PI { wrapped + 2. * PI } else { wrapped }
}
