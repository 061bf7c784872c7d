use bevy::{
    math::{Quat, Vec3},
    transform::components::Transform,
};

use crate::{
    humanoid::{BODY_DOF_COUNT, Goal},
    mask::PoseMask,
    pose::Pose,
};

pub trait InterpolateLinear {
    fn interpolate_linear(&self, other: &Self, f: f32) -> Self;
}

impl InterpolateLinear for f32 {
    fn interpolate_linear(&self, other: &Self, f: f32) -> Self {
        self + (other - self) * f
    }
}

impl InterpolateLinear for Vec3 {
    fn interpolate_linear(&self, other: &Self, f: f32) -> Self {
        self.lerp(*other, f)
    }
}

impl InterpolateLinear for Quat {
    fn interpolate_linear(&self, other: &Self, f: f32) -> Self {
        self.slerp(*other, f)
    }
}

impl InterpolateLinear for Transform {
    fn interpolate_linear(&self, other: &Self, f: f32) -> Self {
        Transform {
            translation: self.translation.interpolate_linear(&other.translation, f),
            rotation: self.rotation.interpolate_linear(&other.rotation, f),
            scale: self.scale.interpolate_linear(&other.scale, f),
        }
    }
}

fn lerp_slice(base: &mut [f32], overlay: &[f32], f: f32) {
    for (a, b) in base.iter_mut().zip(overlay) {
        *a = a.interpolate_linear(b, f);
    }
}

/// Override blend of the masked fields of a pose.
pub struct LinearInterpolator {
    pub mask: PoseMask,
}

impl LinearInterpolator {
    /// Blends `base` towards `overlay` by `f`. At `f >= 1` the masked fields are copied exactly.
    pub fn interpolate_pose(&self, base: &mut Pose, overlay: &Pose, f: f32) {
        if f <= 0. || self.mask.is_empty() {
            return;
        }
        if f >= 1. {
            base.copy_masked(overlay, &self.mask);
            return;
        }

        if self.mask.root {
            base.root = base.root.interpolate_linear(&overlay.root, f);
        }
        for index in 0..BODY_DOF_COUNT {
            if self.mask.has_dof(index) {
                base.dofs[index] = base.dofs[index].interpolate_linear(&overlay.dofs[index], f);
            }
        }
        for goal in Goal::ALL {
            if self.mask.has_goal(goal) {
                let i = goal.index();
                base.goals[i] = base.goals[i].interpolate_linear(&overlay.goals[i], f);
            }
        }
        if self.mask.left_hand {
            lerp_slice(&mut base.left_hand.dofs, &overlay.left_hand.dofs, f);
        }
        if self.mask.right_hand {
            lerp_slice(&mut base.right_hand.dofs, &overlay.right_hand.dofs, f);
        }
    }

    /// Blends two poses that may carry different fields: fields present on both sides are
    /// interpolated, fields present on one side only are taken from that side.
    pub fn interpolate_written(
        base: &mut Pose,
        base_written: &mut PoseMask,
        overlay: &Pose,
        overlay_written: &PoseMask,
        f: f32,
    ) {
        let only_overlay = overlay_written.difference(base_written);
        base.copy_masked(overlay, &only_overlay);

        let shared = base_written.intersection(overlay_written);
        Self { mask: shared }.interpolate_pose(base, overlay, f);

        *base_written = base_written.union(overlay_written);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{humanoid::dof, mask::BodyParts};

    fn filled(value: f32) -> Pose {
        let mut pose = Pose::default();
        pose.dofs.fill(value);
        pose.root.translation = Vec3::splat(value);
        pose
    }

    #[test]
    fn test_masked_blend() {
        let mut base = filled(0.);
        let interpolator = LinearInterpolator {
            mask: PoseMask::from_body_parts(BodyParts::HEAD),
        };
        interpolator.interpolate_pose(&mut base, &filled(1.), 0.25);
        assert_eq!(base.dofs[dof::HEAD_TURN], 0.25);
        assert_eq!(base.dofs[dof::LEFT_ARM_TWIST], 0.);
        assert_eq!(base.root.translation, Vec3::ZERO);
    }

    #[test]
    fn test_full_weight_is_exact() {
        let mut base = filled(0.3);
        let overlay = filled(0.7);
        LinearInterpolator {
            mask: PoseMask::ALL,
        }
        .interpolate_pose(&mut base, &overlay, 1.);
        assert_eq!(base, overlay);
    }

    #[test]
    fn test_written_fields_fall_through() {
        let mut base = filled(0.);
        let mut base_written = PoseMask::from_body_parts(BodyParts::BODY);
        let overlay = filled(1.);
        let overlay_written = PoseMask::from_body_parts(BodyParts::BODY | BodyParts::HEAD);

        LinearInterpolator::interpolate_written(
            &mut base,
            &mut base_written,
            &overlay,
            &overlay_written,
            0.5,
        );
        assert_eq!(base.dofs[dof::SPINE_TWIST], 0.5);
        assert_eq!(base.dofs[dof::HEAD_NOD], 1.);
        assert_eq!(base.dofs[dof::LEFT_FOOT_UP_DOWN], 0.);
        assert_eq!(base_written, overlay_written);
    }
}
