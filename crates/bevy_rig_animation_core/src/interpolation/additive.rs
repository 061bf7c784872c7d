use crate::{
    humanoid::{BODY_DOF_COUNT, Goal},
    mask::PoseMask,
    pose::{Pose, algebra::additive_transform},
};

/// Adds the masked fields of a difference pose on top of a base pose.
pub struct AdditiveInterpolator {
    pub mask: PoseMask,
}

impl AdditiveInterpolator {
    pub fn interpolate_pose(&self, base: &mut Pose, overlay: &Pose, f: f32) {
        if f == 0. || self.mask.is_empty() {
            return;
        }
        if self.mask.root {
            base.root = additive_transform(&base.root, &overlay.root, f);
        }
        for index in 0..BODY_DOF_COUNT {
            if self.mask.has_dof(index) {
                base.dofs[index] += overlay.dofs[index] * f;
            }
        }
        for goal in Goal::ALL {
            if self.mask.has_goal(goal) {
                let i = goal.index();
                base.goals[i] = additive_transform(&base.goals[i], &overlay.goals[i], f);
            }
        }
        if self.mask.left_hand {
            for (a, b) in base.left_hand.dofs.iter_mut().zip(&overlay.left_hand.dofs) {
                *a += b * f;
            }
        }
        if self.mask.right_hand {
            for (a, b) in base.right_hand.dofs.iter_mut().zip(&overlay.right_hand.dofs) {
                *a += b * f;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use bevy::math::Quat;

    use super::*;
    use crate::{humanoid::dof, mask::BodyParts};

    #[test]
    fn test_additive_scales_delta() {
        let mut base = Pose::default();
        base.dofs[dof::LEFT_ARM_DOWN_UP] = 0.2;
        let mut delta = Pose::default();
        delta.dofs[dof::LEFT_ARM_DOWN_UP] = 0.4;
        delta.dofs[dof::SPINE_TWIST] = 0.4;
        delta.goals[Goal::LeftHand.index()].rotation = Quat::from_rotation_x(1.);

        AdditiveInterpolator {
            mask: PoseMask::from_body_parts(BodyParts::ARMS),
        }
        .interpolate_pose(&mut base, &delta, 0.5);

        assert!((base.dofs[dof::LEFT_ARM_DOWN_UP] - 0.4).abs() < 1e-6);
        assert_eq!(base.dofs[dof::SPINE_TWIST], 0.);
        assert!(
            base.goals[Goal::LeftHand.index()]
                .rotation
                .abs_diff_eq(Quat::from_rotation_x(0.5), 1e-5)
        );
    }
}
