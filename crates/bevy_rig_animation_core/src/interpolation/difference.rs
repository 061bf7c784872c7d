use crate::{
    humanoid::{BODY_DOF_COUNT, Goal},
    mask::PoseMask,
    pose::{Pose, algebra::difference_transform},
};

/// Turns a reference pose into the difference between an overlay pose and itself, so that adding
/// the result back onto the reference yields the overlay.
pub struct DifferenceInterpolator {
    pub mask: PoseMask,
}

impl DifferenceInterpolator {
    pub fn interpolate_pose(&self, base: &mut Pose, overlay: &Pose) {
        if self.mask.root {
            base.root = difference_transform(&base.root, &overlay.root);
        }
        for index in 0..BODY_DOF_COUNT {
            if self.mask.has_dof(index) {
                base.dofs[index] = overlay.dofs[index] - base.dofs[index];
            }
        }
        for goal in Goal::ALL {
            if self.mask.has_goal(goal) {
                let i = goal.index();
                base.goals[i] = difference_transform(&base.goals[i], &overlay.goals[i]);
            }
        }
        if self.mask.left_hand {
            for (a, b) in base.left_hand.dofs.iter_mut().zip(&overlay.left_hand.dofs) {
                *a = b - *a;
            }
        }
        if self.mask.right_hand {
            for (a, b) in base.right_hand.dofs.iter_mut().zip(&overlay.right_hand.dofs) {
                *a = b - *a;
            }
        }
    }
}
