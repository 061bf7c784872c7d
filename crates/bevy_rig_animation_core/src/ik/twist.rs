use bevy::{
    math::{Quat, Vec3},
    transform::components::Transform,
};

use crate::{
    humanoid::{HumanBone, HumanoidMap},
    pose::SkeletonPose,
};

/// Signed rotation angle of `q` about `axis`, which must be normalized.
pub fn twist_angle(q: Quat, axis: Vec3) -> f32 {
    let q = if q.w < 0. { -q } else { q };
    let projection = Vec3::new(q.x, q.y, q.z).dot(axis);
    2. * projection.atan2(q.w)
}

fn pairs(map: &HumanoidMap) -> [(HumanBone, HumanBone, f32); 8] {
    use HumanBone as B;
    let settings = map.settings();
    // Distal pairs first so that twist cascades up the limb.
    [
        (B::LeftLowerArm, B::LeftHand, settings.lower_arm_twist),
        (B::RightLowerArm, B::RightHand, settings.lower_arm_twist),
        (B::LeftUpperArm, B::LeftLowerArm, settings.upper_arm_twist),
        (B::RightUpperArm, B::RightLowerArm, settings.upper_arm_twist),
        (B::LeftLowerLeg, B::LeftFoot, settings.lower_leg_twist),
        (B::RightLowerLeg, B::RightFoot, settings.lower_leg_twist),
        (B::LeftUpperLeg, B::LeftLowerLeg, settings.upper_leg_twist),
        (B::RightUpperLeg, B::RightLowerLeg, settings.upper_leg_twist),
    ]
}

/// Moves a share of each limb joint's twist onto its parent bone, leaving the child's
/// character-space rotation unchanged. `globals` must be up to date on entry and is kept up
/// to date.
pub fn distribute_twist(map: &HumanoidMap, pose: &mut SkeletonPose, globals: &mut Vec<Transform>) {
    let skeleton = map.skeleton();
    let rest = map.rest_globals();
    for (parent_bone, child_bone, ratio) in pairs(map) {
        if ratio <= 0. {
            continue;
        }
        let (Some(parent), Some(child)) = (map.joint(parent_bone), map.joint(child_bone)) else {
            continue;
        };
        let axis = (globals[child].translation - globals[parent].translation).normalize_or_zero();
        if axis == Vec3::ZERO {
            continue;
        }

        let rest_relative = rest[parent].rotation.inverse() * rest[child].rotation;
        let expected = globals[parent].rotation * rest_relative;
        let angle = twist_angle(globals[child].rotation * expected.inverse(), axis);
        if angle.abs() < 1e-6 {
            continue;
        }

        let parent_rotation = Quat::from_axis_angle(axis, angle * ratio) * globals[parent].rotation;
        let child_rotation = globals[child].rotation;
        skeleton.set_global_rotation(pose, globals, parent, parent_rotation);
        skeleton.compute_globals(pose, globals);
        skeleton.set_global_rotation(pose, globals, child, child_rotation);
        skeleton.compute_globals(pose, globals);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::humanoid::{
        HumanoidSettings,
        reference::{reference_mapping, reference_skeleton},
    };

    #[test]
    fn test_twist_angle() {
        let q = Quat::from_rotation_x(0.7) * Quat::from_rotation_y(0.0);
        assert!((twist_angle(q, Vec3::X) - 0.7).abs() < 1e-5);
        assert!((twist_angle(-q, Vec3::X) - 0.7).abs() < 1e-5);
        assert!(twist_angle(Quat::from_rotation_z(0.4), Vec3::X).abs() < 1e-5);
    }

    #[test]
    fn test_hand_twist_is_shared_up_the_arm() {
        let map = HumanoidMap::new(
            reference_skeleton().unwrap(),
            &reference_mapping(),
            HumanoidSettings::default(),
        )
        .unwrap();
        let skeleton = map.skeleton();
        let hand = map.joint(HumanBone::LeftHand).unwrap();
        let lower_arm = map.joint(HumanBone::LeftLowerArm).unwrap();
        let upper_arm = map.joint(HumanBone::LeftUpperArm).unwrap();

        let mut pose = skeleton.rest_pose();
        pose.locals[hand].rotation = Quat::from_rotation_x(1.);
        let mut globals = vec![];
        skeleton.compute_globals(&pose, &mut globals);
        let hand_before = globals[hand];

        distribute_twist(&map, &mut pose, &mut globals);

        assert!(globals[hand].rotation.angle_between(hand_before.rotation) < 1e-4);
        assert!(globals[hand].translation.abs_diff_eq(hand_before.translation, 1e-5));
        assert!(
            globals[lower_arm]
                .rotation
                .angle_between(Quat::from_rotation_x(0.5))
                < 1e-4
        );
        assert!(
            globals[upper_arm]
                .rotation
                .angle_between(Quat::from_rotation_x(0.25))
                < 1e-4
        );
    }
}
