mod common;

use bevy_rig_animation::{
    bevy_rig_animation_core::humanoid::{
        dof,
        naming::PatternMapperConfig,
        reference::{reference_mapping, reference_skeleton},
    },
    prelude::*,
    serial::{AvatarSerial, JointSerial, SkeletonSerial},
};
use common::*;

fn joints() -> Vec<JointSerial> {
    let skeleton = reference_skeleton().unwrap();
    skeleton
        .joints()
        .iter()
        .map(|joint| JointSerial {
            name: joint.name.clone(),
            parent: joint
                .parent
                .map(|parent| skeleton.joints()[parent].name.clone()),
            translation: joint.rest.translation.to_array(),
            rotation: joint.rest.rotation.to_array(),
        })
        .collect()
}

fn load(avatar: &AvatarSerial) -> Result<HumanoidMap, AssetLoaderError> {
    let document = ron::ser::to_string(avatar).unwrap();
    AvatarLoader.load_bytes(document.as_bytes())
}

#[test]
fn test_reference_avatar() {
    let map = reference_avatar();
    assert_close(map.scale(), 1., 1e-3);
    assert!(map.has_bone(HumanBone::LeftEye));
}

#[test]
fn test_explicit_joints_match_reference() {
    let map = load(&AvatarSerial {
        skeleton: SkeletonSerial::Joints(joints()),
        mapping: Some(reference_mapping()),
        mirror_names: None,
        settings: HumanoidSettings::default(),
    })
    .unwrap();

    let mut pose = map.default_pose().clone();
    pose.dofs[dof::HEAD_TURN] = 0.5;
    let mut ours = SkeletonPose::default();
    map.to_skeleton(&pose, &mut ours);

    let reference = reference_avatar();
    let mut expected = SkeletonPose::default();
    reference.to_skeleton(&pose, &mut expected);
    for (a, b) in ours.locals.iter().zip(&expected.locals) {
        assert!(a.rotation.angle_between(b.rotation) < 1e-5);
        assert!(a.translation.abs_diff_eq(b.translation, 1e-5));
    }
}

#[test]
fn test_mirrored_names_complete_mapping() {
    let mut mapping = reference_mapping();
    for bone in HumanBone::ALL {
        if bone.side() == Side::Right {
            mapping = mapping.without_bone(bone);
        }
    }
    mapping.right_hand.clear();

    let map = load(&AvatarSerial {
        skeleton: SkeletonSerial::Reference,
        mapping: Some(mapping),
        mirror_names: Some(PatternMapperConfig::default()),
        settings: HumanoidSettings::default(),
    })
    .unwrap();

    let reference = reference_avatar();
    for bone in HumanBone::ALL {
        assert_eq!(map.joint(bone), reference.joint(bone), "{bone:?}");
    }
}

#[test]
fn test_missing_required_bone() {
    let error = load(&AvatarSerial {
        skeleton: SkeletonSerial::Reference,
        mapping: Some(reference_mapping().without_bone(HumanBone::Head)),
        mirror_names: None,
        settings: HumanoidSettings::default(),
    })
    .unwrap_err();
    assert!(matches!(
        error,
        AssetLoaderError::Validation(ValidationError::MissingRequiredBone(HumanBone::Head))
    ));
}

#[test]
fn test_joint_order_is_checked() {
    let mut joints = joints();
    joints.swap(0, 1);
    let error = load(&AvatarSerial {
        skeleton: SkeletonSerial::Joints(joints),
        mapping: None,
        mirror_names: None,
        settings: HumanoidSettings::default(),
    })
    .unwrap_err();
    assert!(matches!(
        error,
        AssetLoaderError::Validation(ValidationError::JointOrder { .. })
    ));
}

#[test]
fn test_minimal_joint_list_parses() {
    let document = r#"(
        skeleton: Joints([
            (name: "root"),
            (name: "hips", parent: Some("root"), translation: (0.0, 1.0, 0.0)),
        ]),
    )"#;
    // The document is well formed; only the empty mapping is rejected.
    let error = AvatarLoader.load_bytes(document.as_bytes()).unwrap_err();
    assert!(matches!(
        error,
        AssetLoaderError::Validation(ValidationError::MissingRequiredBone(_))
    ));
}
