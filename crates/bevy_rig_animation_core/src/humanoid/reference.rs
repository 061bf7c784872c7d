//! A canonical humanoid skeleton: about 1.7 units tall, standing on the origin in a T pose,
//! facing +Z with its left side along +X. Rest rotations are identity.
//!
//! Useful for tests, for authoring clips in normalized space and as a target for previews.

use bevy::{math::Vec3, transform::components::Transform};

use super::{
    bones::{FingerBone, HumanBone, Side},
    map::BoneMapping,
    skeleton::Skeleton,
};
use crate::errors::ValidationError;

type JointSpec = (&'static str, Option<&'static str>, [f32; 3]);

#[rustfmt::skip]
const CENTER_JOINTS: &[JointSpec] = &[
    ("root", None, [0., 0., 0.]),
    ("hips", Some("root"), [0., 1., 0.]),
    ("spine", Some("hips"), [0., 1.1, 0.]),
    ("chest", Some("spine"), [0., 1.25, 0.]),
    ("upper_chest", Some("chest"), [0., 1.4, 0.]),
    ("neck", Some("upper_chest"), [0., 1.55, 0.]),
    ("head", Some("neck"), [0., 1.65, 0.]),
    ("jaw", Some("head"), [0., 1.62, 0.03]),
];

/// Left side joints; the right side mirrors them about the YZ plane.
#[rustfmt::skip]
const SIDE_JOINTS: &[JointSpec] = &[
    ("eye", Some("head"), [0.03, 1.72, 0.08]),
    ("shoulder", Some("upper_chest"), [0.05, 1.48, 0.]),
    ("upper_arm", Some("shoulder"), [0.18, 1.48, 0.]),
    ("lower_arm", Some("upper_arm"), [0.46, 1.48, 0.]),
    ("hand", Some("lower_arm"), [0.72, 1.48, 0.]),
    ("thumb_01", Some("hand"), [0.75, 1.47, 0.03]),
    ("thumb_02", Some("thumb_01"), [0.78, 1.47, 0.05]),
    ("thumb_03", Some("thumb_02"), [0.8, 1.47, 0.06]),
    ("index_01", Some("hand"), [0.8, 1.48, 0.02]),
    ("index_02", Some("index_01"), [0.84, 1.48, 0.02]),
    ("index_03", Some("index_02"), [0.87, 1.48, 0.02]),
    ("middle_01", Some("hand"), [0.81, 1.48, 0.]),
    ("middle_02", Some("middle_01"), [0.855, 1.48, 0.]),
    ("middle_03", Some("middle_02"), [0.89, 1.48, 0.]),
    ("ring_01", Some("hand"), [0.8, 1.48, -0.02]),
    ("ring_02", Some("ring_01"), [0.84, 1.48, -0.02]),
    ("ring_03", Some("ring_02"), [0.87, 1.48, -0.02]),
    ("little_01", Some("hand"), [0.79, 1.48, -0.04]),
    ("little_02", Some("little_01"), [0.82, 1.48, -0.04]),
    ("little_03", Some("little_02"), [0.845, 1.48, -0.04]),
    ("upper_leg", Some("hips"), [0.09, 0.95, 0.]),
    ("lower_leg", Some("upper_leg"), [0.09, 0.5, 0.]),
    ("foot", Some("lower_leg"), [0.09, 0.08, 0.]),
    ("toes", Some("foot"), [0.09, 0.02, 0.12]),
];

#[rustfmt::skip]
const SIDE_BONES: &[(&str, HumanBone, HumanBone)] = &[
    ("upper_leg", HumanBone::LeftUpperLeg, HumanBone::RightUpperLeg),
    ("lower_leg", HumanBone::LeftLowerLeg, HumanBone::RightLowerLeg),
    ("foot", HumanBone::LeftFoot, HumanBone::RightFoot),
    ("toes", HumanBone::LeftToes, HumanBone::RightToes),
    ("shoulder", HumanBone::LeftShoulder, HumanBone::RightShoulder),
    ("upper_arm", HumanBone::LeftUpperArm, HumanBone::RightUpperArm),
    ("lower_arm", HumanBone::LeftLowerArm, HumanBone::RightLowerArm),
    ("hand", HumanBone::LeftHand, HumanBone::RightHand),
    ("eye", HumanBone::LeftEye, HumanBone::RightEye),
];

const CENTER_BONES: &[(&str, HumanBone)] = &[
    ("hips", HumanBone::Hips),
    ("spine", HumanBone::Spine),
    ("chest", HumanBone::Chest),
    ("upper_chest", HumanBone::UpperChest),
    ("neck", HumanBone::Neck),
    ("head", HumanBone::Head),
    ("jaw", HumanBone::Jaw),
];

const FINGER_NAMES: [&str; 5] = ["thumb", "index", "middle", "ring", "little"];

fn sided(name: &str, side: Side) -> String {
    match side {
        Side::Right => format!("{name}.R"),
        _ => format!("{name}.L"),
    }
}

fn is_sided(name: &str) -> bool {
    SIDE_JOINTS.iter().any(|(joint, _, _)| *joint == name)
}

pub fn reference_skeleton() -> Result<Skeleton, ValidationError> {
    let mut skeleton = Skeleton::new();
    let mut positions: Vec<Vec3> = vec![];
    let mut push = |skeleton: &mut Skeleton,
                    name: String,
                    parent: Option<String>,
                    position: Vec3|
     -> Result<(), ValidationError> {
        let parent_position = parent
            .as_deref()
            .and_then(|parent| skeleton.index_of(parent))
            .map(|parent| positions[parent])
            .unwrap_or(Vec3::ZERO);
        skeleton.add_joint(
            name,
            parent.as_deref(),
            Transform::from_translation(position - parent_position),
        )?;
        positions.push(position);
        Ok(())
    };

    for (name, parent, position) in CENTER_JOINTS {
        push(
            &mut skeleton,
            name.to_string(),
            parent.map(str::to_string),
            Vec3::from_array(*position),
        )?;
    }
    for side in [Side::Left, Side::Right] {
        let mirror = if side == Side::Right { -1. } else { 1. };
        for (name, parent, position) in SIDE_JOINTS {
            let parent = parent.map(|parent| {
                if is_sided(parent) {
                    sided(parent, side)
                } else {
                    parent.to_string()
                }
            });
            let [x, y, z] = *position;
            push(
                &mut skeleton,
                sided(name, side),
                parent,
                Vec3::new(x * mirror, y, z),
            )?;
        }
    }
    Ok(skeleton)
}

/// Mapping of every humanoid and finger bone onto [`reference_skeleton`].
pub fn reference_mapping() -> BoneMapping {
    let mut mapping = BoneMapping::new();
    for (name, bone) in CENTER_BONES {
        mapping.bones.insert(*bone, name.to_string());
    }
    for (name, left, right) in SIDE_BONES {
        mapping.bones.insert(*left, sided(name, Side::Left));
        mapping.bones.insert(*right, sided(name, Side::Right));
    }
    for side in [Side::Left, Side::Right] {
        for finger in FingerBone::ALL {
            let name = format!(
                "{}_{:02}",
                FINGER_NAMES[finger.finger()],
                finger.phalanx() + 1
            );
            mapping.hand_mut(side).insert(finger, sided(&name, side));
        }
    }
    mapping
}
