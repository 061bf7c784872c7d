use bevy::{
    log::{debug, warn},
    math::{Quat, Vec3},
    platform::collections::HashSet,
    reflect::{Reflect, std_traits::ReflectDefault},
    transform::components::Transform,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{
    axes::{Axes, AxesKind, AxisLimit, canonical_frame},
    bones::{
        BendReference, BoneDirection, FINGER_BONE_COUNT, FingerBone, Goal, HUMAN_BONE_COUNT,
        HumanBone, Side,
    },
    dof::{BODY_DOFS, FINGER_DOFS, dof_name},
    skeleton::Skeleton,
};
use crate::{
    errors::{RigError, RigResult, ValidationError},
    pose::{Pose, SkeletonPose, algebra::inverse_transform},
};

/// Mass-center height of the canonical reference humanoid, in its own units.
pub const REFERENCE_MASS_CENTER_HEIGHT: f32 = 1.069345;

/// Names of the skeleton joints playing each humanoid role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoneMapping {
    pub bones: IndexMap<HumanBone, String>,
    #[serde(default)]
    pub left_hand: IndexMap<FingerBone, String>,
    #[serde(default)]
    pub right_hand: IndexMap<FingerBone, String>,
}

impl BoneMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bone(mut self, bone: HumanBone, joint: impl Into<String>) -> Self {
        self.bones.insert(bone, joint.into());
        self
    }

    pub fn with_finger(mut self, side: Side, finger: FingerBone, joint: impl Into<String>) -> Self {
        self.hand_mut(side).insert(finger, joint.into());
        self
    }

    pub fn without_bone(mut self, bone: HumanBone) -> Self {
        self.bones.shift_remove(&bone);
        self
    }

    pub fn hand(&self, side: Side) -> &IndexMap<FingerBone, String> {
        match side {
            Side::Right => &self.right_hand,
            _ => &self.left_hand,
        }
    }

    pub fn hand_mut(&mut self, side: Side) -> &mut IndexMap<FingerBone, String> {
        match side {
            Side::Right => &mut self.right_hand,
            _ => &mut self.left_hand,
        }
    }
}

/// Replaces the default decomposition kind or limits of one bone.
#[derive(Reflect, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxesOverride {
    pub bone: HumanBone,
    #[serde(default)]
    pub kind: Option<AxesKind>,
    #[serde(default)]
    pub limits: Option<[AxisLimit; 3]>,
}

/// Per-avatar tuning.
#[derive(Reflect, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[reflect(Default)]
#[serde(default)]
pub struct HumanoidSettings {
    /// Share of the lower arm's twist moved onto the upper arm.
    pub upper_arm_twist: f32,
    /// Share of the hand's twist moved onto the lower arm.
    pub lower_arm_twist: f32,
    pub upper_leg_twist: f32,
    pub lower_leg_twist: f32,
    /// Maximum extra length of an arm chain under IK, as a fraction of its length.
    pub arm_stretch: f32,
    pub leg_stretch: f32,
    pub axes_overrides: Vec<AxesOverride>,
}

impl Default for HumanoidSettings {
    fn default() -> Self {
        Self {
            upper_arm_twist: 0.5,
            lower_arm_twist: 0.5,
            upper_leg_twist: 0.5,
            lower_leg_twist: 0.5,
            arm_stretch: 0.05,
            leg_stretch: 0.05,
            axes_overrides: vec![],
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct HandMap {
    pub(crate) joints: [Option<usize>; FINGER_BONE_COUNT],
    pub(crate) axes: [Axes; FINGER_BONE_COUNT],
}

/// Rotation of a missing optional bone folded into its nearest mapped ancestor.
#[derive(Clone, Debug)]
pub struct Redistribution {
    pub bone: HumanBone,
    pub target: HumanBone,
    /// Axes of the missing bone, expressed in the target joint's local space.
    pub axes: Axes,
    pub ratio: f32,
}

/// Mapping between the generic humanoid and one concrete skeleton.
///
/// Built once per character from a [`Skeleton`] and a [`BoneMapping`]; immutable afterwards and
/// meant to be shared between every animator driving that character.
#[derive(Clone, Debug)]
pub struct HumanoidMap {
    skeleton: Skeleton,
    joints: [Option<usize>; HUMAN_BONE_COUNT],
    axes: [Axes; HUMAN_BONE_COUNT],
    hands: [HandMap; 2],
    redistribution: Vec<Redistribution>,
    rest_locals: SkeletonPose,
    rest_globals: Vec<Transform>,
    hips_parent_inverse: Transform,
    scale: f32,
    settings: HumanoidSettings,
    default_pose: Pose,
}

impl HumanoidMap {
    pub fn new(
        skeleton: Skeleton,
        mapping: &BoneMapping,
        settings: HumanoidSettings,
    ) -> Result<Self, ValidationError> {
        let mut used: HashSet<usize> = HashSet::default();
        let mut resolve = |name: &str| -> Result<usize, ValidationError> {
            let index = skeleton
                .index_of(name)
                .ok_or_else(|| ValidationError::UnknownJoint(name.to_string()))?;
            if !used.insert(index) {
                return Err(ValidationError::JointMappedTwice(name.to_string()));
            }
            Ok(index)
        };

        let mut joints = [None; HUMAN_BONE_COUNT];
        for (bone, name) in &mapping.bones {
            joints[bone.index()] = Some(resolve(name)?);
        }
        let mut hand_joints = [[None; FINGER_BONE_COUNT]; 2];
        for (hand, side) in [Side::Left, Side::Right].into_iter().enumerate() {
            for (finger, name) in mapping.hand(side) {
                hand_joints[hand][finger.index()] = Some(resolve(name)?);
            }
        }

        for bone in HumanBone::ALL {
            if bone.is_required() && joints[bone.index()].is_none() {
                return Err(ValidationError::MissingRequiredBone(bone));
            }
        }
        for bone in HumanBone::ALL {
            let Some(joint) = joints[bone.index()] else {
                continue;
            };
            if let Some(ancestor) = nearest_mapped_ancestor(&joints, bone) {
                let ancestor_joint = joints[ancestor.index()].unwrap_or_default();
                if !skeleton.is_ancestor(ancestor_joint, joint) {
                    return Err(ValidationError::BrokenBoneChain { bone, ancestor });
                }
            }
        }

        let rest_locals = skeleton.rest_pose();
        let rest_globals = skeleton.rest_globals();
        let hips_parent_inverse = joints[HumanBone::Hips.index()]
            .and_then(|hips| skeleton.parent(hips))
            .map(|parent| inverse_transform(&rest_globals[parent]))
            .unwrap_or(Transform::IDENTITY);

        let mut map = Self {
            skeleton,
            joints,
            axes: [Axes::default(); HUMAN_BONE_COUNT],
            hands: Default::default(),
            redistribution: vec![],
            rest_locals,
            rest_globals,
            hips_parent_inverse,
            scale: 1.,
            settings,
            default_pose: Pose::default(),
        };

        for bone in HumanBone::ALL {
            if let Some(joint) = map.joints[bone.index()] {
                map.axes[bone.index()] = map.bone_axes(bone, joint);
            }
        }
        for (hand, side) in [Side::Left, Side::Right].into_iter().enumerate() {
            map.hands[hand].joints = hand_joints[hand];
            for finger in FingerBone::ALL {
                if let Some(joint) = hand_joints[hand][finger.index()] {
                    map.hands[hand].axes[finger.index()] = map.finger_axes(side, finger, joint);
                }
            }
        }
        map.redistribution = map.build_redistribution();
        map.scale = map.compute_scale();

        let mut default_pose = Pose::default();
        map.from_skeleton(&map.rest_locals, &mut default_pose);
        map.default_pose = default_pose;

        debug!(
            "Built humanoid map: {} joints, scale {:.3}, {} redistributed bones",
            map.skeleton.len(),
            map.scale,
            map.redistribution.len()
        );
        Ok(map)
    }

    fn rest_position(&self, joint: usize) -> Vec3 {
        self.rest_globals[joint].translation
    }

    fn first_mapped(&self, candidates: &[HumanBone]) -> Option<usize> {
        candidates
            .iter()
            .find_map(|candidate| self.joints[candidate.index()])
    }

    /// Character-space direction of a bone's canonical X axis at rest, and the bone length.
    fn bone_direction(&self, joint: usize, chain: Option<usize>, fallback: BoneDirection) -> (Vec3, f32) {
        let origin = self.rest_position(joint);
        if let Some(child) = chain {
            let offset = self.rest_position(child) - origin;
            if let Some(direction) = offset.try_normalize() {
                return (direction, offset.length());
            }
        }
        let direction = match fallback {
            BoneDirection::Forward => Vec3::Z,
            BoneDirection::FromParent => self
                .skeleton
                .parent(joint)
                .and_then(|parent| (origin - self.rest_position(parent)).try_normalize())
                .unwrap_or(Vec3::Y),
        };
        (direction, 0.)
    }

    fn make_axes(
        &self,
        joint: usize,
        direction: Vec3,
        bend: BendReference,
        sign: Vec3,
        kind: AxesKind,
        limits: [AxisLimit; 3],
        length: f32,
    ) -> Axes {
        let global_rotation = self.rest_globals[joint].rotation;
        let frame = global_rotation.inverse() * canonical_frame(direction, bend.axis());
        Axes {
            sign,
            limits,
            length,
            kind,
            ..Axes::from_frame(self.rest_locals.locals[joint].rotation, frame)
        }
    }

    fn bone_axes(&self, bone: HumanBone, joint: usize) -> Axes {
        let definition = bone.definition();
        let (direction, length) = self.bone_direction(
            joint,
            self.first_mapped(definition.chain),
            definition.direction,
        );
        let mut kind = definition.kind;
        let mut limits = definition.dofs.map(|dof| match dof {
            Some(dof) => AxisLimit::from_degrees(BODY_DOFS[dof].min, BODY_DOFS[dof].max),
            None => AxisLimit::Locked,
        });
        for axes_override in &self.settings.axes_overrides {
            if axes_override.bone == bone {
                kind = axes_override.kind.unwrap_or(kind);
                limits = axes_override.limits.unwrap_or(limits);
            }
        }
        self.make_axes(
            joint,
            direction,
            definition.bend,
            bone.axis_sign(),
            kind,
            limits,
            length,
        )
    }

    fn finger_axes(&self, side: Side, finger: FingerBone, joint: usize) -> Axes {
        let hand = side_index(side);
        let chain = finger
            .child()
            .and_then(|child| self.hands[hand].joints[child.index()]);
        let (direction, length) = self.bone_direction(joint, chain, BoneDirection::FromParent);
        let limits = finger.dofs().map(|dof| match dof {
            Some(dof) => AxisLimit::from_degrees(FINGER_DOFS[dof].min, FINGER_DOFS[dof].max),
            None => AxisLimit::Locked,
        });
        let sign = match side {
            Side::Right => Vec3::new(-1., 1., -1.),
            _ => Vec3::ONE,
        };
        self.make_axes(
            joint,
            direction,
            BendReference::Forward,
            sign,
            AxesKind::ZYRoll,
            limits,
            length,
        )
    }

    fn build_redistribution(&self) -> Vec<Redistribution> {
        let mut redistribution = vec![];
        for bone in HumanBone::ALL {
            let definition = bone.definition();
            if self.joints[bone.index()].is_some() || definition.redistribution <= 0. {
                continue;
            }
            let Some(target) = nearest_mapped_ancestor(&self.joints, bone) else {
                continue;
            };
            let Some(target_joint) = self.joints[target.index()] else {
                continue;
            };
            let direction = match self.first_mapped(definition.chain) {
                Some(child) => (self.rest_position(child) - self.rest_position(target_joint))
                    .try_normalize()
                    .unwrap_or(Vec3::Y),
                None => Vec3::Y,
            };
            let limits = definition.dofs.map(|dof| match dof {
                Some(dof) => AxisLimit::from_degrees(BODY_DOFS[dof].min, BODY_DOFS[dof].max),
                None => AxisLimit::Locked,
            });
            let global_rotation = self.rest_globals[target_joint].rotation;
            let frame = global_rotation.inverse() * canonical_frame(direction, definition.bend.axis());
            redistribution.push(Redistribution {
                bone,
                target,
                axes: Axes {
                    sign: bone.axis_sign(),
                    limits,
                    kind: definition.kind,
                    ..Axes::from_frame(Quat::IDENTITY, frame)
                },
                ratio: definition.redistribution,
            });
        }
        redistribution
    }

    /// Uniform scale from the rest mass-center height.
    fn compute_scale(&self) -> f32 {
        let mut total_mass = 0.;
        let mut weighted_height = 0.;
        for bone in HumanBone::ALL {
            let definition = bone.definition();
            let Some(joint) = self.joints[bone.index()] else {
                continue;
            };
            if definition.mass <= 0. {
                continue;
            }
            let origin = self.rest_position(joint);
            let center = match self.first_mapped(definition.chain) {
                Some(child) => (origin + self.rest_position(child)) * 0.5,
                None => origin,
            };
            total_mass += definition.mass;
            weighted_height += definition.mass * center.y;
        }
        let height = if total_mass > 0. {
            weighted_height / total_mass
        } else {
            0.
        };
        if height <= 1e-4 {
            warn!("Humanoid mass center is at or below the ground, using unit scale");
            return 1.;
        }
        height / REFERENCE_MASS_CENTER_HEIGHT
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn settings(&self) -> &HumanoidSettings {
        &self.settings
    }

    /// Generic pose of the skeleton at rest.
    pub fn default_pose(&self) -> &Pose {
        &self.default_pose
    }

    pub fn rest_locals(&self) -> &SkeletonPose {
        &self.rest_locals
    }

    pub fn rest_globals(&self) -> &[Transform] {
        &self.rest_globals
    }

    pub fn joint(&self, bone: HumanBone) -> Option<usize> {
        self.joints[bone.index()]
    }

    pub fn has_bone(&self, bone: HumanBone) -> bool {
        self.joint(bone).is_some()
    }

    pub fn finger_joint(&self, side: Side, finger: FingerBone) -> Option<usize> {
        self.hands[side_index(side)].joints[finger.index()]
    }

    pub fn axes(&self, bone: HumanBone) -> Option<&Axes> {
        self.joint(bone).map(|_| &self.axes[bone.index()])
    }

    pub fn finger_axes_of(&self, side: Side, finger: FingerBone) -> Option<&Axes> {
        let hand = &self.hands[side_index(side)];
        hand.joints[finger.index()].map(|_| &hand.axes[finger.index()])
    }

    pub fn redistribution(&self) -> &[Redistribution] {
        &self.redistribution
    }

    pub(crate) fn hand_map(&self, side: Side) -> &HandMap {
        &self.hands[side_index(side)]
    }

    pub(crate) fn hips_parent_inverse(&self) -> &Transform {
        &self.hips_parent_inverse
    }

    pub fn bone_by_index(&self, index: usize) -> RigResult<HumanBone> {
        HumanBone::from_index(index).ok_or(RigError::InvalidBone(index))
    }

    pub fn dof_name(&self, index: usize) -> RigResult<&'static str> {
        dof_name(index).ok_or(RigError::InvalidDof(index))
    }

    /// Joint driving a body DoF, if that bone is mapped.
    pub fn dof_joint(&self, index: usize) -> RigResult<Option<usize>> {
        let definition = BODY_DOFS.get(index).ok_or(RigError::InvalidDof(index))?;
        Ok(self.joint(definition.bone))
    }

    /// Converts a goal from normalized pose space to the skeleton's character space.
    pub fn goal_to_character(&self, goal: Goal, transform: &Transform) -> Option<Transform> {
        let joint = self.joint(goal.bone())?;
        Some(Transform {
            translation: transform.translation * self.scale,
            rotation: transform.rotation * self.rest_globals[joint].rotation,
            scale: Vec3::ONE,
        })
    }

    /// Inverse of [`Self::goal_to_character`].
    pub fn goal_from_character(&self, goal: Goal, transform: &Transform) -> Option<Transform> {
        let joint = self.joint(goal.bone())?;
        Some(Transform {
            translation: transform.translation / self.scale,
            rotation: transform.rotation * self.rest_globals[joint].rotation.inverse(),
            scale: Vec3::ONE,
        })
    }
}

pub(crate) fn side_index(side: Side) -> usize {
    match side {
        Side::Right => 1,
        _ => 0,
    }
}

fn nearest_mapped_ancestor(
    joints: &[Option<usize>; HUMAN_BONE_COUNT],
    bone: HumanBone,
) -> Option<HumanBone> {
    let mut current = bone.parent();
    while let Some(candidate) = current {
        if joints[candidate.index()].is_some() {
            return Some(candidate);
        }
        current = candidate.parent();
    }
    None
}
