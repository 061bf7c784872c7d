use bevy::{
    log::debug,
    math::{Quat, Vec3},
    transform::components::Transform,
};
use bevy_rig_animation_core::{
    errors::ValidationError,
    humanoid::{
        BoneMapping, HumanoidMap, HumanoidSettings, Skeleton,
        naming::PatternMapperConfig,
        reference::{reference_mapping, reference_skeleton},
    },
};
use serde::{Deserialize, Serialize};

fn identity() -> [f32; 4] {
    [0., 0., 0., 1.]
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct JointSerial {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    /// Rest translation relative to the parent.
    #[serde(default)]
    pub translation: [f32; 3],
    /// Rest rotation relative to the parent, as `[x, y, z, w]`.
    #[serde(default = "identity")]
    pub rotation: [f32; 4],
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum SkeletonSerial {
    /// The canonical reference humanoid.
    Reference,
    /// Joints listed parents first.
    Joints(Vec<JointSerial>),
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AvatarSerial {
    pub skeleton: SkeletonSerial,
    /// Defaults to the reference mapping for the reference skeleton, and to an empty mapping
    /// otherwise.
    #[serde(default)]
    pub mapping: Option<BoneMapping>,
    /// When set, bones mapped on one side only get their other side filled in by swapping the
    /// side key of the joint name.
    #[serde(default)]
    pub mirror_names: Option<PatternMapperConfig>,
    #[serde(default)]
    pub settings: HumanoidSettings,
}

impl SkeletonSerial {
    pub fn build(&self) -> Result<Skeleton, ValidationError> {
        match self {
            Self::Reference => reference_skeleton(),
            Self::Joints(joints) => {
                let mut skeleton = Skeleton::new();
                for joint in joints {
                    let [x, y, z, w] = joint.rotation;
                    let rest = Transform::from_translation(Vec3::from_array(joint.translation))
                        .with_rotation(Quat::from_xyzw(x, y, z, w).normalize());
                    skeleton.add_joint(joint.name.clone(), joint.parent.as_deref(), rest)?;
                }
                Ok(skeleton)
            }
        }
    }
}

impl AvatarSerial {
    pub fn resolve(&self) -> Result<HumanoidMap, ValidationError> {
        let skeleton = self.skeleton.build()?;
        let mut mapping = match (&self.mapping, &self.skeleton) {
            (Some(mapping), _) => mapping.clone(),
            (None, SkeletonSerial::Reference) => reference_mapping(),
            (None, SkeletonSerial::Joints(_)) => BoneMapping::new(),
        };
        if let Some(config) = &self.mirror_names {
            let added = config.build()?.complete_mapping(&mut mapping, &skeleton);
            debug!("Completed {added} bones from their mirrored names");
        }
        HumanoidMap::new(skeleton, &mapping, self.settings.clone())
    }
}
