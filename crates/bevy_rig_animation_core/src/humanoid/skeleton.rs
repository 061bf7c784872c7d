use std::fmt::Debug;

use bevy::{
    math::Quat, platform::collections::HashMap, reflect::Reflect,
    transform::components::Transform,
};

use crate::{errors::ValidationError, pose::SkeletonPose};

#[derive(Reflect, Clone, Debug, PartialEq)]
pub struct Joint {
    pub name: String,
    pub parent: Option<usize>,
    /// Rest transform relative to the parent joint.
    pub rest: Transform,
}

/// Joint hierarchy of a concrete character. Parents always come before their children.
#[derive(Clone, Default)]
pub struct Skeleton {
    joints: Vec<Joint>,
    by_name: HashMap<String, usize>,
    children: Vec<Vec<usize>>,
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_joint(
        &mut self,
        name: impl Into<String>,
        parent: Option<&str>,
        rest: Transform,
    ) -> Result<usize, ValidationError> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(ValidationError::DuplicateName(name));
        }
        let parent = match parent {
            Some(parent_name) => Some(self.index_of(parent_name).ok_or_else(|| {
                ValidationError::JointOrder {
                    joint: name.clone(),
                    parent: parent_name.to_string(),
                }
            })?),
            None => None,
        };

        let index = self.joints.len();
        self.by_name.insert(name.clone(), index);
        self.children.push(vec![]);
        if let Some(parent) = parent {
            self.children[parent].push(index);
        }
        self.joints.push(Joint { name, parent, rest });
        Ok(index)
    }

    pub fn from_joints(joints: Vec<Joint>) -> Result<Self, ValidationError> {
        let mut skeleton = Self::new();
        for joint in joints {
            let parent_name = match joint.parent {
                Some(parent) if parent < skeleton.len() => {
                    Some(skeleton.joints[parent].name.clone())
                }
                Some(_) => {
                    return Err(ValidationError::JointOrder {
                        joint: joint.name,
                        parent: "<out of order>".into(),
                    });
                }
                None => None,
            };
            skeleton.add_joint(joint.name, parent_name.as_deref(), joint.rest)?;
        }
        Ok(skeleton)
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn joint(&self, index: usize) -> Option<&Joint> {
        self.joints.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn parent(&self, index: usize) -> Option<usize> {
        self.joints.get(index).and_then(|joint| joint.parent)
    }

    pub fn children(&self, index: usize) -> &[usize] {
        self.children.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `ancestor` is a strict ancestor of `joint`.
    pub fn is_ancestor(&self, ancestor: usize, joint: usize) -> bool {
        let mut current = self.parent(joint);
        while let Some(index) = current {
            if index == ancestor {
                return true;
            }
            current = self.parent(index);
        }
        false
    }

    pub fn rest_pose(&self) -> SkeletonPose {
        SkeletonPose {
            locals: self.joints.iter().map(|joint| joint.rest).collect(),
        }
    }

    /// Character-space transforms of every joint of `pose`.
    pub fn compute_globals(&self, pose: &SkeletonPose, globals: &mut Vec<Transform>) {
        globals.clear();
        for (index, joint) in self.joints.iter().enumerate() {
            let local = pose.locals.get(index).copied().unwrap_or(joint.rest);
            let global = match joint.parent {
                Some(parent) => globals[parent] * local,
                None => local,
            };
            globals.push(global);
        }
    }

    pub fn rest_globals(&self) -> Vec<Transform> {
        let mut globals = Vec::with_capacity(self.len());
        self.compute_globals(&self.rest_pose(), &mut globals);
        globals
    }

    /// Sets the character-space rotation of a joint by rewriting its local rotation. `globals`
    /// must be up to date for the joint's ancestors.
    pub fn set_global_rotation(
        &self,
        pose: &mut SkeletonPose,
        globals: &[Transform],
        joint: usize,
        rotation: Quat,
    ) {
        let parent_rotation = self
            .parent(joint)
            .map(|parent| globals[parent].rotation)
            .unwrap_or(Quat::IDENTITY);
        pose.locals[joint].rotation = (parent_rotation.inverse() * rotation).normalize();
    }

    /// Copy of the skeleton with every rest translation multiplied by `factor`.
    pub fn scaled(&self, factor: f32) -> Self {
        let mut scaled = self.clone();
        for joint in &mut scaled.joints {
            joint.rest.translation *= factor;
        }
        scaled
    }

    fn indent(f: &mut std::fmt::Formatter<'_>, level: u32) -> std::fmt::Result {
        if level == 0 {
            return Ok(());
        }
        for _ in 0..(level - 1) {
            write!(f, "┃ ")?;
        }
        write!(f, "┣━")?;
        Ok(())
    }

    fn fmt_level(
        &self,
        f: &mut std::fmt::Formatter<'_>,
        level: u32,
        joints: &[usize],
    ) -> std::fmt::Result {
        for joint in joints {
            Self::indent(f, level)?;
            writeln!(f, "🦴 {:?} [{}]", self.joints[*joint].name, joint)?;
            self.fmt_level(f, level + 1, self.children(*joint))?;
        }
        Ok(())
    }
}

impl Debug for Skeleton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Skeleton hierarchy:")?;
        let roots: Vec<usize> = (0..self.len())
            .filter(|index| self.joints[*index].parent.is_none())
            .collect();
        self.fmt_level(f, 0, &roots)
    }
}
