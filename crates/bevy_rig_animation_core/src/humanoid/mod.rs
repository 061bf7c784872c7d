//! Skeleton-independent humanoid description and its mapping onto concrete skeletons.

pub mod axes;
pub mod bones;
pub mod dof;
pub mod map;
pub mod naming;
pub mod reference;
pub mod retarget;
pub mod skeleton;

pub use axes::{Axes, AxesKind, AxisLimit};
pub use bones::{
    BONE_DEFINITIONS, FINGER_BONE_COUNT, FingerBone, GOAL_COUNT, Goal, HUMAN_BONE_COUNT,
    HumanBone, Side,
};
pub use dof::{BODY_DOF_COUNT, BODY_DOFS, FINGER_DOF_COUNT, FINGER_DOFS, mirror_dof};
pub use map::{AxesOverride, BoneMapping, HumanoidMap, HumanoidSettings};
pub use naming::PatternMapper;
pub use skeleton::{Joint, Skeleton};
