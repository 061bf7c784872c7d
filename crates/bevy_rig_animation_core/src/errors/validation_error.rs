use thiserror::Error;

use crate::{humanoid::HumanBone, parameters::ParameterKind};

/// Configuration errors. These are reported when constant data is built or loaded and can never
/// surface while a character is being evaluated.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Unknown parameter: {0:?}")]
    UnknownParameter(String),
    #[error("Parameter {name:?} is a {found:?} but is used as {expected}")]
    ParameterKindMismatch {
        name: String,
        found: ParameterKind,
        expected: &'static str,
    },
    #[error("Parameter index {0} is out of range")]
    InvalidParameterIndex(usize),
    #[error("Duplicate name: {0:?}")]
    DuplicateName(String),
    #[error("Unknown state {state:?} in state machine {machine:?}")]
    UnknownState { machine: String, state: String },
    #[error("State machine {machine:?} targets state {destination}, but it only has {state_count} states")]
    InvalidDestination {
        machine: String,
        destination: usize,
        state_count: usize,
    },
    #[error("State machine {0:?} has a default state out of range")]
    InvalidDefaultState(String),
    #[error("Layer {0:?} references a state machine that does not exist")]
    InvalidStateMachineIndex(String),
    #[error("The first layer must be a full-body override layer, {0:?} is not")]
    InvalidBaseLayer(String),
    #[error("Unknown clip: {0:?}")]
    UnknownClip(String),
    #[error("Clip index {0} is out of range")]
    InvalidClipIndex(usize),
    #[error("Unknown blend tree: {0:?}")]
    UnknownBlendTree(String),
    #[error("Blend tree index {0} is out of range")]
    InvalidBlendTreeIndex(usize),
    #[error("Blend tree {0:?} has no nodes")]
    EmptyBlendTree(String),
    #[error("Blend node {node} of {tree:?} has no children")]
    EmptyBlendNode { tree: String, node: usize },
    #[error("Blend node {node} of {tree:?} has {children} children but {values} thresholds or positions")]
    BlendNodeArity {
        tree: String,
        node: usize,
        children: usize,
        values: usize,
    },
    #[error("Blend node {node} of {tree:?} references node {child}, which does not come after it")]
    InvalidBlendChild {
        tree: String,
        node: usize,
        child: usize,
    },
    #[error("Unknown joint: {0:?}")]
    UnknownJoint(String),
    #[error("Joint {joint:?} is listed before its parent {parent:?}")]
    JointOrder { joint: String, parent: String },
    #[error("Required humanoid bone {0:?} is not mapped")]
    MissingRequiredBone(HumanBone),
    #[error("Humanoid bone {bone:?} is not below {ancestor:?} in the skeleton")]
    BrokenBoneChain { bone: HumanBone, ancestor: HumanBone },
    #[error("Joint {0:?} is mapped to more than one humanoid bone")]
    JointMappedTwice(String),
    #[error("Invalid name pattern: {0}")]
    InvalidPattern(String),
}
