//! # Bevy Rig Animation Core
//!
//! Evaluation runtime for skinned humanoid characters. Every tick a character goes through the
//! same fixed pipeline:
//!
//! 1. Each layer's [`StateMachineInstance`] advances normalized time and fires transitions.
//! 2. Each [`MotionLayer`] samples the [`BlendTree`]s of its current and next states into a
//!    skeleton-independent [`Pose`].
//! 3. The [`LayerCompositor`] merges the layer poses under body-part masks.
//! 4. The [`HumanoidMap`] retargets the generic pose onto a concrete skeleton.
//! 5. The [`IkSolver`] applies limb goals, foot stabilization, look-at and twist distribution.
//!
//! Constant data (state machines, blend trees, clips, humanoid maps) is built once and shared
//! read-only between any number of characters. Per-character memory lives in the layer and
//! solver instances and is reused every tick.
//!
//! [`StateMachineInstance`]: state_machine::StateMachineInstance
//! [`MotionLayer`]: layers::MotionLayer
//! [`BlendTree`]: blend_tree::BlendTree
//! [`Pose`]: pose::Pose
//! [`LayerCompositor`]: layers::LayerCompositor
//! [`HumanoidMap`]: humanoid::HumanoidMap
//! [`IkSolver`]: ik::IkSolver

pub mod blend_tree;
pub mod clip;
pub mod controller;
pub mod errors;
pub mod humanoid;
pub mod ik;
pub mod interpolation;
pub mod layers;
pub mod mask;
pub mod parameters;
pub mod pose;
pub mod state_machine;
pub mod symmetry;

pub mod prelude {
    pub use crate::{
        blend_tree::{BlendLeaf, BlendNodeKind, BlendTree, BlendTreeNode, ChildMotion},
        clip::{Clip, ClipLibrary, ClipSettings, ConstantClip, RootMotionMode, SampledClip},
        controller::AnimatorController,
        errors::{RigError, RigResult, ValidationError},
        humanoid::{
            BoneMapping, FingerBone, Goal, HumanBone, HumanoidMap, HumanoidSettings, Side,
            Skeleton,
        },
        ik::{GoalTarget, IkSolver, IkTargets, LookAtTarget},
        layers::{LayerBlendMode, LayerCompositor, LayerDefinition, MotionLayer},
        mask::{BodyPart, BodyParts, PoseMask},
        parameters::{ParameterKind, ParameterSet, ParameterTable, ParameterValue},
        pose::{MotionDelta, Pose, SkeletonPose},
        state_machine::{
            Condition, InterruptionSource, Motion, State, StateMachine, StateMachineInstance,
            StateRequest, Transition, TransitionId,
        },
    };
}
