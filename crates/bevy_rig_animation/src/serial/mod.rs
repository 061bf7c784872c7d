//! Serialized forms of controllers and avatars. Everything refers to everything else by name;
//! names are resolved to indices once, when the document is loaded.

mod avatar;
mod controller;

pub use avatar::{AvatarSerial, JointSerial, SkeletonSerial};
pub use controller::{
    BlendChildSerial, BlendNodeSerial, BlendTreeSerial, ClipSerial, ConditionSerial,
    ControllerSerial, LayerSerial, MotionSerial, ParameterSerial, StateMachineSerial, StateSerial,
    TransitionSerial,
};
