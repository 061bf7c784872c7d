//! Animation layers: per-character sampling of each layer's state machine and the compositor that
//! merges layer poses into one.

mod compositor;
mod motion_layer;

use bevy::reflect::{Reflect, std_traits::ReflectDefault};
use serde::{Deserialize, Serialize};

pub use compositor::{ComposedPose, LayerCompositor, LayerContribution};
pub use motion_layer::{MotionLayer, StatePose};

use crate::mask::{BodyParts, PoseMask};

#[derive(Reflect, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[reflect(Default)]
pub enum LayerBlendMode {
    /// Replaces lower layers, blended by weight.
    #[default]
    Override,
    /// Adds the difference from each clip's reference frame on top of lower layers.
    Additive,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerDefinition {
    pub name: String,
    /// Index into the controller's state machines.
    pub state_machine: usize,
    /// Ignored for the first layer, which always has full weight.
    pub weight: f32,
    pub mode: LayerBlendMode,
    pub mask: BodyParts,
    /// Whether this layer's states may turn on foot IK.
    pub ik_pass: bool,
}

impl LayerDefinition {
    pub fn new(name: impl Into<String>, state_machine: usize) -> Self {
        Self {
            name: name.into(),
            state_machine,
            weight: 1.,
            mode: LayerBlendMode::Override,
            mask: BodyParts::all(),
            ik_pass: true,
        }
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_mode(mut self, mode: LayerBlendMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_mask(mut self, mask: BodyParts) -> Self {
        self.mask = mask;
        self
    }

    pub fn pose_mask(&self) -> PoseMask {
        PoseMask::from_body_parts(self.mask)
    }
}
