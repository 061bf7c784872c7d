//! The constant data of an animated character type, shared by every instance.

use std::sync::Arc;

use bevy::log::debug;

use crate::{
    blend_tree::BlendTree,
    clip::ClipLibrary,
    errors::{RigError, RigResult, ValidationError},
    layers::{LayerBlendMode, LayerDefinition},
    mask::BodyParts,
    parameters::ParameterTable,
    state_machine::StateMachine,
};

/// Parameters, layers, state machines, blend trees and clips of one controller. Validated once
/// at construction; evaluation never fails afterwards.
#[derive(Debug, Clone)]
pub struct AnimatorController {
    name: String,
    parameters: Arc<ParameterTable>,
    layers: Vec<LayerDefinition>,
    state_machines: Vec<Arc<StateMachine>>,
    blend_trees: Vec<BlendTree>,
    clips: ClipLibrary,
}

impl AnimatorController {
    pub fn new(
        name: impl Into<String>,
        parameters: ParameterTable,
        layers: Vec<LayerDefinition>,
        state_machines: Vec<StateMachine>,
        blend_trees: Vec<BlendTree>,
        clips: ClipLibrary,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if let Some(base) = layers.first() {
            if base.mode != LayerBlendMode::Override || base.mask != BodyParts::all() {
                return Err(ValidationError::InvalidBaseLayer(base.name.clone()));
            }
        }
        for layer in &layers {
            if layer.state_machine >= state_machines.len() {
                return Err(ValidationError::InvalidStateMachineIndex(layer.name.clone()));
            }
        }
        for machine in &state_machines {
            machine.validate_indices(&parameters, clips.len(), blend_trees.len())?;
        }
        for tree in &blend_trees {
            tree.validate_indices(clips.len(), parameters.len())?;
        }
        debug!(
            "Built controller {name:?}: {} layers, {} state machines, {} blend trees, {} clips",
            layers.len(),
            state_machines.len(),
            blend_trees.len(),
            clips.len()
        );

        Ok(Self {
            name,
            parameters: Arc::new(parameters),
            layers,
            state_machines: state_machines.into_iter().map(Arc::new).collect(),
            blend_trees,
            clips,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &Arc<ParameterTable> {
        &self.parameters
    }

    pub fn layers(&self) -> &[LayerDefinition] {
        &self.layers
    }

    pub fn layer_index(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|layer| layer.name == name)
    }

    pub fn state_machines(&self) -> &[Arc<StateMachine>] {
        &self.state_machines
    }

    /// State machine driving a layer.
    pub fn layer_state_machine(&self, layer: usize) -> RigResult<&StateMachine> {
        self.layers
            .get(layer)
            .and_then(|layer| self.state_machines.get(layer.state_machine))
            .map(Arc::as_ref)
            .ok_or(RigError::InvalidLayer(layer))
    }

    pub fn blend_trees(&self) -> &[BlendTree] {
        &self.blend_trees
    }

    pub fn clips(&self) -> &ClipLibrary {
        &self.clips
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::state_machine::{Motion, State};

    fn machine(motion: Motion) -> StateMachine {
        StateMachine::new("base", vec![State::new("idle", motion)], vec![], 0).unwrap()
    }

    #[test]
    fn test_base_layer_must_override_everything() {
        let error = AnimatorController::new(
            "character",
            ParameterTable::new(),
            vec![LayerDefinition::new("base", 0).with_mask(BodyParts::ARMS)],
            vec![machine(Motion::None)],
            vec![],
            ClipLibrary::new(),
        )
        .unwrap_err();
        assert_eq!(error, ValidationError::InvalidBaseLayer("base".into()));
    }

    #[test]
    fn test_layer_state_machine_must_exist() {
        let error = AnimatorController::new(
            "character",
            ParameterTable::new(),
            vec![LayerDefinition::new("base", 1)],
            vec![machine(Motion::None)],
            vec![],
            ClipLibrary::new(),
        )
        .unwrap_err();
        assert_eq!(error, ValidationError::InvalidStateMachineIndex("base".into()));
    }

    #[test]
    fn test_motions_are_checked() {
        let error = AnimatorController::new(
            "character",
            ParameterTable::new(),
            vec![LayerDefinition::new("base", 0)],
            vec![machine(Motion::BlendTree(0))],
            vec![],
            ClipLibrary::new(),
        )
        .unwrap_err();
        assert_eq!(error, ValidationError::InvalidBlendTreeIndex(0));
    }

    #[test]
    fn test_lookups() {
        let controller = AnimatorController::new(
            "character",
            ParameterTable::new(),
            vec![
                LayerDefinition::new("base", 0),
                LayerDefinition::new("upper", 0).with_mode(LayerBlendMode::Additive),
            ],
            vec![machine(Motion::None)],
            vec![],
            ClipLibrary::new(),
        )
        .unwrap();
        assert_eq!(controller.layer_index("upper"), Some(1));
        assert!(controller.layer_state_machine(1).is_ok());
        assert_eq!(
            controller.layer_state_machine(2).unwrap_err(),
            RigError::InvalidLayer(2)
        );
    }
}
