use std::sync::Arc;

use bevy::log::warn;
use bevy_rig_animation_core::{
    controller::AnimatorController,
    errors::{RigError, RigResult},
    humanoid::HumanoidMap,
    ik::{IkSolver, IkTargets},
    layers::{LayerCompositor, LayerContribution, MotionLayer},
    mask::PoseMask,
    parameters::{ParameterSet, ParameterValue},
    pose::{MotionDelta, Pose, SkeletonPose},
    state_machine::StateRequest,
};

/// Inputs of one [`Animator::update`].
#[derive(Debug, Clone, Default)]
pub struct AnimatorInput {
    /// Seconds since the previous update.
    pub dt: f32,
    /// Explicit state requests, by layer index. They take priority over every transition.
    pub requests: Vec<(usize, StateRequest)>,
    pub ik: IkTargets,
}

impl AnimatorInput {
    pub fn new(dt: f32) -> Self {
        Self {
            dt,
            ..Default::default()
        }
    }

    pub fn with_request(mut self, layer: usize, request: StateRequest) -> Self {
        self.requests.push((layer, request));
        self
    }

    pub fn with_ik(mut self, ik: IkTargets) -> Self {
        self.ik = ik;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnimatorOutput {
    /// Local transform of every skeleton joint.
    pub pose: SkeletonPose,
    /// Composed humanoid pose, before retargeting and IK.
    pub humanoid: Pose,
    /// Fields of `humanoid` written by some layer.
    pub written: PoseMask,
    /// Root motion in the skeleton's units, plus gravity weight and foot memory.
    pub motion: MotionDelta,
}

impl AnimatorOutput {
    /// Output of a character that has not been updated yet: the skeleton at rest.
    fn rest(map: &HumanoidMap) -> Self {
        Self {
            pose: map.rest_locals().clone(),
            humanoid: map.default_pose().clone(),
            written: PoseMask::NONE,
            motion: MotionDelta::default(),
        }
    }
}

/// One animated character: per-character state over shared controller and avatar data.
///
/// Every buffer is allocated in [`Animator::new`]; updates reuse them.
#[derive(Debug, Clone)]
pub struct Animator {
    controller: Arc<AnimatorController>,
    map: Arc<HumanoidMap>,
    parameters: ParameterSet,
    layers: Vec<MotionLayer>,
    layer_weights: Vec<f32>,
    pending: Vec<Option<StateRequest>>,
    compositor: LayerCompositor,
    ik: IkSolver,
    output: AnimatorOutput,
}

impl Animator {
    pub fn new(controller: Arc<AnimatorController>, map: Arc<HumanoidMap>) -> RigResult<Self> {
        let layers = (0..controller.layers().len())
            .map(|index| MotionLayer::new(index, &controller))
            .collect::<RigResult<Vec<_>>>()?;
        let layer_weights = controller.layers().iter().map(|layer| layer.weight).collect();
        let output = AnimatorOutput::rest(&map);
        Ok(Self {
            parameters: ParameterSet::new(controller.parameters().clone()),
            pending: vec![None; layers.len()],
            layers,
            layer_weights,
            compositor: LayerCompositor::new(),
            ik: IkSolver::new(&map),
            output,
            controller,
            map,
        })
    }

    pub fn controller(&self) -> &Arc<AnimatorController> {
        &self.controller
    }

    pub fn map(&self) -> &Arc<HumanoidMap> {
        &self.map
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn layer(&self, index: usize) -> Option<&MotionLayer> {
        self.layers.get(index)
    }

    pub fn output(&self) -> &AnimatorOutput {
        &self.output
    }

    pub fn set_float(&mut self, name: &str, value: f32) -> RigResult<()> {
        self.parameters
            .set_by_name(name, ParameterValue::Float(value))
    }

    pub fn set_int(&mut self, name: &str, value: i32) -> RigResult<()> {
        self.parameters.set_by_name(name, ParameterValue::Int(value))
    }

    pub fn set_bool(&mut self, name: &str, value: bool) -> RigResult<()> {
        self.parameters.set_by_name(name, ParameterValue::Bool(value))
    }

    /// Arms a trigger. It stays set until a transition it satisfied fires.
    pub fn set_trigger(&mut self, name: &str) -> RigResult<()> {
        self.parameters
            .set_by_name(name, ParameterValue::Trigger(true))
    }

    pub fn reset_trigger(&mut self, name: &str) -> RigResult<()> {
        self.parameters
            .set_by_name(name, ParameterValue::Trigger(false))
    }

    pub fn layer_weight(&self, layer: usize) -> Option<f32> {
        self.layer_weights.get(layer).copied()
    }

    /// Overrides a layer's authored weight. The base layer always has full weight.
    pub fn set_layer_weight(&mut self, layer: usize, weight: f32) -> RigResult<()> {
        match self.layer_weights.get_mut(layer) {
            Some(slot) => {
                *slot = weight.clamp(0., 1.);
                Ok(())
            }
            None => {
                let error = RigError::InvalidLayer(layer);
                warn!("Ignoring layer weight: {error}");
                Err(error)
            }
        }
    }

    /// Jumps a layer to a state at the next update.
    pub fn play(&mut self, layer: usize, state: &str) -> RigResult<()> {
        let index = self.state_index(layer, state)?;
        self.pending[layer] = Some(StateRequest::play(index));
        Ok(())
    }

    /// Fades a layer into a state over `duration` seconds, starting at the next update.
    pub fn cross_fade(&mut self, layer: usize, state: &str, duration: f32) -> RigResult<()> {
        let index = self.state_index(layer, state)?;
        self.pending[layer] = Some(StateRequest::cross_fade(index, duration));
        Ok(())
    }

    fn state_index(&self, layer: usize, state: &str) -> RigResult<usize> {
        let result = self
            .controller
            .layer_state_machine(layer)
            .and_then(|machine| {
                machine
                    .state_index(state)
                    .ok_or_else(|| RigError::UnknownState(state.to_string()))
            });
        if let Err(error) = &result {
            warn!("Ignoring state request: {error}");
        }
        result
    }

    /// Returns every layer to its default state and every parameter to its default value. The
    /// output goes back to the rest pose.
    pub fn reset(&mut self) {
        self.parameters.reset();
        for layer in &mut self.layers {
            layer.reset();
        }
        self.output = AnimatorOutput::rest(&self.map);
        self.pending.fill(None);
        self.ik.reset();
        self.layer_weights = self
            .controller
            .layers()
            .iter()
            .map(|layer| layer.weight)
            .collect();
    }

    /// Runs one tick of the pipeline: state machines, layer sampling, composition, retargeting
    /// and IK.
    pub fn update(&mut self, input: &AnimatorInput) -> &AnimatorOutput {
        for (layer, request) in &input.requests {
            match self.pending.get_mut(*layer) {
                Some(slot) => *slot = Some(*request),
                None => warn!("Ignoring state request: {}", RigError::InvalidLayer(*layer)),
            }
        }

        for (layer, pending) in self.layers.iter_mut().zip(&mut self.pending) {
            layer.evaluate(
                input.dt,
                &self.controller,
                &mut self.parameters,
                pending.take(),
            );
        }

        let contributions = self
            .layers
            .iter()
            .zip(self.controller.layers())
            .zip(&self.layer_weights)
            .map(|((layer, definition), weight)| LayerContribution {
                source: layer.output(),
                weight: *weight,
                motion_factor: layer.motion_factor(),
                mode: definition.mode,
                mask: definition.pose_mask(),
                ik_pass: definition.ik_pass,
            });
        let composed = self
            .compositor
            .compose(contributions, self.map.default_pose());

        let scale = self.map.scale();
        let mut delta = composed.delta;
        delta.translation *= scale;

        self.map.to_skeleton(&composed.pose, &mut self.output.pose);
        self.ik.solve(
            &self.map,
            &composed.pose,
            composed.foot_ik,
            &input.ik,
            &delta,
            input.dt,
            &mut self.output.pose,
        );

        self.output
            .humanoid
            .copy_masked(&composed.pose, &PoseMask::ALL);
        self.output.written = composed.written;
        self.output.motion = MotionDelta {
            delta,
            gravity_weight: composed.gravity_weight,
            feet: self.ik.feet(),
        };
        &self.output
    }
}
