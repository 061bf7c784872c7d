use bevy::{log::debug, math::Vec2};
use bevy_rig_animation_core::{
    blend_tree::{BlendTree, BlendTreeNode, ChildMotion, FreeformMode},
    clip::{ClipLibrary, ClipSettings},
    controller::AnimatorController,
    errors::ValidationError,
    layers::{LayerBlendMode, LayerDefinition},
    mask::{BodyPart, BodyParts},
    parameters::{ParameterKind, ParameterTable, ParameterValue},
    state_machine::{Condition, InterruptionSource, Motion, State, StateMachine, Transition},
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::loader::ClipProvider;

const NUMERIC: &[ParameterKind] = &[ParameterKind::Float, ParameterKind::Int];
const FLAG: &[ParameterKind] = &[ParameterKind::Bool, ParameterKind::Trigger];

fn one() -> f32 {
    1.
}

fn yes() -> bool {
    true
}

fn default_transition_duration() -> f32 {
    0.25
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ParameterSerial {
    pub name: String,
    pub default: ParameterValue,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ClipSerial {
    pub name: String,
    #[serde(default)]
    pub settings: ClipSettings,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BlendChildSerial<T> {
    /// Threshold, position or weight parameter of the child, depending on the parent node.
    pub at: T,
    pub motion: BlendNodeSerial,
    #[serde(default = "one")]
    pub time_scale: f32,
    #[serde(default)]
    pub cycle_offset: f32,
    #[serde(default)]
    pub mirror: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum BlendNodeSerial {
    Clip(String),
    Blend1D {
        parameter: String,
        children: Vec<BlendChildSerial<f32>>,
    },
    SimpleDirectional2D {
        parameters: (String, String),
        children: Vec<BlendChildSerial<(f32, f32)>>,
    },
    Freeform2D {
        parameters: (String, String),
        #[serde(default)]
        mode: FreeformMode,
        children: Vec<BlendChildSerial<(f32, f32)>>,
    },
    Direct {
        children: Vec<BlendChildSerial<String>>,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BlendTreeSerial {
    pub name: String,
    pub root: BlendNodeSerial,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub enum MotionSerial {
    #[default]
    None,
    Clip(String),
    BlendTree(String),
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum ConditionSerial {
    If(String),
    IfNot(String),
    Greater(String, f32),
    Less(String, f32),
    Equals(String, f32),
    NotEqual(String, f32),
    ExitTime(f32),
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TransitionSerial {
    pub to: String,
    #[serde(default = "default_transition_duration")]
    pub duration: f32,
    /// Whether `duration` is in seconds rather than a fraction of the source state.
    #[serde(default)]
    pub fixed_duration: bool,
    #[serde(default)]
    pub offset: f32,
    #[serde(default)]
    pub conditions: Vec<ConditionSerial>,
    #[serde(default)]
    pub interruption_source: InterruptionSource,
    #[serde(default)]
    pub can_transition_to_self: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StateSerial {
    pub name: String,
    #[serde(default)]
    pub motion: MotionSerial,
    #[serde(default = "one")]
    pub speed: f32,
    #[serde(default)]
    pub speed_parameter: Option<String>,
    #[serde(default)]
    pub cycle_offset: f32,
    #[serde(default)]
    pub mirror: bool,
    #[serde(default)]
    pub mirror_parameter: Option<String>,
    #[serde(default)]
    pub foot_ik: bool,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub transitions: Vec<TransitionSerial>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct StateMachineSerial {
    /// Defaults to the first state.
    #[serde(default)]
    pub default_state: Option<String>,
    #[serde(default)]
    pub states: Vec<StateSerial>,
    #[serde(default)]
    pub any_state: Vec<TransitionSerial>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LayerSerial {
    pub name: String,
    #[serde(default = "one")]
    pub weight: f32,
    #[serde(default)]
    pub mode: LayerBlendMode,
    /// Body parts the layer may touch. Every part when absent.
    #[serde(default)]
    pub mask: Option<Vec<BodyPart>>,
    #[serde(default = "yes")]
    pub ik_pass: bool,
    pub state_machine: StateMachineSerial,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ControllerSerial {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ParameterSerial>,
    #[serde(default)]
    pub clips: Vec<ClipSerial>,
    #[serde(default)]
    pub blend_trees: Vec<BlendTreeSerial>,
    pub layers: Vec<LayerSerial>,
}

/// Name tables a document is resolved against.
struct Names<'a> {
    parameters: &'a ParameterTable,
    clips: &'a ClipLibrary,
    blend_trees: &'a IndexMap<String, usize>,
}

impl Names<'_> {
    fn numeric(&self, name: &str) -> Result<usize, ValidationError> {
        self.parameters.resolve(name, NUMERIC, "a number")
    }

    fn flag(&self, name: &str) -> Result<usize, ValidationError> {
        self.parameters.resolve(name, FLAG, "a flag")
    }
}

impl ControllerSerial {
    /// Resolves every name of the document and validates the result.
    pub fn resolve(
        &self,
        provider: &impl ClipProvider,
    ) -> Result<AnimatorController, ValidationError> {
        let mut parameters = ParameterTable::new();
        for parameter in &self.parameters {
            parameters.add(parameter.name.clone(), parameter.default)?;
        }

        let mut clips = ClipLibrary::new();
        for clip in &self.clips {
            let source = provider
                .clip(&clip.name)
                .ok_or_else(|| ValidationError::UnknownClip(clip.name.clone()))?;
            clips.add(clip.name.clone(), source, clip.settings.clone())?;
        }

        let mut tree_indices = IndexMap::new();
        for (index, tree) in self.blend_trees.iter().enumerate() {
            if tree_indices.insert(tree.name.clone(), index).is_some() {
                return Err(ValidationError::DuplicateName(tree.name.clone()));
            }
        }
        let names = Names {
            parameters: &parameters,
            clips: &clips,
            blend_trees: &tree_indices,
        };

        let blend_trees = self
            .blend_trees
            .iter()
            .map(|tree| tree.resolve(&names))
            .collect::<Result<Vec<_>, _>>()?;

        let mut layers = Vec::with_capacity(self.layers.len());
        let mut state_machines = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            if layers
                .iter()
                .any(|existing: &LayerDefinition| existing.name == layer.name)
            {
                return Err(ValidationError::DuplicateName(layer.name.clone()));
            }
            state_machines.push(layer.state_machine.resolve(&layer.name, &names)?);
            let mask = match &layer.mask {
                Some(parts) => BodyParts::from_parts(parts.iter().copied()),
                None => BodyParts::all(),
            };
            let mut definition = LayerDefinition::new(layer.name.clone(), state_machines.len() - 1)
                .with_weight(layer.weight)
                .with_mode(layer.mode)
                .with_mask(mask);
            definition.ik_pass = layer.ik_pass;
            layers.push(definition);
        }

        debug!("Resolved controller document {:?}", self.name);
        AnimatorController::new(
            self.name.clone(),
            parameters,
            layers,
            state_machines,
            blend_trees,
            clips,
        )
    }
}

impl BlendTreeSerial {
    fn resolve(&self, names: &Names) -> Result<BlendTree, ValidationError> {
        let mut nodes = vec![];
        flatten(&self.root, names, &mut nodes)?;
        BlendTree::new(self.name.clone(), nodes)
    }
}

/// Pushes `node` and its subtree in pre-order, so that children always come after their parent.
fn flatten(
    node: &BlendNodeSerial,
    names: &Names,
    nodes: &mut Vec<BlendTreeNode>,
) -> Result<usize, ValidationError> {
    let index = nodes.len();
    nodes.push(BlendTreeNode::clip(0));

    let built = match node {
        BlendNodeSerial::Clip(name) => BlendTreeNode::clip(names.clips.resolve(name)?),
        BlendNodeSerial::Blend1D {
            parameter,
            children,
        } => {
            let parameter = names.numeric(parameter)?;
            let mut resolved = Vec::with_capacity(children.len());
            for child in children {
                resolved.push((child_motion(child, names, nodes)?, child.at));
            }
            BlendTreeNode::blend_1d(parameter, resolved)
        }
        BlendNodeSerial::SimpleDirectional2D {
            parameters,
            children,
        } => {
            let parameters = [names.numeric(&parameters.0)?, names.numeric(&parameters.1)?];
            let mut resolved = Vec::with_capacity(children.len());
            for child in children {
                let (x, y) = child.at;
                resolved.push((child_motion(child, names, nodes)?, Vec2::new(x, y)));
            }
            BlendTreeNode::simple_directional(parameters, resolved)
        }
        BlendNodeSerial::Freeform2D {
            parameters,
            mode,
            children,
        } => {
            let parameters = [names.numeric(&parameters.0)?, names.numeric(&parameters.1)?];
            let mut resolved = Vec::with_capacity(children.len());
            for child in children {
                let (x, y) = child.at;
                resolved.push((child_motion(child, names, nodes)?, Vec2::new(x, y)));
            }
            BlendTreeNode::freeform(parameters, *mode, resolved)
        }
        BlendNodeSerial::Direct { children } => {
            let mut resolved = Vec::with_capacity(children.len());
            for child in children {
                let parameter = names.numeric(&child.at)?;
                resolved.push((child_motion(child, names, nodes)?, parameter));
            }
            BlendTreeNode::direct(resolved)
        }
    };
    nodes[index] = built;
    Ok(index)
}

fn child_motion<T>(
    child: &BlendChildSerial<T>,
    names: &Names,
    nodes: &mut Vec<BlendTreeNode>,
) -> Result<ChildMotion, ValidationError> {
    Ok(ChildMotion {
        node: flatten(&child.motion, names, nodes)?,
        time_scale: child.time_scale,
        cycle_offset: child.cycle_offset,
        mirror: child.mirror,
    })
}

impl StateMachineSerial {
    fn resolve(&self, machine: &str, names: &Names) -> Result<StateMachine, ValidationError> {
        let mut states_by_name = IndexMap::new();
        for (index, state) in self.states.iter().enumerate() {
            if states_by_name.insert(state.name.as_str(), index).is_some() {
                return Err(ValidationError::DuplicateName(state.name.clone()));
            }
        }
        let state_index = |name: &str| {
            states_by_name
                .get(name)
                .copied()
                .ok_or_else(|| ValidationError::UnknownState {
                    machine: machine.to_string(),
                    state: name.to_string(),
                })
        };

        let default_state = match &self.default_state {
            Some(name) => state_index(name)?,
            None => 0,
        };

        let mut states = Vec::with_capacity(self.states.len());
        for serial in &self.states {
            let motion = match &serial.motion {
                MotionSerial::None => Motion::None,
                MotionSerial::Clip(name) => Motion::Clip(names.clips.resolve(name)?),
                MotionSerial::BlendTree(name) => Motion::BlendTree(
                    names
                        .blend_trees
                        .get(name)
                        .copied()
                        .ok_or_else(|| ValidationError::UnknownBlendTree(name.clone()))?,
                ),
            };
            let mut state = State::new(serial.name.clone(), motion);
            state.speed = serial.speed;
            state.speed_parameter = serial
                .speed_parameter
                .as_deref()
                .map(|name| names.numeric(name))
                .transpose()?;
            state.cycle_offset = serial.cycle_offset;
            state.mirror = serial.mirror;
            state.mirror_parameter = serial
                .mirror_parameter
                .as_deref()
                .map(|name| names.parameters.resolve(name, &[ParameterKind::Bool], "a bool"))
                .transpose()?;
            state.foot_ik = serial.foot_ik;
            state.tag = serial.tag.clone();
            for transition in &serial.transitions {
                state
                    .transitions
                    .push(transition.resolve(&state_index, names)?);
            }
            states.push(state);
        }

        let any_state = self
            .any_state
            .iter()
            .map(|transition| transition.resolve(&state_index, names))
            .collect::<Result<Vec<_>, _>>()?;

        StateMachine::new(machine, states, any_state, default_state)
    }
}

impl TransitionSerial {
    fn resolve(
        &self,
        state_index: &impl Fn(&str) -> Result<usize, ValidationError>,
        names: &Names,
    ) -> Result<Transition, ValidationError> {
        let mut transition = Transition::to(state_index(&self.to)?)
            .with_duration(self.duration, self.fixed_duration)
            .with_offset(self.offset)
            .with_interruption(self.interruption_source);
        transition.can_transition_to_self = self.can_transition_to_self;
        for condition in &self.conditions {
            transition = transition.with_condition(condition.resolve(names)?);
        }
        Ok(transition)
    }
}

impl ConditionSerial {
    fn resolve(&self, names: &Names) -> Result<Condition, ValidationError> {
        Ok(match self {
            Self::If(name) => Condition::If(names.flag(name)?),
            Self::IfNot(name) => Condition::IfNot(names.flag(name)?),
            Self::Greater(name, value) => Condition::Greater(names.numeric(name)?, *value),
            Self::Less(name, value) => Condition::Less(names.numeric(name)?, *value),
            Self::Equals(name, value) => Condition::Equals(names.numeric(name)?, *value),
            Self::NotEqual(name, value) => Condition::NotEqual(names.numeric(name)?, *value),
            Self::ExitTime(time) => Condition::ExitTime(*time),
        })
    }
}
