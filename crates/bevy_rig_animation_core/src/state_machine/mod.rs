//! Per-layer hierarchical state machines: constant state graphs and their per-character
//! instances.

mod condition;
mod instance;

use bevy::reflect::{Reflect, std_traits::ReflectDefault};
use serde::{Deserialize, Serialize};

pub use condition::{Condition, TIME_EPSILON, exit_time_reached};
pub use instance::{Phase, StateMachineInstance, StateMachineOutput, StateSample};

use crate::{
    errors::ValidationError,
    parameters::{ParameterKind, ParameterSet, ParameterTable},
};

/// What a state plays.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Motion {
    /// Nothing. The state still advances time, as if it lasted one second.
    #[default]
    None,
    Clip(usize),
    BlendTree(usize),
}

/// Which transitions may interrupt an active transition.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[reflect(Default)]
pub enum InterruptionSource {
    /// The transition is atomic.
    #[default]
    None,
    Source,
    Destination,
    SourceThenDestination,
    DestinationThenSource,
}

impl InterruptionSource {
    /// States whose transitions are searched, in order, while a transition from `source` to
    /// `destination` is active.
    pub fn states(self, source: usize, destination: usize) -> [Option<usize>; 2] {
        match self {
            Self::None => [None, None],
            Self::Source => [Some(source), None],
            Self::Destination => [Some(destination), None],
            Self::SourceThenDestination => [Some(source), Some(destination)],
            Self::DestinationThenSource => [Some(destination), Some(source)],
        }
    }
}

/// Identity of a fired transition.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionId {
    /// Transition `index` of state `state`.
    Authored { state: usize, index: usize },
    /// Any-state transition `index`.
    AnyState(usize),
    /// A "go to state" request made from code.
    Explicit,
}

#[derive(Reflect, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub destination: usize,
    /// In seconds when `fixed_duration`, otherwise a fraction of the source state's duration.
    pub duration: f32,
    pub fixed_duration: bool,
    /// Normalized time the destination state starts at.
    pub offset: f32,
    pub conditions: Vec<Condition>,
    pub interruption_source: InterruptionSource,
    pub can_transition_to_self: bool,
}

impl Transition {
    pub fn to(destination: usize) -> Self {
        Self {
            destination,
            duration: 0.,
            fixed_duration: true,
            offset: 0.,
            conditions: vec![],
            interruption_source: InterruptionSource::None,
            can_transition_to_self: false,
        }
    }

    pub fn with_duration(mut self, duration: f32, fixed_duration: bool) -> Self {
        self.duration = duration;
        self.fixed_duration = fixed_duration;
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_offset(mut self, offset: f32) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_interruption(mut self, source: InterruptionSource) -> Self {
        self.interruption_source = source;
        self
    }

    pub fn conditions_hold(&self, parameters: &ParameterSet, previous_time: f32, time: f32) -> bool {
        self.conditions
            .iter()
            .all(|condition| condition.check(parameters, previous_time, time))
    }
}

#[derive(Reflect, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub name: String,
    pub motion: Motion,
    pub speed: f32,
    /// Float parameter multiplying `speed`.
    pub speed_parameter: Option<usize>,
    /// Normalized offset added to the state's time when sampling.
    pub cycle_offset: f32,
    pub mirror: bool,
    /// Bool parameter toggling mirroring on top of `mirror`.
    pub mirror_parameter: Option<usize>,
    /// Whether limb goals of this state's clips drive IK.
    pub foot_ik: bool,
    pub tag: Option<String>,
    pub transitions: Vec<Transition>,
}

impl State {
    pub fn new(name: impl Into<String>, motion: Motion) -> Self {
        Self {
            name: name.into(),
            motion,
            speed: 1.,
            speed_parameter: None,
            cycle_offset: 0.,
            mirror: false,
            mirror_parameter: None,
            foot_ik: false,
            tag: None,
            transitions: vec![],
        }
    }

    pub fn with_transition(mut self, transition: Transition) -> Self {
        self.transitions.push(transition);
        self
    }

    pub fn effective_speed(&self, parameters: &ParameterSet) -> f32 {
        match self.speed_parameter {
            Some(index) => self.speed * parameters.as_f32(index),
            None => self.speed,
        }
    }

    pub fn effective_mirror(&self, parameters: &ParameterSet) -> bool {
        let toggled = self
            .mirror_parameter
            .is_some_and(|index| parameters.as_bool(index));
        self.mirror != toggled
    }

    pub fn has_motion(&self) -> bool {
        self.motion != Motion::None
    }
}

/// A "go to state" request made from code for one layer.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateRequest {
    pub state: usize,
    /// Normalized time the state starts at.
    pub normalized_time: f32,
    /// Zero jumps straight to the state.
    pub transition_duration: f32,
    pub fixed_duration: bool,
    /// Progress the transition starts at.
    pub transition_time: f32,
}

impl StateRequest {
    pub fn play(state: usize) -> Self {
        Self {
            state,
            normalized_time: 0.,
            transition_duration: 0.,
            fixed_duration: true,
            transition_time: 0.,
        }
    }

    pub fn cross_fade(state: usize, duration: f32) -> Self {
        Self {
            transition_duration: duration,
            ..Self::play(state)
        }
    }
}

/// Constant state graph of one layer.
#[derive(Reflect, Debug, Clone, PartialEq)]
pub struct StateMachine {
    name: String,
    states: Vec<State>,
    any_state: Vec<Transition>,
    default_state: usize,
}

impl StateMachine {
    pub fn new(
        name: impl Into<String>,
        states: Vec<State>,
        any_state: Vec<Transition>,
        default_state: usize,
    ) -> Result<Self, ValidationError> {
        let machine = Self {
            name: name.into(),
            states,
            any_state,
            default_state,
        };
        if !machine.states.is_empty() && default_state >= machine.states.len() {
            return Err(ValidationError::InvalidDefaultState(machine.name));
        }
        let transitions = machine
            .states
            .iter()
            .flat_map(|state| &state.transitions)
            .chain(&machine.any_state);
        for transition in transitions {
            if transition.destination >= machine.states.len() {
                return Err(ValidationError::InvalidDestination {
                    machine: machine.name.clone(),
                    destination: transition.destination,
                    state_count: machine.states.len(),
                });
            }
        }
        Ok(machine)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn state(&self, index: usize) -> Option<&State> {
        self.states.get(index)
    }

    pub fn state_index(&self, name: &str) -> Option<usize> {
        self.states.iter().position(|state| state.name == name)
    }

    pub fn any_state(&self) -> &[Transition] {
        &self.any_state
    }

    pub fn default_state(&self) -> usize {
        self.default_state
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn transition(&self, id: TransitionId) -> Option<&Transition> {
        match id {
            TransitionId::Authored { state, index } => self.states.get(state)?.transitions.get(index),
            TransitionId::AnyState(index) => self.any_state.get(index),
            TransitionId::Explicit => None,
        }
    }

    /// Resets the trigger parameters read by the conditions of a fired transition.
    pub fn consume_triggers(&self, id: TransitionId, parameters: &mut ParameterSet) {
        let Some(transition) = self.transition(id) else {
            return;
        };
        for condition in &transition.conditions {
            if let Condition::If(index) = condition {
                parameters.consume_trigger(*index);
            }
        }
    }

    /// Checks motion and parameter indices, and that every condition reads a parameter of a
    /// compatible kind.
    pub fn validate_indices(
        &self,
        parameters: &ParameterTable,
        clip_count: usize,
        blend_tree_count: usize,
    ) -> Result<(), ValidationError> {
        for state in &self.states {
            match state.motion {
                Motion::Clip(clip) if clip >= clip_count => {
                    return Err(ValidationError::InvalidClipIndex(clip));
                }
                Motion::BlendTree(tree) if tree >= blend_tree_count => {
                    return Err(ValidationError::InvalidBlendTreeIndex(tree));
                }
                _ => {}
            }
            if let Some(index) = state.speed_parameter {
                check_kind(parameters, index, true)?;
            }
            if let Some(index) = state.mirror_parameter {
                check_kind(parameters, index, false)?;
            }
        }
        let transitions = self
            .states
            .iter()
            .flat_map(|state| &state.transitions)
            .chain(&self.any_state);
        for condition in transitions.flat_map(|transition| &transition.conditions) {
            let numeric = !matches!(condition, Condition::If(_) | Condition::IfNot(_));
            if let Some(index) = condition.parameter() {
                check_kind(parameters, index, numeric)?;
            }
        }
        Ok(())
    }
}

fn check_kind(
    parameters: &ParameterTable,
    index: usize,
    numeric: bool,
) -> Result<(), ValidationError> {
    let kind = parameters
        .kind(index)
        .ok_or(ValidationError::InvalidParameterIndex(index))?;
    let (accepted, expected) = if numeric {
        (matches!(kind, ParameterKind::Float | ParameterKind::Int), "a number")
    } else {
        (matches!(kind, ParameterKind::Bool | ParameterKind::Trigger), "a flag")
    };
    if accepted {
        return Ok(());
    }
    Err(ValidationError::ParameterKindMismatch {
        name: parameters.name(index).unwrap_or_default().to_string(),
        found: kind,
        expected,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parameters::ParameterValue;

    #[test]
    fn test_invalid_destination() {
        let error = StateMachine::new(
            "base",
            vec![State::new("idle", Motion::None).with_transition(Transition::to(3))],
            vec![],
            0,
        )
        .unwrap_err();
        assert_eq!(
            error,
            ValidationError::InvalidDestination {
                machine: "base".into(),
                destination: 3,
                state_count: 1,
            }
        );
    }

    #[test]
    fn test_lookup() {
        let machine = StateMachine::new(
            "base",
            vec![
                State::new("idle", Motion::Clip(0)),
                State::new("walk", Motion::Clip(1)).with_transition(Transition::to(0)),
            ],
            vec![Transition::to(1)],
            0,
        )
        .unwrap();
        assert_eq!(machine.state_index("walk"), Some(1));
        assert_eq!(machine.state_index("run"), None);
        assert_eq!(
            machine.transition(TransitionId::Authored { state: 1, index: 0 }),
            Some(&Transition::to(0))
        );
        assert_eq!(machine.transition(TransitionId::Explicit), None);
    }

    #[test]
    fn test_condition_kind_is_checked() {
        let table = ParameterTable::new()
            .with("speed", ParameterValue::Float(0.))
            .with("grounded", ParameterValue::Bool(true));
        let machine = StateMachine::new(
            "base",
            vec![
                State::new("idle", Motion::Clip(0))
                    .with_transition(Transition::to(0).with_condition(Condition::If(0))),
            ],
            vec![],
            0,
        )
        .unwrap();
        assert_eq!(
            machine.validate_indices(&table, 1, 0),
            Err(ValidationError::ParameterKindMismatch {
                name: "speed".into(),
                found: ParameterKind::Float,
                expected: "a flag",
            })
        );
        assert_eq!(
            machine.validate_indices(&table, 0, 0),
            Err(ValidationError::InvalidClipIndex(0))
        );
    }
}
