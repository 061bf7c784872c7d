use std::sync::Arc;

use bevy::{
    log::{trace, warn},
    reflect::Reflect,
};

use super::{InterruptionSource, State, StateMachine, StateRequest, Transition, TransitionId};
use crate::parameters::ParameterSet;

/// Progress at which a transition is considered complete.
const COMMIT_THRESHOLD: f32 = 1. - 1e-5;

#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    NotTransitioning,
    Transitioning,
    /// Blending from the pose captured when the previous transition was interrupted.
    InterruptedTransitioning,
}

/// Playback position of one state during a tick.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct StateSample {
    pub state: usize,
    /// Unwrapped normalized time after this tick.
    pub normalized_time: f32,
    /// Unwrapped normalized time before this tick.
    pub previous_time: f32,
    /// Length of the state's motion in seconds.
    pub duration: f32,
}

#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct StateMachineOutput {
    /// Source of the blend. Meaningless when `interrupted_source` is set.
    pub current: StateSample,
    pub next: Option<StateSample>,
    pub blend_factor: f32,
    /// The source of the blend is the snapshot taken at the last interruption.
    pub interrupted_source: bool,
    pub fired: Option<TransitionId>,
    /// A transition was interrupted this tick. The layer must snapshot its last blended pose
    /// before sampling.
    pub interrupted: bool,
    pub committed: bool,
    /// False for a machine with no states, which contributes nothing.
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ActiveTransition {
    id: TransitionId,
    source: usize,
    destination: usize,
    /// Seconds.
    length: f32,
    elapsed: f32,
    interruption_source: InterruptionSource,
}

impl ActiveTransition {
    fn progress(&self) -> f32 {
        if self.length <= 0. {
            1.
        } else {
            self.elapsed / self.length
        }
    }

    fn interruptible(&self) -> bool {
        self.id != TransitionId::Explicit && self.interruption_source != InterruptionSource::None
    }
}

/// Transition about to start, from an authored transition or an explicit request.
struct PendingTransition {
    id: TransitionId,
    destination: usize,
    duration: f32,
    fixed_duration: bool,
    offset: f32,
    transition_time: f32,
    interruption_source: InterruptionSource,
}

impl PendingTransition {
    fn authored(id: TransitionId, transition: &Transition) -> Self {
        Self {
            id,
            destination: transition.destination,
            duration: transition.duration,
            fixed_duration: transition.fixed_duration,
            offset: transition.offset,
            transition_time: 0.,
            interruption_source: transition.interruption_source,
        }
    }
}

/// Per-character playback state of a [`StateMachine`].
#[derive(Debug, Clone)]
pub struct StateMachineInstance {
    machine: Arc<StateMachine>,
    phase: Phase,
    current: StateSample,
    next: Option<StateSample>,
    transition: Option<ActiveTransition>,
}

impl StateMachineInstance {
    pub fn new(machine: Arc<StateMachine>) -> Self {
        let mut instance = Self {
            machine,
            phase: Phase::NotTransitioning,
            current: StateSample::default(),
            next: None,
            transition: None,
        };
        instance.reset();
        instance
    }

    /// Returns to the default state at time zero.
    pub fn reset(&mut self) {
        self.phase = Phase::NotTransitioning;
        self.current = StateSample {
            state: self.machine.default_state(),
            ..Default::default()
        };
        self.next = None;
        self.transition = None;
    }

    pub fn machine(&self) -> &Arc<StateMachine> {
        &self.machine
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_state(&self) -> usize {
        self.current.state
    }

    pub fn next_state(&self) -> Option<usize> {
        self.next.map(|next| next.state)
    }

    pub fn current_normalized_time(&self) -> f32 {
        self.current.normalized_time
    }

    pub fn next_normalized_time(&self) -> Option<f32> {
        self.next.map(|next| next.normalized_time)
    }

    pub fn transition_progress(&self) -> Option<f32> {
        self.transition
            .map(|transition| transition.progress().clamp(0., 1.))
    }

    /// Advances the machine by `dt` seconds.
    ///
    /// `durations` returns the length in seconds of a state's motion under the current
    /// parameters; it is only called for states that have a motion. Triggers consumed by the
    /// fired transition are reset in `parameters`.
    pub fn evaluate<F>(
        &mut self,
        dt: f32,
        parameters: &mut ParameterSet,
        request: Option<StateRequest>,
        mut durations: F,
    ) -> StateMachineOutput
    where
        F: FnMut(usize) -> f32,
    {
        if self.machine.is_empty() {
            return StateMachineOutput::default();
        }
        let machine = self.machine.clone();

        self.current = advance(&machine, self.current, dt, parameters, &mut durations);
        if let Some(next) = self.next {
            self.next = Some(advance(&machine, next, dt, parameters, &mut durations));
        }
        if let Some(transition) = &mut self.transition {
            transition.elapsed += dt;
        }
        let mut committed = self.try_commit();

        let pending = match request {
            Some(request) => self.explicit(&machine, request),
            None => self
                .find_transition(&machine, parameters)
                .and_then(|id| Some(PendingTransition::authored(id, machine.transition(id)?))),
        };

        let mut fired = None;
        let mut interrupted = false;
        if let Some(pending) = pending {
            machine.consume_triggers(pending.id, parameters);
            interrupted = self.transition.is_some();
            fired = Some(pending.id);
            self.start(&machine, pending, dt, parameters, &mut durations);
            committed |= self.try_commit();
        }

        StateMachineOutput {
            current: self.current,
            next: self.next,
            blend_factor: self
                .transition
                .map_or(1., |transition| transition.progress().clamp(0., 1.)),
            interrupted_source: self.phase == Phase::InterruptedTransitioning,
            fired,
            interrupted,
            committed,
            active: true,
        }
    }

    fn explicit(&self, machine: &StateMachine, request: StateRequest) -> Option<PendingTransition> {
        if request.state >= machine.states().len() {
            warn!(
                "Ignoring request for state {} of {:?}: out of range",
                request.state,
                machine.name()
            );
            return None;
        }
        Some(PendingTransition {
            id: TransitionId::Explicit,
            destination: request.state,
            duration: request.transition_duration,
            fixed_duration: request.fixed_duration,
            offset: request.normalized_time,
            transition_time: request.transition_time,
            interruption_source: InterruptionSource::None,
        })
    }

    fn find_transition(&self, machine: &StateMachine, parameters: &ParameterSet) -> Option<TransitionId> {
        let (searched, active_destination) = match &self.transition {
            None => ([Some(self.current.state), None], None),
            Some(transition) if transition.interruptible() => (
                transition
                    .interruption_source
                    .states(transition.source, transition.destination),
                Some(transition.destination),
            ),
            Some(_) => return None,
        };
        let dominant = self.next.unwrap_or(self.current);
        let times = |state: usize| -> (f32, f32) {
            let sample = if state == self.current.state {
                self.current
            } else {
                dominant
            };
            (sample.previous_time, sample.normalized_time)
        };
        let allowed = |transition: &Transition, owner: usize| {
            Some(transition.destination) != active_destination
                && (transition.destination != owner || transition.can_transition_to_self)
        };

        let (previous, time) = times(dominant.state);
        for (index, transition) in machine.any_state().iter().enumerate() {
            if allowed(transition, dominant.state)
                && transition.conditions_hold(parameters, previous, time)
            {
                return Some(TransitionId::AnyState(index));
            }
        }

        for state in searched.into_iter().flatten() {
            let (previous, time) = times(state);
            let transitions = machine
                .state(state)
                .map_or(&[][..], |state| state.transitions.as_slice());
            for (index, transition) in transitions.iter().enumerate() {
                if allowed(transition, state) && transition.conditions_hold(parameters, previous, time)
                {
                    return Some(TransitionId::Authored { state, index });
                }
            }
        }
        None
    }

    fn start<F>(
        &mut self,
        machine: &StateMachine,
        pending: PendingTransition,
        dt: f32,
        parameters: &ParameterSet,
        durations: &mut F,
    ) where
        F: FnMut(usize) -> f32,
    {
        self.phase = match self.transition {
            Some(_) => {
                if let Some(next) = self.next.take() {
                    self.current = next;
                }
                Phase::InterruptedTransitioning
            }
            None => Phase::Transitioning,
        };

        let length = if pending.fixed_duration {
            pending.duration
        } else {
            pending.duration * self.current.duration
        };
        let entry = StateSample {
            state: pending.destination,
            normalized_time: pending.offset,
            previous_time: pending.offset,
            duration: 0.,
        };
        self.next = Some(advance(machine, entry, dt, parameters, durations));
        self.transition = Some(ActiveTransition {
            id: pending.id,
            source: self.current.state,
            destination: pending.destination,
            length,
            elapsed: pending.transition_time * length.max(0.) + dt,
            interruption_source: pending.interruption_source,
        });
        trace!(
            "{:?}: {:?} fired, {} -> {}",
            machine.name(),
            pending.id,
            self.current.state,
            pending.destination
        );
    }

    fn try_commit(&mut self) -> bool {
        let Some(transition) = self.transition else {
            return false;
        };
        if transition.progress() < COMMIT_THRESHOLD {
            return false;
        }
        if let Some(next) = self.next.take() {
            self.current = next;
        }
        self.transition = None;
        self.phase = Phase::NotTransitioning;
        true
    }
}

fn state_length<F>(state: &State, index: usize, durations: &mut F) -> f32
where
    F: FnMut(usize) -> f32,
{
    if !state.has_motion() {
        return 1.;
    }
    let length = durations(index);
    if length > 0. { length } else { 1. }
}

fn advance<F>(
    machine: &StateMachine,
    mut sample: StateSample,
    dt: f32,
    parameters: &ParameterSet,
    durations: &mut F,
) -> StateSample
where
    F: FnMut(usize) -> f32,
{
    let Some(state) = machine.state(sample.state) else {
        return sample;
    };
    sample.duration = state_length(state, sample.state, durations);
    sample.previous_time = sample.normalized_time;
    sample.normalized_time += dt * state.effective_speed(parameters) / sample.duration;
    sample
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        parameters::{ParameterTable, ParameterValue},
        state_machine::{Condition, Motion},
    };

    const WALK: usize = 0;
    const RUN: usize = 1;
    const JUMP: usize = 2;
    const GO: usize = 0;
    const LEAP: usize = 1;

    fn parameters() -> ParameterSet {
        ParameterSet::new(Arc::new(
            ParameterTable::new()
                .with("go", ParameterValue::Bool(false))
                .with("leap", ParameterValue::Trigger(false)),
        ))
    }

    fn instance(states: Vec<State>, any_state: Vec<Transition>) -> StateMachineInstance {
        StateMachineInstance::new(Arc::new(
            StateMachine::new("base", states, any_state, 0).unwrap(),
        ))
    }

    fn one_second(_: usize) -> f32 {
        1.
    }

    #[test]
    fn test_exit_time_fires_on_crossing_tick() {
        let mut instance = instance(
            vec![
                State::new("walk", Motion::Clip(0)).with_transition(
                    Transition::to(RUN)
                        .with_duration(0.5, true)
                        .with_condition(Condition::ExitTime(0.75)),
                ),
                State::new("run", Motion::Clip(1)),
            ],
            vec![],
        );
        let mut parameters = parameters();
        for _ in 0..2 {
            let output = instance.evaluate(0.25, &mut parameters, None, one_second);
            assert_eq!(output.fired, None);
        }
        let output = instance.evaluate(0.25, &mut parameters, None, one_second);
        assert_eq!(
            output.fired,
            Some(TransitionId::Authored { state: WALK, index: 0 })
        );
        assert_eq!(instance.phase(), Phase::Transitioning);
        assert!((output.blend_factor - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_exit_time_fires_when_playing_backwards() {
        let mut walk = State::new("walk", Motion::Clip(0)).with_transition(
            Transition::to(RUN)
                .with_duration(0.5, true)
                .with_condition(Condition::ExitTime(0.6)),
        );
        walk.speed = -1.;
        let mut instance = instance(vec![walk, State::new("run", Motion::Clip(1))], vec![]);
        let mut parameters = parameters();

        let output = instance.evaluate(0.25, &mut parameters, None, one_second);
        assert_eq!(output.fired, None);
        let output = instance.evaluate(0.25, &mut parameters, None, one_second);
        assert_eq!(
            output.fired,
            Some(TransitionId::Authored { state: WALK, index: 0 })
        );
    }

    #[test]
    fn test_zero_duration_commits_in_same_tick() {
        let mut instance = instance(
            vec![
                State::new("walk", Motion::Clip(0))
                    .with_transition(Transition::to(RUN).with_condition(Condition::If(GO))),
                State::new("run", Motion::Clip(1)),
            ],
            vec![],
        );
        let mut parameters = parameters();
        parameters.set(GO, ParameterValue::Bool(true)).unwrap();

        let output = instance.evaluate(0.1, &mut parameters, None, one_second);
        assert!(output.committed);
        assert_eq!(output.next, None);
        assert_eq!(output.current.state, RUN);
        assert_eq!(output.blend_factor, 1.);
        assert!((instance.current_normalized_time() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_blend_factor_sequence() {
        let mut instance = instance(
            vec![
                State::new("idle", Motion::Clip(0)).with_transition(
                    Transition::to(RUN)
                        .with_duration(0.2, true)
                        .with_offset(0.3)
                        .with_condition(Condition::If(GO)),
                ),
                State::new("walk", Motion::Clip(1)),
            ],
            vec![],
        );
        let mut parameters = parameters();
        parameters.set(GO, ParameterValue::Bool(true)).unwrap();

        let factors: Vec<f32> = (0..4)
            .map(|_| {
                instance
                    .evaluate(0.05, &mut parameters, None, one_second)
                    .blend_factor
            })
            .collect();
        for (factor, expected) in factors.iter().zip([0.25, 0.5, 0.75, 1.]) {
            assert!((factor - expected).abs() < 1e-4, "{factors:?}");
        }
        assert_eq!(instance.phase(), Phase::NotTransitioning);
        assert_eq!(instance.current_state(), RUN);
        assert!((instance.current_normalized_time() - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_normalized_duration_scales_with_source() {
        let mut instance = instance(
            vec![
                State::new("idle", Motion::Clip(0)).with_transition(
                    Transition::to(RUN)
                        .with_duration(0.5, false)
                        .with_condition(Condition::If(GO)),
                ),
                State::new("walk", Motion::Clip(1)),
            ],
            vec![],
        );
        let mut parameters = parameters();
        parameters.set(GO, ParameterValue::Bool(true)).unwrap();
        let output = instance.evaluate(0.25, &mut parameters, None, |state| [2., 1.][state]);
        // Half of a two second source.
        assert!((output.blend_factor - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_interruption_from_destination() {
        let mut instance = instance(
            vec![
                State::new("walk", Motion::Clip(0)).with_transition(
                    Transition::to(RUN)
                        .with_duration(1., true)
                        .with_condition(Condition::If(GO))
                        .with_interruption(InterruptionSource::Destination),
                ),
                State::new("run", Motion::Clip(1)).with_transition(
                    Transition::to(JUMP)
                        .with_duration(1., true)
                        .with_condition(Condition::If(LEAP)),
                ),
                State::new("jump", Motion::Clip(2)),
            ],
            vec![],
        );
        let mut parameters = parameters();
        parameters.set(GO, ParameterValue::Bool(true)).unwrap();
        instance.evaluate(0.25, &mut parameters, None, one_second);
        assert_eq!(instance.next_state(), Some(RUN));

        parameters.set(LEAP, ParameterValue::Trigger(true)).unwrap();
        let output = instance.evaluate(0.25, &mut parameters, None, one_second);
        assert!(output.interrupted);
        assert!(output.interrupted_source);
        assert_eq!(output.current.state, RUN);
        assert_eq!(output.next.map(|next| next.state), Some(JUMP));
        assert_eq!(instance.phase(), Phase::InterruptedTransitioning);
        assert!((output.blend_factor - 0.25).abs() < 1e-6);
        assert_eq!(parameters.get(LEAP), Some(ParameterValue::Trigger(false)));
    }

    #[test]
    fn test_atomic_transition_is_not_interrupted() {
        let mut instance = instance(
            vec![
                State::new("walk", Motion::Clip(0)).with_transition(
                    Transition::to(RUN)
                        .with_duration(1., true)
                        .with_condition(Condition::If(GO)),
                ),
                State::new("run", Motion::Clip(1)),
                State::new("jump", Motion::Clip(2)),
            ],
            vec![Transition::to(JUMP).with_condition(Condition::If(LEAP))],
        );
        let mut parameters = parameters();
        parameters.set(GO, ParameterValue::Bool(true)).unwrap();
        instance.evaluate(0.25, &mut parameters, None, one_second);

        parameters.set(LEAP, ParameterValue::Trigger(true)).unwrap();
        let output = instance.evaluate(0.25, &mut parameters, None, one_second);
        assert_eq!(output.fired, None);
        assert_eq!(output.next.map(|next| next.state), Some(RUN));
        assert_eq!(parameters.get(LEAP), Some(ParameterValue::Trigger(true)));
    }

    #[test]
    fn test_any_state_has_priority() {
        let mut instance = instance(
            vec![
                State::new("walk", Motion::Clip(0))
                    .with_transition(Transition::to(RUN).with_condition(Condition::If(GO))),
                State::new("run", Motion::Clip(1)),
                State::new("jump", Motion::Clip(2)),
            ],
            vec![Transition::to(JUMP).with_condition(Condition::If(GO))],
        );
        let mut parameters = parameters();
        parameters.set(GO, ParameterValue::Bool(true)).unwrap();
        let output = instance.evaluate(0.1, &mut parameters, None, one_second);
        assert_eq!(output.fired, Some(TransitionId::AnyState(0)));
        assert_eq!(instance.current_state(), JUMP);

        // Jumping to itself is not allowed.
        let output = instance.evaluate(0.1, &mut parameters, None, one_second);
        assert_eq!(output.fired, None);
    }

    #[test]
    fn test_explicit_request_interrupts_atomic_transition() {
        let mut instance = instance(
            vec![
                State::new("walk", Motion::Clip(0)).with_transition(
                    Transition::to(RUN)
                        .with_duration(1., true)
                        .with_condition(Condition::If(GO)),
                ),
                State::new("run", Motion::Clip(1)),
                State::new("jump", Motion::None),
            ],
            vec![],
        );
        let mut parameters = parameters();
        parameters.set(GO, ParameterValue::Bool(true)).unwrap();
        instance.evaluate(0.25, &mut parameters, None, one_second);

        let request = StateRequest {
            state: JUMP,
            normalized_time: 0.5,
            transition_duration: 0.,
            fixed_duration: true,
            transition_time: 0.,
        };
        let output = instance.evaluate(0.25, &mut parameters, Some(request), one_second);
        assert_eq!(output.fired, Some(TransitionId::Explicit));
        assert!(output.interrupted);
        assert!(output.committed);
        assert_eq!(instance.current_state(), JUMP);
        // Motionless states advance as if they lasted one second.
        assert!((instance.current_normalized_time() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_empty_machine_is_inactive() {
        let mut instance = instance(vec![], vec![]);
        let output = instance.evaluate(0.1, &mut parameters(), None, one_second);
        assert!(!output.active);
        assert_eq!(output.blend_factor, 0.);
    }
}
