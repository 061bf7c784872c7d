use bevy::reflect::Reflect;
use serde::{Deserialize, Serialize};

use crate::parameters::ParameterSet;

/// Slack for float drift when comparing accumulated normalized times.
pub const TIME_EPSILON: f32 = 1e-5;

/// A single requirement of a transition. All conditions of a transition must hold for it to fire.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// Bool parameter is set, or trigger parameter is pending.
    If(usize),
    IfNot(usize),
    Greater(usize, f32),
    Less(usize, f32),
    Equals(usize, f32),
    NotEqual(usize, f32),
    /// The owning state's normalized time crosses this value.
    ExitTime(f32),
}

impl Condition {
    pub fn parameter(&self) -> Option<usize> {
        match *self {
            Self::If(index)
            | Self::IfNot(index)
            | Self::Greater(index, _)
            | Self::Less(index, _)
            | Self::Equals(index, _)
            | Self::NotEqual(index, _) => Some(index),
            Self::ExitTime(_) => None,
        }
    }

    /// Whether the condition holds, given the owning state's normalized time before and after
    /// this tick.
    pub fn check(&self, parameters: &ParameterSet, previous_time: f32, time: f32) -> bool {
        match *self {
            Self::If(index) => parameters.as_bool(index),
            Self::IfNot(index) => !parameters.as_bool(index),
            Self::Greater(index, threshold) => parameters.as_f32(index) > threshold,
            Self::Less(index, threshold) => parameters.as_f32(index) < threshold,
            Self::Equals(index, value) => parameters.as_f32(index) == value,
            Self::NotEqual(index, value) => parameters.as_f32(index) != value,
            Self::ExitTime(exit_time) => exit_time_reached(exit_time, previous_time, time),
        }
    }
}

/// Whether normalized time moving from `previous` to `time` crosses `exit_time`.
///
/// Exit times below one repeat every cycle: both the crossing in the cycle `previous` is in and
/// in the neighboring cycle the time is heading to are tested. Exit times of one or more are
/// tested once. Time running backwards, as in states with a negative speed, crosses the same
/// points in the other direction.
pub fn exit_time_reached(exit_time: f32, previous: f32, time: f32) -> bool {
    let crosses = |candidate: f32| {
        if time >= previous {
            previous < candidate && candidate <= time + TIME_EPSILON
        } else {
            time - TIME_EPSILON <= candidate && candidate < previous
        }
    };
    if exit_time >= 1. {
        return crosses(exit_time);
    }
    let cycle = previous.floor();
    let neighbor = if time >= previous { cycle + 1. } else { cycle - 1. };
    crosses(cycle + exit_time) || crosses(neighbor + exit_time)
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::parameters::{ParameterTable, ParameterValue};

    #[test]
    fn test_exit_time_within_cycle() {
        assert!(!exit_time_reached(0.75, 0.5, 0.7));
        assert!(exit_time_reached(0.75, 0.7, 0.8));
        assert!(!exit_time_reached(0.75, 0.75, 0.9));
    }

    #[test]
    fn test_exit_time_after_wrap() {
        assert!(exit_time_reached(0.1, 0.9, 1.2));
        assert!(exit_time_reached(0.1, 2.95, 3.15));
        assert!(!exit_time_reached(0.1, 0.9, 1.05));
    }

    #[test]
    fn test_exit_time_above_one_is_tested_once() {
        assert!(exit_time_reached(1.5, 1.2, 1.6));
        assert!(!exit_time_reached(1.5, 2.2, 2.6));
    }

    #[test]
    fn test_exit_time_backwards() {
        assert!(exit_time_reached(0.25, 0.5, 0.2));
        assert!(!exit_time_reached(0.25, 0.2, 0.1));
        assert!(!exit_time_reached(0.25, 0.25, 0.1));
        assert!(exit_time_reached(0.75, 0.1, -0.3));
        assert!(exit_time_reached(1.5, 1.6, 1.4));
        assert!(!exit_time_reached(1.5, 2.6, 2.4));
    }

    #[test]
    fn test_parameter_conditions() {
        let table = Arc::new(
            ParameterTable::new()
                .with("speed", ParameterValue::Float(0.6))
                .with("jump", ParameterValue::Trigger(true))
                .with("grounded", ParameterValue::Bool(false))
                .with("combo", ParameterValue::Int(2)),
        );
        let parameters = ParameterSet::new(table);
        assert!(Condition::Greater(0, 0.5).check(&parameters, 0., 0.));
        assert!(!Condition::Less(0, 0.5).check(&parameters, 0., 0.));
        assert!(Condition::If(1).check(&parameters, 0., 0.));
        assert!(Condition::IfNot(2).check(&parameters, 0., 0.));
        assert!(Condition::Equals(3, 2.).check(&parameters, 0., 0.));
        assert!(!Condition::NotEqual(3, 2.).check(&parameters, 0., 0.));
        assert_eq!(Condition::ExitTime(0.5).parameter(), None);
    }
}
