use bevy::{reflect::Reflect, transform::components::Transform};

use crate::pose::algebra::{inverse_transform, lerp_transform};

/// Goal speed, in normalized units per second, under which a foot is held in place.
const LINEAR_THRESHOLD: f32 = 0.05;
/// Speed range over which the foot goes from held to following.
const LINEAR_RAMP: f32 = 0.3;
const ANGULAR_THRESHOLD: f32 = 0.5;
const ANGULAR_RAMP: f32 = 3.;
/// Time constant of the follow rate filter, in seconds.
const FILTER_TIME: f32 = 0.1;
/// A held foot still drifts toward its goal at this rate.
const MIN_FOLLOW: f32 = 0.05;

/// Last stabilized goal of one foot, in character space.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct FootMemory {
    pub transform: Transform,
    /// Filtered share of the new goal taken each tick.
    pub follow: f32,
    pub valid: bool,
}

impl Default for FootMemory {
    fn default() -> Self {
        Self {
            transform: Transform::IDENTITY,
            follow: 1.,
            valid: false,
        }
    }
}

impl FootMemory {
    /// Filters a foot goal against the previous one.
    ///
    /// The previous goal is carried through the tick's inverse root motion first, so that a
    /// foot planted in the world reads as still. `root_delta` and the goals are in character
    /// units; `scale` converts speeds back to normalized units.
    pub fn stabilize(
        &mut self,
        goal: &Transform,
        root_delta: &Transform,
        dt: f32,
        scale: f32,
    ) -> Transform {
        if !self.valid || dt <= 0. || scale <= 0. {
            self.store(goal);
            return *goal;
        }
        let previous = inverse_transform(root_delta) * self.transform;

        let linear_speed = previous.translation.distance(goal.translation) / (dt * scale);
        let angular_speed = previous.rotation.angle_between(goal.rotation) / dt;
        let rate = ramp(linear_speed, LINEAR_THRESHOLD, LINEAR_RAMP)
            .max(ramp(angular_speed, ANGULAR_THRESHOLD, ANGULAR_RAMP))
            .max(MIN_FOLLOW);
        let smoothing = 1. - (-dt / FILTER_TIME).exp();
        self.follow += (rate - self.follow) * smoothing;

        self.transform = lerp_transform(&previous, goal, self.follow);
        self.transform
    }

    /// Records an unfiltered goal.
    pub fn store(&mut self, goal: &Transform) {
        self.transform = *goal;
        self.follow = 1.;
        self.valid = true;
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }
}

fn ramp(speed: f32, threshold: f32, range: f32) -> f32 {
    ((speed - threshold) / range).clamp(0., 1.)
}
