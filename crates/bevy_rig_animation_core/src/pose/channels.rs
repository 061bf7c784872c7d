//! Flat float layout of a [`Pose`], as produced by clip samplers.
//!
//! | offset           | values                                  |
//! |------------------|-----------------------------------------|
//! | `ROOT`           | root translation (3), rotation xyzw (4) |
//! | `DOFS`           | body DoFs                               |
//! | `GOALS`          | per goal: translation (3), rotation (4) |
//! | `LEFT_HAND`      | left finger DoFs                        |
//! | `RIGHT_HAND`     | right finger DoFs                       |

use bevy::{
    math::{Quat, Vec3},
    transform::components::Transform,
};

use super::Pose;
use crate::humanoid::{BODY_DOF_COUNT, FINGER_DOF_COUNT, GOAL_COUNT};

pub const TRANSFORM_CHANNELS: usize = 7;
pub const ROOT: usize = 0;
pub const DOFS: usize = ROOT + TRANSFORM_CHANNELS;
pub const GOALS: usize = DOFS + BODY_DOF_COUNT;
pub const LEFT_HAND: usize = GOALS + GOAL_COUNT * TRANSFORM_CHANNELS;
pub const RIGHT_HAND: usize = LEFT_HAND + FINGER_DOF_COUNT;
pub const CHANNEL_COUNT: usize = RIGHT_HAND + FINGER_DOF_COUNT;

/// Offsets of every quaternion in the layout, for samplers that need to renormalize after
/// interpolating.
pub fn rotation_offsets() -> impl Iterator<Item = usize> {
    std::iter::once(ROOT + 3).chain((0..GOAL_COUNT).map(|goal| GOALS + goal * TRANSFORM_CHANNELS + 3))
}

fn read_transform(values: &[f32], offset: usize) -> Transform {
    let rotation = Quat::from_xyzw(
        values[offset + 3],
        values[offset + 4],
        values[offset + 5],
        values[offset + 6],
    );
    Transform {
        translation: Vec3::new(values[offset], values[offset + 1], values[offset + 2]),
        rotation: super::algebra::normalize_quat_or(rotation, Quat::IDENTITY),
        scale: Vec3::ONE,
    }
}

fn write_transform(transform: &Transform, values: &mut [f32], offset: usize) {
    values[offset..offset + 3].copy_from_slice(&transform.translation.to_array());
    values[offset + 3..offset + 7].copy_from_slice(&transform.rotation.to_array());
}

impl Pose {
    /// Reads a pose from a channel buffer. Buffers shorter than [`CHANNEL_COUNT`] leave the pose
    /// untouched.
    pub fn read_channels(&mut self, values: &[f32]) {
        if values.len() < CHANNEL_COUNT {
            return;
        }
        self.root = read_transform(values, ROOT);
        self.dofs.copy_from_slice(&values[DOFS..GOALS]);
        for (goal, transform) in self.goals.iter_mut().enumerate() {
            *transform = read_transform(values, GOALS + goal * TRANSFORM_CHANNELS);
        }
        self.left_hand
            .dofs
            .copy_from_slice(&values[LEFT_HAND..RIGHT_HAND]);
        self.right_hand
            .dofs
            .copy_from_slice(&values[RIGHT_HAND..CHANNEL_COUNT]);
    }

    pub fn write_channels(&self, values: &mut [f32]) {
        if values.len() < CHANNEL_COUNT {
            return;
        }
        write_transform(&self.root, values, ROOT);
        values[DOFS..GOALS].copy_from_slice(&self.dofs);
        for (goal, transform) in self.goals.iter().enumerate() {
            write_transform(transform, values, GOALS + goal * TRANSFORM_CHANNELS);
        }
        values[LEFT_HAND..RIGHT_HAND].copy_from_slice(&self.left_hand.dofs);
        values[RIGHT_HAND..CHANNEL_COUNT].copy_from_slice(&self.right_hand.dofs);
    }

    pub fn to_channels(&self) -> Vec<f32> {
        let mut values = vec![0.; CHANNEL_COUNT];
        self.write_channels(&mut values);
        values
    }
}
