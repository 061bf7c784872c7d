use std::sync::Arc;

use bevy::{
    math::{Quat, Vec3},
    reflect::Reflect,
    transform::components::Transform,
};

use super::LayerBlendMode;
use crate::{
    blend_tree::{BlendLeaf, BlendScratch, leaves_duration},
    clip::{ClipEntry, RootMotionMode},
    controller::AnimatorController,
    errors::{RigError, RigResult},
    interpolation::{DifferenceInterpolator, LinearInterpolator},
    mask::PoseMask,
    parameters::ParameterSet,
    pose::{
        Pose,
        algebra::{
            ZERO_QUAT, accumulate_quat, inverse_transform, lerp_transform, motion_between,
            normalize_quat_or, project_to_ground,
        },
    },
    state_machine::{
        Motion, State, StateMachine, StateMachineInstance, StateMachineOutput, StateRequest,
        StateSample,
    },
    symmetry::SymmetryMode,
};

/// Pose produced by sampling a state, a transition or a whole layer.
#[derive(Reflect, Debug, Clone, PartialEq)]
pub struct StatePose {
    pub pose: Pose,
    /// Fields some clip actually wrote.
    pub written: PoseMask,
    /// Root motion of the tick, in normalized units.
    pub delta: Transform,
    pub gravity_weight: f32,
    /// How strongly limb goals of the pose should drive foot IK.
    pub foot_ik: f32,
    pub has_motion: bool,
}

impl Default for StatePose {
    fn default() -> Self {
        Self {
            pose: Pose::default(),
            written: PoseMask::NONE,
            delta: Transform::IDENTITY,
            gravity_weight: 0.,
            foot_ik: 0.,
            has_motion: false,
        }
    }
}

impl StatePose {
    /// Copies `other` into this pose without reallocating.
    pub fn copy_from(&mut self, other: &StatePose) {
        self.pose.copy_masked(&other.pose, &PoseMask::ALL);
        self.written = other.written;
        self.delta = other.delta;
        self.gravity_weight = other.gravity_weight;
        self.foot_ik = other.foot_ik;
        self.has_motion = other.has_motion;
    }
}

/// Scratch buffers used while sampling clips.
#[derive(Debug, Clone, Default)]
struct Sampler {
    blend: BlendScratch,
    leaves: Vec<BlendLeaf>,
    values: Vec<f32>,
    channels: Vec<f32>,
    neutral: Pose,
    leaf: Pose,
    reference: Pose,
    ground_sample: Pose,
}

impl Sampler {
    fn collect_leaves(&mut self, motion: Motion, controller: &AnimatorController) {
        self.leaves.clear();
        match motion {
            Motion::None => {}
            Motion::Clip(clip) => self.leaves.push(BlendLeaf {
                clip,
                weight: 1.,
                time_scale: 1.,
                cycle_offset: 0.,
                mirror: false,
                reverse: false,
            }),
            Motion::BlendTree(tree) => {
                if let Some(tree) = controller.blend_trees().get(tree) {
                    tree.evaluate(&self.values, &mut self.blend, &mut self.leaves);
                }
            }
        }
    }

    fn state_duration(&mut self, state: &State, controller: &AnimatorController) -> f32 {
        self.collect_leaves(state.motion, controller);
        leaves_duration(&self.leaves, controller.clips())
    }

    /// Ground projection of the clip's root at `time` seconds.
    fn ground(&mut self, entry: &ClipEntry, time: f32, mirror: bool) -> Transform {
        entry.sample(time, &mut self.channels, &mut self.ground_sample);
        let root = if mirror {
            SymmetryMode::MirrorX.apply_transform(&self.ground_sample.root)
        } else {
            self.ground_sample.root
        };
        project_to_ground(&root)
    }

    /// Root motion of a leaf moving from `previous` to `time` in normalized time. Every wrap of a
    /// looping clip adds the motion of a whole cycle.
    fn root_motion(&mut self, entry: &ClipEntry, previous: f32, time: f32, mirror: bool) -> Transform {
        let from = self.ground(entry, entry.time_at(previous), mirror);
        let to = self.ground(entry, entry.time_at(time), mirror);
        let (first_cycle, last_cycle) = (previous.floor(), time.floor());
        if !entry.settings.looping || first_cycle == last_cycle {
            return motion_between(&from, &to);
        }

        let start = self.ground(entry, 0., mirror);
        let end = self.ground(entry, entry.duration(), mirror);
        let cycle = motion_between(&start, &end);
        let (head, step, tail) = if last_cycle > first_cycle {
            (motion_between(&from, &end), cycle, motion_between(&start, &to))
        } else {
            (
                motion_between(&from, &start),
                inverse_transform(&cycle),
                motion_between(&end, &to),
            )
        };
        let wraps = (last_cycle - first_cycle).abs() as usize;
        let mut motion = head;
        for _ in 1..wraps {
            motion = motion * step;
        }
        motion * tail
    }

    fn sample_state(
        &mut self,
        controller: &AnimatorController,
        state: &State,
        sample: &StateSample,
        state_mirror: bool,
        additive: bool,
        out: &mut StatePose,
    ) {
        self.collect_leaves(state.motion, controller);
        out.pose.clear_accumulator();
        out.written = PoseMask::NONE;
        out.has_motion = state.has_motion();
        out.foot_ik = if state.foot_ik { 1. } else { 0. };

        let mut total_weight = 0.;
        let mut gravity_weight = 0.;
        let mut translation = Vec3::ZERO;
        let mut rotation = ZERO_QUAT;

        for index in 0..self.leaves.len() {
            let leaf = self.leaves[index];
            let Some(entry) = controller.clips().get(leaf.clip) else {
                continue;
            };
            let mirror = leaf.mirror != state_mirror;
            let offset = state.cycle_offset + leaf.cycle_offset;
            let (mut previous, mut time) =
                (sample.previous_time + offset, sample.normalized_time + offset);
            if leaf.reverse {
                previous = 1. - previous;
                time = 1. - time;
            }

            self.leaf.copy_masked(&self.neutral, &PoseMask::ALL);
            entry.sample(entry.time_at(time), &mut self.channels, &mut self.leaf);
            let mut written = entry.clip.written();
            if mirror {
                self.leaf.mirror();
                written = written.mirrored();
            }

            let mut motion = Transform::IDENTITY;
            if additive {
                self.reference.copy_masked(&self.neutral, &PoseMask::ALL);
                entry.sample(
                    entry.settings.additive_reference_time,
                    &mut self.channels,
                    &mut self.reference,
                );
                if mirror {
                    self.reference.mirror();
                }
                DifferenceInterpolator { mask: written }
                    .interpolate_pose(&mut self.reference, &self.leaf);
                std::mem::swap(&mut self.leaf, &mut self.reference);
            } else if written.root && entry.settings.root_motion == RootMotionMode::Extract {
                motion = self.root_motion(entry, previous, time, mirror);
                let ground = project_to_ground(&self.leaf.root);
                self.leaf.root = inverse_transform(&ground) * self.leaf.root;
            }

            out.pose.accumulate(&self.leaf, leaf.weight);
            out.written = out.written.union(&written);
            translation += motion.translation * leaf.weight;
            accumulate_quat(&mut rotation, motion.rotation, leaf.weight);
            gravity_weight += entry.settings.gravity_weight * leaf.weight;
            total_weight += leaf.weight;
        }

        out.pose.finish_accumulation(total_weight);
        if total_weight > 0. {
            out.delta = Transform {
                translation: translation / total_weight,
                rotation: normalize_quat_or(rotation, Quat::IDENTITY),
                scale: Vec3::ONE,
            };
            out.gravity_weight = gravity_weight / total_weight;
        } else {
            out.delta = Transform::IDENTITY;
            out.gravity_weight = 0.;
        }
    }
}

/// Per-character evaluation of one layer: its state machine instance plus the buffers the
/// sampled poses live in.
#[derive(Debug, Clone)]
pub struct MotionLayer {
    index: usize,
    mode: LayerBlendMode,
    instance: StateMachineInstance,
    sampler: Sampler,
    output: StatePose,
    next: StatePose,
    snapshot: StatePose,
    motion_factor: f32,
    last: StateMachineOutput,
}

impl MotionLayer {
    pub fn new(index: usize, controller: &AnimatorController) -> RigResult<Self> {
        let definition = controller
            .layers()
            .get(index)
            .ok_or(RigError::InvalidLayer(index))?;
        let machine: Arc<StateMachine> = controller
            .state_machines()
            .get(definition.state_machine)
            .cloned()
            .ok_or(RigError::InvalidLayer(index))?;
        Ok(Self {
            index,
            mode: definition.mode,
            instance: StateMachineInstance::new(machine),
            sampler: Sampler {
                values: Vec::with_capacity(controller.parameters().len()),
                ..Default::default()
            },
            output: StatePose::default(),
            next: StatePose::default(),
            snapshot: StatePose::default(),
            motion_factor: 0.,
            last: StateMachineOutput::default(),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn instance(&self) -> &StateMachineInstance {
        &self.instance
    }

    /// Layer pose of the last tick.
    pub fn output(&self) -> &StatePose {
        &self.output
    }

    /// State machine events and blend factor of the last tick.
    pub fn state_machine_output(&self) -> &StateMachineOutput {
        &self.last
    }

    /// Zero when the layer plays nothing, one when it plays motion, and a ramp through the blend
    /// factor while transitioning between motion and no motion.
    pub fn motion_factor(&self) -> f32 {
        self.motion_factor
    }

    /// Returns the state machine to its default state and forgets every sampled pose, including
    /// the interruption snapshot.
    pub fn reset(&mut self) {
        self.instance.reset();
        for pose in [&mut self.output, &mut self.next, &mut self.snapshot] {
            *pose = StatePose::default();
        }
        self.motion_factor = 0.;
        self.last = StateMachineOutput::default();
    }

    pub fn evaluate(
        &mut self,
        dt: f32,
        controller: &AnimatorController,
        parameters: &mut ParameterSet,
        request: Option<StateRequest>,
    ) -> &StatePose {
        self.sampler.values.clear();
        self.sampler.values.extend_from_slice(parameters.floats());
        let machine = self.instance.machine().clone();
        let sampler = &mut self.sampler;
        let output = self.instance.evaluate(dt, parameters, request, |state| {
            machine
                .state(state)
                .map_or(0., |state| sampler.state_duration(state, controller))
        });
        self.last = output;

        if !output.active {
            self.output.written = PoseMask::NONE;
            self.output.delta = Transform::IDENTITY;
            self.motion_factor = 0.;
            return &self.output;
        }
        if output.interrupted {
            self.snapshot.copy_from(&self.output);
        }

        let additive = self.mode == LayerBlendMode::Additive;
        let parameters = &*parameters;
        if output.interrupted_source {
            self.output.copy_from(&self.snapshot);
            self.output.delta = Transform::IDENTITY;
            self.output.has_motion = true;
        } else if let Some(state) = machine.state(output.current.state) {
            self.sampler.sample_state(
                controller,
                state,
                &output.current,
                state.effective_mirror(parameters),
                additive,
                &mut self.output,
            );
        }

        let Some(next) = output.next else {
            self.motion_factor = if self.output.has_motion { 1. } else { 0. };
            return &self.output;
        };
        if let Some(state) = machine.state(next.state) {
            self.sampler.sample_state(
                controller,
                state,
                &next,
                state.effective_mirror(parameters),
                additive,
                &mut self.next,
            );
        }

        let factor = output.blend_factor;
        let source_motion = if self.output.has_motion { 1. } else { 0. };
        let destination_motion = if self.next.has_motion { 1. } else { 0. };
        self.motion_factor = source_motion + (destination_motion - source_motion) * factor;

        LinearInterpolator::interpolate_written(
            &mut self.output.pose,
            &mut self.output.written,
            &self.next.pose,
            &self.next.written,
            factor,
        );
        self.output.delta = lerp_transform(&self.output.delta, &self.next.delta, factor);
        self.output.gravity_weight +=
            (self.next.gravity_weight - self.output.gravity_weight) * factor;
        self.output.foot_ik += (self.next.foot_ik - self.output.foot_ik) * factor;
        self.output.has_motion |= self.next.has_motion;
        &self.output
    }
}
