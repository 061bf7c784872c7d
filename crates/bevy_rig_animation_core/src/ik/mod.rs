//! Inverse kinematics run after retargeting: limb goals, foot stabilization, look-at and twist
//! distribution, in that order.

mod foot_stabilizer;
mod look_at;
mod twist;
mod two_bone;

use bevy::{
    math::{Quat, Vec3},
    reflect::Reflect,
    transform::components::Transform,
};

pub use foot_stabilizer::FootMemory;
pub use look_at::solve_look_at;
pub use twist::{distribute_twist, twist_angle};
pub use two_bone::{TwoBoneChain, blend_end_rotation, soft_stretch, solve_two_bone};

use crate::{
    humanoid::{GOAL_COUNT, Goal, HumanoidMap},
    pose::{Pose, SkeletonPose},
};

/// A limb goal set at runtime, in the character's space.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct GoalTarget {
    pub position: Vec3,
    /// Character-space rotation of the end joint.
    pub rotation: Quat,
    pub position_weight: f32,
    pub rotation_weight: f32,
}

impl GoalTarget {
    pub fn position(position: Vec3, weight: f32) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            position_weight: weight,
            rotation_weight: 0.,
        }
    }

    pub fn with_rotation(mut self, rotation: Quat, weight: f32) -> Self {
        self.rotation = rotation;
        self.rotation_weight = weight;
        self
    }
}

#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct LookAtTarget {
    /// Point to look at, in the character's space.
    pub position: Vec3,
    pub weight: f32,
    pub body_weight: f32,
    pub head_weight: f32,
    pub eyes_weight: f32,
    /// 0 lets the gaze turn all the way around, 1 keeps it straight ahead.
    pub clamp_weight: f32,
}

impl Default for LookAtTarget {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            weight: 1.,
            body_weight: 0.,
            head_weight: 1.,
            eyes_weight: 0.,
            clamp_weight: 0.5,
        }
    }
}

/// Runtime IK inputs of one tick.
#[derive(Reflect, Debug, Clone, Default, PartialEq)]
pub struct IkTargets {
    pub goals: [Option<GoalTarget>; GOAL_COUNT],
    pub look_at: Option<LookAtTarget>,
    pub stabilize_feet: bool,
}

impl IkTargets {
    pub fn with_goal(mut self, goal: Goal, target: GoalTarget) -> Self {
        self.goals[goal.index()] = Some(target);
        self
    }

    pub fn with_look_at(mut self, target: LookAtTarget) -> Self {
        self.look_at = Some(target);
        self
    }
}

/// Goal actually solved for a limb, after merging the animated and runtime goals.
#[derive(Debug, Clone, Copy)]
struct LimbGoal {
    transform: Transform,
    position_weight: f32,
    rotation_weight: f32,
}

fn merge_goals(
    animated: Option<(Transform, f32)>,
    runtime: Option<GoalTarget>,
) -> Option<LimbGoal> {
    match (animated, runtime) {
        (None, None) => None,
        (Some((transform, weight)), None) => Some(LimbGoal {
            transform,
            position_weight: weight,
            rotation_weight: weight,
        }),
        (None, Some(target)) => Some(LimbGoal {
            transform: Transform::from_translation(target.position).with_rotation(target.rotation),
            position_weight: target.position_weight,
            rotation_weight: target.rotation_weight,
        }),
        (Some((transform, weight)), Some(target)) => Some(LimbGoal {
            transform: Transform::from_translation(
                transform.translation.lerp(target.position, target.position_weight),
            )
            .with_rotation(transform.rotation.slerp(target.rotation, target.rotation_weight)),
            position_weight: weight + (1. - weight) * target.position_weight,
            rotation_weight: weight + (1. - weight) * target.rotation_weight,
        }),
    }
}

/// Per-character IK memory: a globals buffer and the stabilized feet.
#[derive(Debug, Clone)]
pub struct IkSolver {
    globals: Vec<Transform>,
    feet: [FootMemory; 2],
}

impl IkSolver {
    pub fn new(map: &HumanoidMap) -> Self {
        Self {
            globals: Vec::with_capacity(map.skeleton().len()),
            feet: [FootMemory::default(); 2],
        }
    }

    pub fn feet(&self) -> [FootMemory; 2] {
        self.feet
    }

    pub fn reset(&mut self) {
        self.feet = [FootMemory::default(); 2];
    }

    /// Solves every IK pass on a retargeted skeleton pose.
    ///
    /// Feet follow the animated foot goals of `pose` by `foot_ik`; runtime goals of `targets`
    /// are blended over them. `root_delta` is the tick's root motion in character units.
    #[allow(clippy::too_many_arguments)]
    pub fn solve(
        &mut self,
        map: &HumanoidMap,
        pose: &Pose,
        foot_ik: f32,
        targets: &IkTargets,
        root_delta: &Transform,
        dt: f32,
        out: &mut SkeletonPose,
    ) {
        let skeleton = map.skeleton();
        skeleton.compute_globals(out, &mut self.globals);

        let mut goals = [None; GOAL_COUNT];
        for goal in Goal::ALL {
            let animated = if goal.is_foot() && foot_ik > 0. {
                map.goal_to_character(goal, pose.goal(goal))
                    .map(|transform| (transform, foot_ik.min(1.)))
            } else {
                None
            };
            goals[goal.index()] = merge_goals(animated, targets.goals[goal.index()]);
        }

        for (side, goal) in [Goal::LeftFoot, Goal::RightFoot].into_iter().enumerate() {
            let memory = &mut self.feet[side];
            match &mut goals[goal.index()] {
                Some(limb) if targets.stabilize_feet => {
                    limb.transform =
                        memory.stabilize(&limb.transform, root_delta, dt, map.scale());
                }
                Some(limb) => memory.store(&limb.transform),
                None => memory.invalidate(),
            }
        }

        let settings = map.settings();
        for goal in Goal::ALL {
            let Some(limb) = goals[goal.index()] else {
                continue;
            };
            let [top, mid, end] = goal.chain();
            let (Some(top), Some(mid), Some(end)) =
                (map.joint(top), map.joint(mid), map.joint(end))
            else {
                continue;
            };
            let (pole, stretch) = if goal.is_foot() {
                (Vec3::Z, settings.leg_stretch)
            } else {
                (Vec3::NEG_Z, settings.arm_stretch)
            };
            solve_two_bone(
                skeleton,
                out,
                &mut self.globals,
                TwoBoneChain {
                    top,
                    mid,
                    end,
                    pole,
                },
                limb.transform.translation,
                limb.position_weight,
                stretch,
            );
            blend_end_rotation(
                skeleton,
                out,
                &mut self.globals,
                end,
                limb.transform.rotation,
                limb.rotation_weight,
            );
        }

        if let Some(look_at) = &targets.look_at {
            solve_look_at(map, out, &mut self.globals, look_at);
        }
        distribute_twist(map, out, &mut self.globals);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::humanoid::{
        HumanBone, HumanoidSettings,
        reference::{reference_mapping, reference_skeleton},
    };

    fn map() -> HumanoidMap {
        HumanoidMap::new(
            reference_skeleton().unwrap(),
            &reference_mapping(),
            HumanoidSettings::default(),
        )
        .unwrap()
    }

    fn globals(map: &HumanoidMap, pose: &SkeletonPose) -> Vec<Transform> {
        let mut globals = vec![];
        map.skeleton().compute_globals(pose, &mut globals);
        globals
    }

    #[test]
    fn test_runtime_hand_goal() {
        let map = map();
        let mut solver = IkSolver::new(&map);
        let mut out = map.skeleton().rest_pose();
        let target = Vec3::new(0.4, 1.2, 0.3);
        solver.solve(
            &map,
            map.default_pose(),
            0.,
            &IkTargets::default().with_goal(Goal::LeftHand, GoalTarget::position(target, 1.)),
            &Transform::IDENTITY,
            1. / 60.,
            &mut out,
        );
        let hand = map.joint(HumanBone::LeftHand).unwrap();
        assert!(globals(&map, &out)[hand].translation.abs_diff_eq(target, 1e-3));
    }

    #[test]
    fn test_animated_foot_goal() {
        let map = map();
        let mut solver = IkSolver::new(&map);
        let mut out = map.skeleton().rest_pose();
        let mut pose = map.default_pose().clone();
        let target = Vec3::new(0.09, 0.3, 0.2);
        pose.goal_mut(Goal::LeftFoot).translation = target / map.scale();
        solver.solve(
            &map,
            &pose,
            1.,
            &IkTargets::default(),
            &Transform::IDENTITY,
            1. / 60.,
            &mut out,
        );
        let foot = map.joint(HumanBone::LeftFoot).unwrap();
        assert!(globals(&map, &out)[foot].translation.abs_diff_eq(target, 1e-3));
        assert!(solver.feet()[0].valid);
    }

    #[test]
    fn test_feet_without_goals_are_forgotten() {
        let map = map();
        let mut solver = IkSolver::new(&map);
        let mut out = map.skeleton().rest_pose();
        solver.solve(
            &map,
            map.default_pose(),
            0.,
            &IkTargets::default(),
            &Transform::IDENTITY,
            1. / 60.,
            &mut out,
        );
        assert!(!solver.feet()[0].valid);
        assert_eq!(out, map.skeleton().rest_pose());
    }

    #[test]
    fn test_merged_goal_weights() {
        let animated = Transform::from_xyz(0., 0., 0.);
        let merged = merge_goals(
            Some((animated, 0.5)),
            Some(GoalTarget::position(Vec3::X, 0.5)),
        )
        .unwrap();
        assert_eq!(merged.transform.translation, Vec3::new(0.5, 0., 0.));
        assert_eq!(merged.position_weight, 0.75);
        assert_eq!(merged.rotation_weight, 0.5);
    }
}
