mod common;

use std::sync::Arc;

use bevy::math::{Quat, Vec3};
use bevy_rig_animation::prelude::*;
use common::*;

const LOCOMOTION: &str = r#"(
    name: "locomotion",
    parameters: [(name: "speed", default: Float(0.0))],
    clips: [
        (name: "idle"),
        (name: "walk"),
        (name: "run"),
        (name: "wave", settings: (additive_reference_time: 0.0)),
    ],
    blend_trees: [
        (
            name: "Locomotion",
            root: Blend1D(
                parameter: "speed",
                children: [
                    (at: 0.0, motion: Clip("idle")),
                    (at: 0.5, motion: Clip("walk")),
                    (at: 1.0, motion: Clip("run")),
                ],
            ),
        ),
    ],
    layers: [
        (
            name: "base",
            state_machine: (states: [(name: "Locomotion", motion: BlendTree("Locomotion"))]),
        ),
        (
            name: "wave",
            mode: Additive,
            mask: Some([LeftArm, RightArm]),
            state_machine: (states: [(name: "Wave", motion: Clip("wave"))]),
        ),
    ],
)"#;

const IDLE_TO_WALK: &str = r#"(
    name: "idle_to_walk",
    parameters: [(name: "go", default: Trigger(false))],
    clips: [(name: "idle"), (name: "walk")],
    layers: [
        (
            name: "base",
            state_machine: (
                default_state: Some("Idle"),
                states: [
                    (
                        name: "Idle",
                        motion: Clip("idle"),
                        transitions: [
                            (
                                to: "Walk",
                                duration: 0.2,
                                fixed_duration: true,
                                offset: 0.3,
                                conditions: [If("go")],
                            ),
                        ],
                    ),
                    (name: "Walk", motion: Clip("walk")),
                ],
            ),
        ),
    ],
)"#;

fn locomotion() -> Animator {
    animator(
        LOCOMOTION,
        clips(vec![
            ("idle", constant(0.1)),
            ("walk", constant(0.4)),
            ("run", constant(0.8)),
            (
                "wave",
                Arc::new(SampledClip::from_poses(&[arms_at(0.), arms_at(1.)], 1.)),
            ),
        ]),
    )
}

fn run(animator: &mut Animator, ticks: usize, dt: f32) -> AnimatorOutput {
    for _ in 0..ticks {
        animator.update(&AnimatorInput::new(dt));
    }
    animator.output().clone()
}

#[test]
fn test_idle_at_rest() {
    let mut animator = locomotion();
    animator.set_layer_weight(1, 0.).unwrap();
    let output = run(&mut animator, 3, 0.1);

    for value in &output.humanoid.dofs {
        assert_close(*value, 0.1, 1e-5);
    }
    assert!(output.written.root);
}

#[test]
fn test_speed_blends_locomotion() {
    let mut animator = locomotion();
    animator.set_layer_weight(1, 0.).unwrap();
    animator.set_float("speed", 0.25).unwrap();
    let output = run(&mut animator, 1, 0.1);

    for value in &output.humanoid.dofs {
        assert_close(*value, 0.25, 1e-5);
    }
}

#[test]
fn test_wave_only_moves_arms() {
    let mut plain = locomotion();
    plain.set_layer_weight(1, 0.).unwrap();
    let mut waving = locomotion();
    waving.set_layer_weight(1, 0.5).unwrap();

    let plain = run(&mut plain, 3, 0.1);
    let waving = run(&mut waving, 3, 0.1);

    let arms = arms_mask();
    let mut moved = 0;
    for (index, (a, b)) in plain.humanoid.dofs.iter().zip(&waving.humanoid.dofs).enumerate() {
        if arms.has_dof(index) {
            if (a - b).abs() > 0.05 {
                moved += 1;
            }
        } else {
            assert_eq!(a, b, "{index}");
        }
    }
    assert!(moved > 0);
    assert_eq!(plain.humanoid.root, waving.humanoid.root);
}

#[test]
fn test_idle_to_walk_transition() {
    let mut animator = animator(
        IDLE_TO_WALK,
        clips(vec![("idle", constant(-0.5)), ("walk", ramp(0., 1.))]),
    );
    animator.set_trigger("go").unwrap();

    let mut factors = vec![];
    for _ in 0..4 {
        animator.update(&AnimatorInput::new(0.05));
        let layer = animator.layer(0).unwrap();
        factors.push(layer.state_machine_output().blend_factor);
    }
    for (factor, expected) in factors.iter().zip([0.25, 0.5, 0.75, 1.]) {
        assert_close(*factor, expected, 1e-4);
    }

    let layer = animator.layer(0).unwrap();
    assert_eq!(layer.instance().current_state(), 1);
    assert_close(layer.instance().current_normalized_time(), 0.5, 1e-4);
    // Walk entered at 0.3 and ran four ticks of a one second clip.
    for value in &animator.output().humanoid.dofs {
        assert_close(*value, 0.5, 1e-4);
    }
    assert_eq!(
        animator.parameters().get_by_name("go").unwrap(),
        ParameterValue::Trigger(false)
    );
}

#[test]
fn test_reset_returns_to_rest() {
    let mut animator = animator(
        IDLE_TO_WALK,
        clips(vec![("idle", constant(-0.5)), ("walk", ramp(0., 1.))]),
    );
    animator.set_trigger("go").unwrap();
    run(&mut animator, 2, 0.05);
    assert_eq!(animator.layer(0).unwrap().instance().next_state(), Some(1));

    animator.reset();
    let layer = animator.layer(0).unwrap();
    assert_eq!(layer.instance().current_state(), 0);
    assert_eq!(layer.instance().next_state(), None);
    assert_eq!(layer.output().written, PoseMask::NONE);
    assert_eq!(&animator.output().pose, animator.map().rest_locals());
    assert_eq!(animator.output().written, PoseMask::NONE);

    // The trigger was cleared too, so Idle plays on its own.
    let output = run(&mut animator, 1, 0.05);
    for value in &output.humanoid.dofs {
        assert_close(*value, -0.5, 1e-5);
    }
}

#[test]
fn test_explicit_request() {
    let mut animator = animator(
        IDLE_TO_WALK,
        clips(vec![("idle", constant(-0.5)), ("walk", ramp(0., 1.))]),
    );
    assert_eq!(
        animator.play(0, "Run").unwrap_err(),
        RigError::UnknownState("Run".into())
    );
    animator.play(0, "Walk").unwrap();
    run(&mut animator, 1, 0.1);

    let layer = animator.layer(0).unwrap();
    assert_eq!(layer.instance().current_state(), 1);
    assert_close(layer.instance().current_normalized_time(), 0.1, 1e-4);
}

#[test]
fn test_skeleton_pose_follows_humanoid_pose() {
    let mut animator = animator(
        IDLE_TO_WALK,
        clips(vec![("idle", constant(0.3)), ("walk", constant(0.))]),
    );
    let output = run(&mut animator, 1, 0.1);
    let map = animator.map();

    let mut expected = map.rest_locals().clone();
    map.to_skeleton(&output.humanoid, &mut expected);
    let head = map.joint(HumanBone::Head).unwrap();
    assert!(
        output.pose.locals[head]
            .rotation
            .angle_between(expected.locals[head].rotation)
            < 1e-4
    );
    assert!(output.pose.locals[head].rotation.angle_between(Quat::IDENTITY) > 1e-2);
}

#[test]
fn test_runtime_hand_goal() {
    let rest: Arc<dyn Clip> = Arc::new(ConstantClip::new(reference_avatar().default_pose(), 1.));
    let mut animator = animator(
        IDLE_TO_WALK,
        clips(vec![("idle", rest.clone()), ("walk", rest)]),
    );
    let target = Vec3::new(0.4, 1.2, 0.3);
    let input = AnimatorInput::new(0.1).with_ik(
        IkTargets::default().with_goal(Goal::LeftHand, GoalTarget::position(target, 1.)),
    );
    animator.update(&input);

    let map = animator.map().clone();
    let mut globals = vec![];
    map.skeleton()
        .compute_globals(&animator.output().pose, &mut globals);
    let hand = map.joint(HumanBone::LeftHand).unwrap();
    assert!(globals[hand].translation.distance(target) < 5e-3);
}
