mod common;

use bevy_rig_animation::prelude::*;
use common::*;

fn load(document: &str) -> Result<AnimatorController, AssetLoaderError> {
    ControllerLoader::new(clips(vec![("idle", constant(0.)), ("jump", constant(1.))]))
        .load_bytes(document.as_bytes())
}

fn validation_error(document: &str) -> ValidationError {
    match load(document) {
        Err(AssetLoaderError::Validation(error)) => error,
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[test]
fn test_loads_names_as_indices() {
    let controller = load(
        r#"(
            name: "hero",
            parameters: [
                (name: "grounded", default: Bool(true)),
                (name: "speed", default: Float(0.0)),
            ],
            clips: [(name: "idle"), (name: "jump", settings: (looping: false))],
            layers: [
                (
                    name: "base",
                    state_machine: (
                        default_state: Some("Idle"),
                        states: [
                            (
                                name: "Jump",
                                motion: Clip("jump"),
                                transitions: [(to: "Idle", conditions: [ExitTime(1.0)])],
                            ),
                            (
                                name: "Idle",
                                motion: Clip("idle"),
                                speed_parameter: Some("speed"),
                                transitions: [(to: "Jump", conditions: [IfNot("grounded")])],
                            ),
                        ],
                    ),
                ),
            ],
        )"#,
    )
    .unwrap();

    let machine = controller.layer_state_machine(0).unwrap();
    assert_eq!(machine.default_state(), 1);
    let idle = machine.state(1).unwrap();
    assert_eq!(idle.motion, Motion::Clip(0));
    assert_eq!(idle.speed_parameter, Some(1));
    assert_eq!(idle.transitions[0].destination, 0);
    assert_eq!(idle.transitions[0].conditions, vec![Condition::IfNot(0)]);
    assert_eq!(idle.transitions[0].duration, 0.25);
    assert!(!controller.clips().get(1).unwrap().settings.looping);
}

#[test]
fn test_unknown_state_is_named() {
    let error = validation_error(
        r#"(
            name: "hero",
            layers: [
                (
                    name: "base",
                    state_machine: (
                        states: [(name: "Idle", transitions: [(to: "Jump")])],
                    ),
                ),
            ],
        )"#,
    );
    assert_eq!(
        error,
        ValidationError::UnknownState {
            machine: "base".into(),
            state: "Jump".into()
        }
    );
    assert!(error.to_string().contains("Jump"));
}

#[test]
fn test_condition_parameter_kind_is_checked() {
    let error = validation_error(
        r#"(
            name: "hero",
            parameters: [(name: "speed", default: Float(0.0))],
            layers: [
                (
                    name: "base",
                    state_machine: (
                        states: [(name: "Idle", transitions: [(to: "Idle", conditions: [If("speed")])])],
                    ),
                ),
            ],
        )"#,
    );
    assert!(matches!(
        error,
        ValidationError::ParameterKindMismatch { ref name, found: ParameterKind::Float, .. }
            if name == "speed"
    ));
}

#[test]
fn test_unknown_clip_and_blend_tree() {
    let error = validation_error(
        r#"(name: "hero", clips: [(name: "swim")], layers: [])"#,
    );
    assert_eq!(error, ValidationError::UnknownClip("swim".into()));

    let error = validation_error(
        r#"(
            name: "hero",
            layers: [
                (name: "base", state_machine: (states: [(name: "Move", motion: BlendTree("move"))])),
            ],
        )"#,
    );
    assert_eq!(error, ValidationError::UnknownBlendTree("move".into()));
}

#[test]
fn test_blend_tree_is_flattened() {
    let controller = load(
        r#"(
            name: "hero",
            parameters: [(name: "x", default: Float(0.0)), (name: "y", default: Float(0.0))],
            clips: [(name: "idle"), (name: "jump")],
            blend_trees: [
                (
                    name: "move",
                    root: Blend1D(
                        parameter: "x",
                        children: [
                            (at: 0.0, motion: Clip("idle")),
                            (
                                at: 1.0,
                                time_scale: -1.0,
                                motion: SimpleDirectional2D(
                                    parameters: ("x", "y"),
                                    children: [
                                        (at: (0.0, 0.0), motion: Clip("idle")),
                                        (at: (1.0, 0.0), motion: Clip("jump")),
                                    ],
                                ),
                            ),
                        ],
                    ),
                ),
            ],
            layers: [
                (name: "base", state_machine: (states: [(name: "Move", motion: BlendTree("move"))])),
            ],
        )"#,
    )
    .unwrap();

    let tree = &controller.blend_trees()[0];
    assert_eq!(tree.nodes().len(), 5);
    let root = &tree.nodes()[0];
    assert_eq!(root.children.len(), 2);
    assert_eq!(root.children[1].node, 2);
    assert_eq!(root.children[1].time_scale, -1.);
    assert_eq!(tree.nodes()[4].kind, BlendNodeKind::Clip(1));
}

#[test]
fn test_base_layer_must_cover_everything() {
    let error = validation_error(
        r#"(
            name: "hero",
            layers: [(name: "arms", mask: Some([LeftArm]), state_machine: ())],
        )"#,
    );
    assert_eq!(error, ValidationError::InvalidBaseLayer("arms".into()));
}

#[test]
fn test_parse_errors() {
    assert!(matches!(
        load("(name: \"hero\", layers: [(name: 3)])"),
        Err(AssetLoaderError::RonSpannedError(_))
    ));
}
