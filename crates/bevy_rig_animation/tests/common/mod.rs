#![allow(dead_code)]

use std::sync::Arc;

use bevy::platform::collections::HashMap;
use bevy_rig_animation::prelude::*;

pub const REFERENCE_AVATAR: &str = "(skeleton: Reference)";

pub fn filled(value: f32) -> Pose {
    let mut pose = Pose::default();
    pose.dofs.fill(value);
    pose
}

pub fn arms_mask() -> PoseMask {
    PoseMask::from_body_parts(BodyParts::LEFT_ARM | BodyParts::RIGHT_ARM)
}

/// Neutral pose with every arm DoF at `value`.
pub fn arms_at(value: f32) -> Pose {
    let mask = arms_mask();
    let mut pose = Pose::default();
    for (index, dof) in pose.dofs.iter_mut().enumerate() {
        if mask.has_dof(index) {
            *dof = value;
        }
    }
    pose
}

pub fn clips(entries: Vec<(&str, Arc<dyn Clip>)>) -> HashMap<String, Arc<dyn Clip>> {
    entries
        .into_iter()
        .map(|(name, clip)| (name.to_string(), clip))
        .collect()
}

pub fn constant(value: f32) -> Arc<dyn Clip> {
    Arc::new(ConstantClip::new(&filled(value), 1.))
}

/// One second going from `from` to `to` on every body DoF.
pub fn ramp(from: f32, to: f32) -> Arc<dyn Clip> {
    Arc::new(SampledClip::from_poses(&[filled(from), filled(to)], 1.))
}

pub fn reference_avatar() -> Arc<HumanoidMap> {
    Arc::new(
        AvatarLoader
            .load_bytes(REFERENCE_AVATAR.as_bytes())
            .unwrap(),
    )
}

pub fn animator(controller: &str, clips: HashMap<String, Arc<dyn Clip>>) -> Animator {
    let controller = ControllerLoader::new(clips)
        .load_bytes(controller.as_bytes())
        .unwrap();
    Animator::new(Arc::new(controller), reference_avatar()).unwrap()
}

pub fn assert_close(a: f32, b: f32, tolerance: f32) {
    assert!((a - b).abs() <= tolerance, "{a} != {b}");
}
