use bevy::{reflect::Reflect, transform::components::Transform};

use super::{LayerBlendMode, StatePose};
use crate::{
    interpolation::{AdditiveInterpolator, LinearInterpolator},
    mask::PoseMask,
    pose::{Pose, algebra::lerp_transform},
};

/// One layer's input to [`LayerCompositor::compose`].
#[derive(Debug, Clone, Copy)]
pub struct LayerContribution<'a> {
    pub source: &'a StatePose,
    /// Authored (or runtime) weight of the layer.
    pub weight: f32,
    /// See [`MotionLayer::motion_factor`](super::MotionLayer::motion_factor).
    pub motion_factor: f32,
    pub mode: LayerBlendMode,
    /// Fields the layer may touch.
    pub mask: PoseMask,
    /// Whether the layer's foot IK factor is taken into account.
    pub ik_pass: bool,
}

#[derive(Reflect, Debug, Clone, PartialEq)]
pub struct ComposedPose {
    pub pose: Pose,
    /// Fields written by some layer. The rest hold the character's default pose.
    pub written: PoseMask,
    /// Root motion of the tick, in normalized units.
    pub delta: Transform,
    pub gravity_weight: f32,
    pub foot_ik: f32,
}

impl Default for ComposedPose {
    fn default() -> Self {
        Self {
            pose: Pose::default(),
            written: PoseMask::NONE,
            delta: Transform::IDENTITY,
            gravity_weight: 0.,
            foot_ik: 0.,
        }
    }
}

/// Merges layer poses bottom to top.
#[derive(Debug, Clone, Default)]
pub struct LayerCompositor {
    composed: ComposedPose,
}

impl LayerCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn composed(&self) -> &ComposedPose {
        &self.composed
    }

    /// Composes the layers in order. The first layer has full weight and overrides the default
    /// pose on every field it writes; later layers are weighted by their weight times their
    /// motion factor and only touch fields both written and allowed by their mask.
    pub fn compose<'a>(
        &mut self,
        layers: impl IntoIterator<Item = LayerContribution<'a>>,
        default_pose: &Pose,
    ) -> &ComposedPose {
        let composed = &mut self.composed;
        composed.pose.copy_masked(default_pose, &PoseMask::ALL);
        composed.written = PoseMask::NONE;
        composed.delta = Transform::IDENTITY;
        composed.gravity_weight = 0.;
        composed.foot_ik = 0.;

        for (index, layer) in layers.into_iter().enumerate() {
            let mask = layer.source.written.intersection(&layer.mask);
            let weight = if index == 0 {
                1.
            } else {
                (layer.weight * layer.motion_factor).clamp(0., 1.)
            };
            if weight <= 0. || mask.is_empty() {
                continue;
            }

            match layer.mode {
                LayerBlendMode::Override => {
                    LinearInterpolator { mask }.interpolate_pose(
                        &mut composed.pose,
                        &layer.source.pose,
                        weight,
                    );
                    if mask.root && weight >= 1. {
                        composed.delta = layer.source.delta;
                        composed.gravity_weight = layer.source.gravity_weight;
                    } else if mask.root {
                        composed.delta =
                            lerp_transform(&composed.delta, &layer.source.delta, weight);
                        composed.gravity_weight +=
                            (layer.source.gravity_weight - composed.gravity_weight) * weight;
                    }
                    if layer.ik_pass {
                        composed.foot_ik += (layer.source.foot_ik - composed.foot_ik) * weight;
                    }
                }
                LayerBlendMode::Additive => {
                    AdditiveInterpolator { mask }.interpolate_pose(
                        &mut composed.pose,
                        &layer.source.pose,
                        weight,
                    );
                }
            }
            composed.written = composed.written.union(&mask);
        }
        &self.composed
    }
}

#[cfg(test)]
mod test {
    use bevy::math::{Quat, Vec3};

    use super::*;
    use crate::{
        humanoid::dof,
        mask::{BodyParts, PoseMask},
    };

    fn layer_pose(value: f32, written: PoseMask) -> StatePose {
        let mut pose = Pose::default();
        pose.dofs.fill(value);
        pose.root = Transform::from_xyz(0., value, 0.).with_rotation(Quat::from_rotation_y(value));
        StatePose {
            pose,
            written,
            delta: Transform::from_xyz(0., 0., value),
            gravity_weight: value,
            foot_ik: 0.,
            has_motion: true,
        }
    }

    fn contribution(
        source: &StatePose,
        weight: f32,
        mode: LayerBlendMode,
        parts: BodyParts,
    ) -> LayerContribution<'_> {
        LayerContribution {
            source,
            weight,
            motion_factor: 1.,
            mode,
            mask: PoseMask::from_body_parts(parts),
            ik_pass: true,
        }
    }

    fn default_pose() -> Pose {
        let mut pose = Pose::default();
        pose.dofs.fill(-1.);
        pose.root.translation = Vec3::Y;
        pose
    }

    #[test]
    fn test_single_layer_reproduces_its_pose() {
        let mut written = PoseMask::from_body_parts(BodyParts::BODY | BodyParts::HEAD);
        written.root = true;
        let base = layer_pose(0.5, written);

        let mut compositor = LayerCompositor::new();
        let composed = compositor.compose(
            [contribution(&base, 1., LayerBlendMode::Override, BodyParts::all())],
            &default_pose(),
        );

        for index in 0..composed.pose.dofs.len() {
            let expected = if written.has_dof(index) { 0.5 } else { -1. };
            assert_eq!(
                composed.pose.dofs[index],
                expected,
                "{}",
                dof::dof_name(index).unwrap()
            );
        }
        assert_eq!(composed.pose.root, base.pose.root);
        assert_eq!(composed.delta, base.delta);
        assert_eq!(composed.written, written);
    }

    #[test]
    fn test_override_layer_is_masked() {
        let base = layer_pose(0., PoseMask::ALL);
        let arms = layer_pose(1., PoseMask::ALL);

        let mut compositor = LayerCompositor::new();
        let composed = compositor.compose(
            [
                contribution(&base, 1., LayerBlendMode::Override, BodyParts::all()),
                contribution(&arms, 0.5, LayerBlendMode::Override, BodyParts::LEFT_ARM),
            ],
            &default_pose(),
        );

        assert_eq!(composed.pose.dofs[dof::LEFT_ARM_DOWN_UP], 0.5);
        assert_eq!(composed.pose.dofs[dof::RIGHT_ARM_DOWN_UP], 0.);
        assert_eq!(composed.pose.dofs[dof::HEAD_NOD], 0.);
        // Root motion follows the root field, which the arm layer may not touch.
        assert_eq!(composed.delta, base.delta);
    }

    #[test]
    fn test_additive_layer() {
        let base = layer_pose(0.25, PoseMask::ALL);
        let wave = layer_pose(0.5, PoseMask::ALL);

        let mut compositor = LayerCompositor::new();
        let composed = compositor.compose(
            [
                contribution(&base, 1., LayerBlendMode::Override, BodyParts::all()),
                contribution(&wave, 0.5, LayerBlendMode::Additive, BodyParts::ARMS),
            ],
            &default_pose(),
        );

        assert_eq!(composed.pose.dofs[dof::LEFT_ARM_DOWN_UP], 0.5);
        assert_eq!(composed.pose.dofs[dof::SPINE_FRONT_BACK], 0.25);
    }

    #[test]
    fn test_motionless_layer_has_no_effect() {
        let base = layer_pose(0., PoseMask::ALL);
        let overlay = layer_pose(1., PoseMask::ALL);
        let mut idle = contribution(&overlay, 1., LayerBlendMode::Override, BodyParts::all());
        idle.motion_factor = 0.;

        let mut compositor = LayerCompositor::new();
        let composed = compositor.compose(
            [
                contribution(&base, 1., LayerBlendMode::Override, BodyParts::all()),
                idle,
            ],
            &default_pose(),
        );
        assert!(composed.pose.dofs.iter().all(|value| *value == 0.));
    }
}
