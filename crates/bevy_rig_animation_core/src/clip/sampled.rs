use bevy::math::Quat;

use super::Clip;
use crate::{
    mask::PoseMask,
    pose::{
        Pose,
        channels::{CHANNEL_COUNT, rotation_offsets},
    },
};

/// Uniformly sampled frames, interpolated linearly (rotations by normalized lerp in a shared
/// hemisphere).
#[derive(Debug, Clone)]
pub struct SampledClip {
    frame_rate: f32,
    frame_count: usize,
    frames: Vec<f32>,
    written: PoseMask,
}

impl SampledClip {
    pub fn from_poses(poses: &[Pose], frame_rate: f32) -> Self {
        let mut frames = Vec::with_capacity(poses.len() * CHANNEL_COUNT);
        for pose in poses {
            frames.extend(pose.to_channels());
        }
        Self {
            frame_rate: frame_rate.max(f32::EPSILON),
            frame_count: poses.len(),
            frames,
            written: PoseMask::ALL,
        }
    }

    pub fn with_written(mut self, written: PoseMask) -> Self {
        self.written = written;
        self
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    fn frame(&self, index: usize) -> &[f32] {
        &self.frames[index * CHANNEL_COUNT..(index + 1) * CHANNEL_COUNT]
    }
}

impl Clip for SampledClip {
    fn duration(&self) -> f32 {
        self.frame_count.saturating_sub(1) as f32 / self.frame_rate
    }

    fn evaluate(&self, time: f32, values: &mut [f32]) {
        if self.frame_count == 0 || values.len() < CHANNEL_COUNT {
            return;
        }
        let position = (time * self.frame_rate).clamp(0., (self.frame_count - 1) as f32);
        let index = position.floor() as usize;
        let next = (index + 1).min(self.frame_count - 1);
        let alpha = position - index as f32;

        let (a, b) = (self.frame(index), self.frame(next));
        for (channel, value) in values[..CHANNEL_COUNT].iter_mut().enumerate() {
            *value = a[channel] + (b[channel] - a[channel]) * alpha;
        }

        for offset in rotation_offsets() {
            let qa = Quat::from_slice(&a[offset..offset + 4]);
            let mut qb = Quat::from_slice(&b[offset..offset + 4]);
            if qa.dot(qb) < 0. {
                qb = -qb;
            }
            let q = qa.lerp(qb, alpha).normalize();
            values[offset..offset + 4].copy_from_slice(&q.to_array());
        }
    }

    fn written(&self) -> PoseMask {
        self.written
    }
}

#[cfg(test)]
mod test {
    use bevy::{math::Vec3, transform::components::Transform};

    use super::*;

    #[test]
    fn test_interpolates_between_frames() {
        let mut first = Pose::default();
        first.dofs[4] = 0.;
        first.root = Transform::from_xyz(0., 1., 0.);
        let mut second = first.clone();
        second.dofs[4] = 1.;
        second.root = Transform::from_xyz(0., 1., 2.).with_rotation(Quat::from_rotation_y(1.));

        let clip = SampledClip::from_poses(&[first, second], 2.);
        assert_eq!(clip.duration(), 0.5);

        let mut values = vec![0.; CHANNEL_COUNT];
        clip.evaluate(0.25, &mut values);
        let mut pose = Pose::default();
        pose.read_channels(&values);
        assert!((pose.dofs[4] - 0.5).abs() < 1e-6);
        assert!(pose.root.translation.abs_diff_eq(Vec3::new(0., 1., 1.), 1e-6));
        assert!(pose.root.rotation.abs_diff_eq(Quat::from_rotation_y(0.5), 1e-3));
    }

    #[test]
    fn test_single_frame() {
        let mut pose = Pose::default();
        pose.dofs[0] = 0.3;
        let clip = SampledClip::from_poses(&[pose], 30.);
        assert_eq!(clip.duration(), 0.);
        let mut values = vec![0.; CHANNEL_COUNT];
        clip.evaluate(0., &mut values);
        assert_eq!(values[crate::pose::channels::DOFS], 0.3);
    }
}
