use super::Clip;
use crate::{mask::PoseMask, pose::Pose};

/// A single static pose held for `duration` seconds.
#[derive(Debug, Clone)]
pub struct ConstantClip {
    channels: Vec<f32>,
    duration: f32,
    written: PoseMask,
}

impl ConstantClip {
    pub fn new(pose: &Pose, duration: f32) -> Self {
        Self {
            channels: pose.to_channels(),
            duration: duration.max(0.),
            written: PoseMask::ALL,
        }
    }

    pub fn with_written(mut self, written: PoseMask) -> Self {
        self.written = written;
        self
    }
}

impl Clip for ConstantClip {
    fn duration(&self) -> f32 {
        self.duration
    }

    fn evaluate(&self, _time: f32, values: &mut [f32]) {
        let len = values.len().min(self.channels.len());
        values[..len].copy_from_slice(&self.channels[..len]);
    }

    fn written(&self) -> PoseMask {
        self.written
    }
}
