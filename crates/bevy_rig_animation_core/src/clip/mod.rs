//! Motion sources. A clip is an opaque sampler filling the flat channel layout of a generic
//! [`Pose`]; keyframe storage is up to the implementor.

mod constant;
mod sampled;

use std::{fmt::Debug, sync::Arc};

use bevy::{
    platform::collections::HashMap,
    reflect::{Reflect, std_traits::ReflectDefault},
};
use serde::{Deserialize, Serialize};

pub use constant::ConstantClip;
pub use sampled::SampledClip;

use crate::{
    errors::ValidationError,
    mask::PoseMask,
    pose::{Pose, channels::CHANNEL_COUNT},
};

pub trait Clip: Send + Sync + Debug {
    /// Length in seconds. Zero for single-frame clips.
    fn duration(&self) -> f32;

    /// Fills `values` (laid out as in [`crate::pose::channels`]) with the pose at `time`
    /// seconds. `time` is always within `[0, duration]`.
    fn evaluate(&self, time: f32, values: &mut [f32]);

    /// Fields of the pose this clip animates.
    fn written(&self) -> PoseMask {
        PoseMask::ALL
    }
}

#[derive(Reflect, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[reflect(Default)]
pub enum RootMotionMode {
    /// Ground-plane root displacement is removed from the pose and reported as motion delta.
    #[default]
    Extract,
    /// The root moves inside the pose; no motion delta is produced.
    BakeIntoPose,
}

#[derive(Reflect, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[reflect(Default)]
#[serde(default)]
pub struct ClipSettings {
    pub looping: bool,
    pub root_motion: RootMotionMode,
    /// How strongly gravity should act on the character while this clip plays.
    pub gravity_weight: f32,
    /// Time in seconds of the frame additive layers subtract from this clip.
    pub additive_reference_time: f32,
}

impl Default for ClipSettings {
    fn default() -> Self {
        Self {
            looping: true,
            root_motion: RootMotionMode::Extract,
            gravity_weight: 1.,
            additive_reference_time: 0.,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClipEntry {
    pub name: String,
    pub clip: Arc<dyn Clip>,
    pub settings: ClipSettings,
}

impl ClipEntry {
    pub fn duration(&self) -> f32 {
        self.clip.duration().max(0.)
    }

    /// Clip time in seconds of a normalized time, wrapped for looping clips and clamped
    /// otherwise.
    pub fn time_at(&self, normalized: f32) -> f32 {
        let duration = self.duration();
        if duration <= 0. {
            return 0.;
        }
        let normalized = if self.settings.looping {
            normalized.rem_euclid(1.)
        } else {
            normalized.clamp(0., 1.)
        };
        normalized * duration
    }

    /// Samples the clip at `time` seconds into `out`. Channels the clip leaves alone keep the
    /// values `out` already had.
    pub fn sample(&self, time: f32, scratch: &mut Vec<f32>, out: &mut Pose) {
        scratch.resize(CHANNEL_COUNT, 0.);
        out.write_channels(scratch);
        self.clip
            .evaluate(time.clamp(0., self.duration()), scratch.as_mut_slice());
        out.read_channels(scratch);
    }
}

/// Named clips of a controller, addressed by index once resolved.
#[derive(Debug, Clone, Default)]
pub struct ClipLibrary {
    entries: Vec<ClipEntry>,
    by_name: HashMap<String, usize>,
}

impl ClipLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        name: impl Into<String>,
        clip: Arc<dyn Clip>,
        settings: ClipSettings,
    ) -> Result<usize, ValidationError> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(ValidationError::DuplicateName(name));
        }
        let index = self.entries.len();
        self.by_name.insert(name.clone(), index);
        self.entries.push(ClipEntry {
            name,
            clip,
            settings,
        });
        Ok(index)
    }

    pub fn get(&self, index: usize) -> Option<&ClipEntry> {
        self.entries.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn resolve(&self, name: &str) -> Result<usize, ValidationError> {
        self.index_of(name)
            .ok_or_else(|| ValidationError::UnknownClip(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClipEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn entry(looping: bool) -> ClipEntry {
        ClipEntry {
            name: "walk".into(),
            clip: Arc::new(ConstantClip::new(&Pose::default(), 2.)),
            settings: ClipSettings {
                looping,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_time_at_wraps_or_clamps() {
        assert!((entry(true).time_at(1.25) - 0.5).abs() < 1e-6);
        assert!((entry(true).time_at(-0.25) - 1.5).abs() < 1e-6);
        assert_eq!(entry(false).time_at(1.25), 2.);
        assert_eq!(entry(false).time_at(-1.), 0.);
    }

    #[test]
    fn test_library_lookup() {
        let mut library = ClipLibrary::new();
        let clip: Arc<dyn Clip> = Arc::new(ConstantClip::new(&Pose::default(), 1.));
        assert_eq!(library.add("idle", clip.clone(), ClipSettings::default()), Ok(0));
        assert_eq!(
            library.add("idle", clip, ClipSettings::default()),
            Err(ValidationError::DuplicateName("idle".into()))
        );
        assert_eq!(library.resolve("idle"), Ok(0));
        assert_eq!(
            library.resolve("run"),
            Err(ValidationError::UnknownClip("run".into()))
        );
    }
}
