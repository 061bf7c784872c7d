use std::{fs, io::Read, path::Path, sync::Arc};

use bevy::{log::debug, platform::collections::HashMap};
use bevy_rig_animation_core::{clip::Clip, controller::AnimatorController, humanoid::HumanoidMap};

use crate::{
    errors::AssetLoaderError,
    serial::{AvatarSerial, ControllerSerial},
};

/// Source of the clips a controller document names.
pub trait ClipProvider {
    fn clip(&self, name: &str) -> Option<Arc<dyn Clip>>;
}

impl ClipProvider for HashMap<String, Arc<dyn Clip>> {
    fn clip(&self, name: &str) -> Option<Arc<dyn Clip>> {
        self.get(name).cloned()
    }
}

impl<P: ClipProvider + ?Sized> ClipProvider for &P {
    fn clip(&self, name: &str) -> Option<Arc<dyn Clip>> {
        (**self).clip(name)
    }
}

/// Loads `*.controller.ron` documents, taking clips from a [`ClipProvider`].
pub struct ControllerLoader<P> {
    clips: P,
}

impl<P: ClipProvider> ControllerLoader<P> {
    pub fn new(clips: P) -> Self {
        Self { clips }
    }

    pub fn load(&self, reader: &mut impl Read) -> Result<AnimatorController, AssetLoaderError> {
        let mut bytes = vec![];
        reader.read_to_end(&mut bytes)?;
        self.load_bytes(&bytes)
    }

    pub fn load_bytes(&self, bytes: &[u8]) -> Result<AnimatorController, AssetLoaderError> {
        let serial: ControllerSerial = ron::de::from_bytes(bytes)?;
        Ok(serial.resolve(&self.clips)?)
    }

    pub fn load_path(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<AnimatorController, AssetLoaderError> {
        let path = path.as_ref();
        debug!("Loading controller from {}", path.display());
        self.load_bytes(&fs::read(path)?)
    }

    pub fn extensions(&self) -> &[&str] {
        &["controller.ron"]
    }
}

/// Loads `*.avatar.ron` documents into humanoid maps.
#[derive(Default)]
pub struct AvatarLoader;

impl AvatarLoader {
    pub fn load(&self, reader: &mut impl Read) -> Result<HumanoidMap, AssetLoaderError> {
        let mut bytes = vec![];
        reader.read_to_end(&mut bytes)?;
        self.load_bytes(&bytes)
    }

    pub fn load_bytes(&self, bytes: &[u8]) -> Result<HumanoidMap, AssetLoaderError> {
        let serial: AvatarSerial = ron::de::from_bytes(bytes)?;
        Ok(serial.resolve()?)
    }

    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<HumanoidMap, AssetLoaderError> {
        let path = path.as_ref();
        debug!("Loading avatar from {}", path.display());
        self.load_bytes(&fs::read(path)?)
    }

    pub fn extensions(&self) -> &[&str] {
        &["avatar.ron"]
    }
}
