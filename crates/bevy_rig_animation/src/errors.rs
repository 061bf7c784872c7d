use bevy_rig_animation_core::errors::ValidationError;
use thiserror::Error;

/// Errors produced while loading controller and avatar documents.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AssetLoaderError {
    /// An [IO](std::io) Error
    #[error("Could not read asset: {0}")]
    Io(#[from] std::io::Error),
    /// A [RON](ron) Error
    #[error("Could not parse RON: {0}")]
    RonSpannedError(#[from] ron::error::SpannedError),
    #[error("Asset does not satisfy constraints: {0}")]
    Validation(#[from] ValidationError),
}
