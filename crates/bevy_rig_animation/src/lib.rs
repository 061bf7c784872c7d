//! # Bevy Rig Animation
//!
//! Per-character [`Animator`] running the [`bevy_rig_animation_core`] pipeline, and loaders
//! turning RON documents into the constant data it runs on.
//!
//! A controller document (`*.controller.ron`) declares parameters, clips, blend trees and
//! layers with their state machines, all referring to each other by name:
//!
//! ```text
//! (
//!     name: "humanoid",
//!     parameters: [(name: "speed", default: Float(0.0))],
//!     clips: [(name: "idle"), (name: "walk")],
//!     blend_trees: [
//!         (
//!             name: "locomotion",
//!             root: Blend1D(
//!                 parameter: "speed",
//!                 children: [
//!                     (at: 0.0, motion: Clip("idle")),
//!                     (at: 1.0, motion: Clip("walk")),
//!                 ],
//!             ),
//!         ),
//!     ],
//!     layers: [
//!         (
//!             name: "base",
//!             state_machine: (states: [(name: "move", motion: BlendTree("locomotion"))]),
//!         ),
//!     ],
//! )
//! ```
//!
//! Clip data itself comes from a [`ClipProvider`]. An avatar document (`*.avatar.ron`)
//! describes a skeleton and the joints playing each humanoid bone.

pub mod animator;
pub mod errors;
pub mod loader;
pub mod serial;

pub use animator::{Animator, AnimatorInput, AnimatorOutput};
pub use bevy_rig_animation_core;
pub use loader::{AvatarLoader, ClipProvider, ControllerLoader};

pub mod prelude {
    pub use super::{
        animator::{Animator, AnimatorInput, AnimatorOutput},
        errors::AssetLoaderError,
        loader::{AvatarLoader, ClipProvider, ControllerLoader},
        serial::{AvatarSerial, ControllerSerial},
    };
    pub use bevy_rig_animation_core::prelude::*;
}
