//! Culling group bookkeeping
//!
//! Tracks sets of targets per group key and feeds their bounding spheres to
//! a visibility engine (visibility determination, Game Engine Architecture
//! Chapter 11). The engine decides what is visible; this module only keeps
//! its inputs current.
//!
//! ## Flow
//!
//! 1. A [`CullingGroupProxy`] is activated in a [`GroupDirectory`] under its key
//! 2. Targets stage themselves with [`CullingGroupProxy::add`]
//! 3. [`CullingGroupProxy::update`] (or [`GroupDirectory::rebuild_all`])
//!    commits the staged changes and refreshes dynamic spheres
//! 4. [`CullingGroupProxy::dispatch_state_changes`] publishes engine
//!    events to the targets' listeners

pub mod directory;
pub mod engine;
pub mod error;
pub mod key;
pub mod proxy;
pub mod simple_engine;
pub mod target;

#[cfg(test)]
mod tests;

pub use directory::GroupDirectory;
pub use engine::{Camera, VisibilityEngine};
pub use error::CullingError;
pub use key::GroupKey;
pub use proxy::{
    CullingGroupProxy, ProxyState, SharedProxy, TargetsUpdateMode, MIN_BOUNDING_SPHERE_CAPACITY,
};
pub use simple_engine::SimpleVisibilityEngine;
pub use target::{CullingTarget, CullingTargetBehaviour, TargetRef, TransformUpdateMode};
