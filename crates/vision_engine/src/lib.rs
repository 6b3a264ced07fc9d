//! # Vision Engine
//!
//! Pooled scratch arrays and culling-group bookkeeping for distance-band
//! visibility engines.
//!
//! ## Features
//!
//! - **Array Pool**: Thread-safe, power-of-two bucketed cache of reusable arrays
//! - **Temporary Arrays**: Growable lists whose storage comes from the pool
//! - **Culling Groups**: Staged target registration with batched rebuilds
//! - **Group Directory**: Key-addressed lookup of active culling groups
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vision_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut directory = GroupDirectory::new();
//!
//!     let mut proxy = CullingGroupProxy::new(GroupKey::new(0), Box::new(SimpleVisibilityEngine::new()));
//!     proxy.set_bounding_distances(vec![5.0, 10.0]);
//!     proxy.set_target_camera(Some(Camera::new(Vec3::zeros(), 100.0)));
//!     let proxy = directory.activate_new(proxy)?;
//!
//!     let target = CullingTargetBehaviour::new(GroupKey::new(0), TransformUpdateMode::Dynamic, Vec3::new(6.0, 0.0, 0.0));
//!     target.enable(&directory);
//!
//!     proxy.borrow_mut().update();
//!     CullingGroupProxy::dispatch_state_changes(&proxy);
//!     assert_eq!(target.distance_band(), Some(1));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod events;
pub mod culling;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        foundation::{
            math::{Vec3, BoundingSphere},
            memory::{ArrayPool, TemporaryArray, PoolError},
        },
        config::{Config, ConfigError, VisionSettings, ProxySettings, GroupKeyDefinition},
        events::{CullingGroupEvent, StateChangedListeners},
        culling::{
            Camera, CullingError, CullingGroupProxy, CullingTarget, CullingTargetBehaviour,
            GroupDirectory, GroupKey, SharedProxy, SimpleVisibilityEngine, TargetRef,
            TargetsUpdateMode, TransformUpdateMode, VisibilityEngine,
        },
    };
}
