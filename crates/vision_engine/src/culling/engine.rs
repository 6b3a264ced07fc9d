//! Visibility engine interface
//!
//! The proxy never decides visibility itself. It feeds bounding spheres,
//! thresholds and a camera into a [`VisibilityEngine`] and reads per-index
//! results back out of it.

use crate::events::CullingGroupEvent;
use crate::foundation::math::{BoundingSphere, Vec3};

/// Camera a culling group is evaluated against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// World-space position
    pub position: Vec3,

    /// Spheres whose surface lies beyond this distance are invisible
    pub far_clip_distance: f32,
}

impl Camera {
    /// Create a camera
    pub fn new(position: Vec3, far_clip_distance: f32) -> Self {
        Self {
            position,
            far_clip_distance,
        }
    }
}

/// Backend that classifies bounding spheres by visibility and distance band
///
/// Only the first `count` spheres passed to
/// [`set_bounding_sphere_count`](Self::set_bounding_sphere_count) are
/// evaluated. Queries for an index outside that range report invisible and
/// band 0.
pub trait VisibilityEngine {
    /// Enable or disable evaluation
    fn set_enabled(&mut self, enabled: bool);

    /// Camera used for visibility, `None` disables visibility entirely
    fn set_target_camera(&mut self, camera: Option<Camera>);

    /// Point distances are measured from, `None` falls back to the camera
    fn set_distance_reference_point(&mut self, point: Option<Vec3>);

    /// Ascending distance band thresholds
    fn set_bounding_distances(&mut self, distances: &[f32]);

    /// Replace the sphere snapshot; the engine keeps its own copy
    fn set_bounding_spheres(&mut self, spheres: &[BoundingSphere]);

    /// Number of leading spheres in the snapshot that are active
    ///
    /// A count of zero forgets every per-index state.
    fn set_bounding_sphere_count(&mut self, count: usize);

    /// Refresh one sphere of the snapshot in place
    fn update_bounding_sphere(&mut self, index: usize, sphere: BoundingSphere);

    /// Whether the sphere at `index` is visible
    fn is_visible(&self, index: usize) -> bool;

    /// Current distance band of the sphere at `index`
    fn distance_band(&self, index: usize) -> usize;

    /// Append the state changes since the last drain to `events`
    fn drain_state_changes(&mut self, events: &mut Vec<CullingGroupEvent>);
}
