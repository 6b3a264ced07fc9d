//! Range and threshold visibility engine
//!
//! A sphere is visible when a camera is set and the nearest point of the
//! sphere lies within the camera's far clip distance. Its distance band is
//! the number of thresholds the centre distance has reached. There is no
//! frustum or occlusion test.
//!
//! The engine remembers the last state it reported for every index and only
//! emits an event when that state changes. Shrinking and regrowing the count
//! keeps the remembered state of the surviving indices, so a new occupant of
//! an index that lands in the same state as the old one is silent unless the
//! count went through zero first.

use super::engine::{Camera, VisibilityEngine};
use crate::events::CullingGroupEvent;
use crate::foundation::math::{BoundingSphere, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SphereState {
    visible: bool,
    band: usize,
}

impl SphereState {
    const INITIAL: Self = Self {
        visible: false,
        band: 0,
    };
}

/// Reference [`VisibilityEngine`] backend
#[derive(Debug, Clone)]
pub struct SimpleVisibilityEngine {
    enabled: bool,
    camera: Option<Camera>,
    reference_point: Option<Vec3>,
    distances: Vec<f32>,
    spheres: Vec<BoundingSphere>,
    states: Vec<SphereState>,
}

impl SimpleVisibilityEngine {
    /// Create a disabled engine with no spheres
    pub fn new() -> Self {
        Self {
            enabled: false,
            camera: None,
            reference_point: None,
            distances: Vec::new(),
            spheres: Vec::new(),
            states: Vec::new(),
        }
    }

    /// Whether evaluation is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of active spheres
    pub fn bounding_sphere_count(&self) -> usize {
        self.states.len()
    }

    fn sphere(&self, index: usize) -> Option<&BoundingSphere> {
        if index < self.states.len() {
            self.spheres.get(index)
        } else {
            None
        }
    }

    fn evaluate(&self, sphere: &BoundingSphere) -> SphereState {
        let visible = self
            .camera
            .is_some_and(|camera| sphere.distance_to_surface(&camera.position) <= camera.far_clip_distance);

        let origin = self
            .reference_point
            .or_else(|| self.camera.map(|camera| camera.position));
        let band = origin.map_or(0, |origin| {
            let distance = sphere.distance_to_center(&origin);
            self.distances
                .iter()
                .filter(|&&threshold| distance >= threshold)
                .count()
        });

        SphereState { visible, band }
    }
}

impl Default for SimpleVisibilityEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl VisibilityEngine for SimpleVisibilityEngine {
    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn set_target_camera(&mut self, camera: Option<Camera>) {
        self.camera = camera;
    }

    fn set_distance_reference_point(&mut self, point: Option<Vec3>) {
        self.reference_point = point;
    }

    fn set_bounding_distances(&mut self, distances: &[f32]) {
        self.distances = distances.to_vec();
    }

    fn set_bounding_spheres(&mut self, spheres: &[BoundingSphere]) {
        self.spheres.clear();
        self.spheres.extend_from_slice(spheres);
    }

    fn set_bounding_sphere_count(&mut self, count: usize) {
        self.states.truncate(count);
        self.states.resize(count, SphereState::INITIAL);
    }

    fn update_bounding_sphere(&mut self, index: usize, sphere: BoundingSphere) {
        if let Some(slot) = self.spheres.get_mut(index) {
            *slot = sphere;
        }
    }

    fn is_visible(&self, index: usize) -> bool {
        self.sphere(index)
            .is_some_and(|sphere| self.evaluate(sphere).visible)
    }

    fn distance_band(&self, index: usize) -> usize {
        self.sphere(index)
            .map_or(0, |sphere| self.evaluate(sphere).band)
    }

    fn drain_state_changes(&mut self, events: &mut Vec<CullingGroupEvent>) {
        if !self.enabled {
            return;
        }

        let active = self.states.len().min(self.spheres.len());
        for index in 0..active {
            let current = self.evaluate(&self.spheres[index]);
            let previous = self.states[index];
            if current != previous {
                events.push(CullingGroupEvent {
                    index,
                    previous_band: previous.band,
                    current_band: current.band,
                    was_visible: previous.visible,
                    is_visible: current.visible,
                });
                self.states[index] = current;
            }
        }
    }
}
