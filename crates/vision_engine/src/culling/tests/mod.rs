//! Cross-module culling tests
//!
//! Shared doubles: [`RecordingEngine`] logs every call the proxy makes while
//! delegating the actual classification to [`SimpleVisibilityEngine`], and
//! [`TestTarget`] is a bare target with a fixed sphere.

mod directory;
mod scenario;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::culling::{Camera, CullingTarget, SimpleVisibilityEngine, TransformUpdateMode, VisibilityEngine};
use crate::events::{CullingGroupEvent, StateChangedListeners};
use crate::foundation::math::{BoundingSphere, Vec3};

#[derive(Debug, Clone, PartialEq)]
pub(super) enum EngineCall {
    Enabled(bool),
    Camera(Option<Camera>),
    ReferencePoint(Option<Vec3>),
    Distances(Vec<f32>),
    Spheres(usize),
    Count(usize),
    UpdateSphere(usize),
}

pub(super) type CallLog = Rc<RefCell<Vec<EngineCall>>>;

pub(super) struct RecordingEngine {
    inner: SimpleVisibilityEngine,
    calls: CallLog,
}

impl RecordingEngine {
    pub(super) fn boxed() -> (Box<dyn VisibilityEngine>, CallLog) {
        let calls = CallLog::default();
        let engine = Self {
            inner: SimpleVisibilityEngine::new(),
            calls: calls.clone(),
        };
        (Box::new(engine), calls)
    }

    fn record(&self, call: EngineCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl VisibilityEngine for RecordingEngine {
    fn set_enabled(&mut self, enabled: bool) {
        self.record(EngineCall::Enabled(enabled));
        self.inner.set_enabled(enabled);
    }

    fn set_target_camera(&mut self, camera: Option<Camera>) {
        self.record(EngineCall::Camera(camera));
        self.inner.set_target_camera(camera);
    }

    fn set_distance_reference_point(&mut self, point: Option<Vec3>) {
        self.record(EngineCall::ReferencePoint(point));
        self.inner.set_distance_reference_point(point);
    }

    fn set_bounding_distances(&mut self, distances: &[f32]) {
        self.record(EngineCall::Distances(distances.to_vec()));
        self.inner.set_bounding_distances(distances);
    }

    fn set_bounding_spheres(&mut self, spheres: &[BoundingSphere]) {
        self.record(EngineCall::Spheres(spheres.len()));
        self.inner.set_bounding_spheres(spheres);
    }

    fn set_bounding_sphere_count(&mut self, count: usize) {
        self.record(EngineCall::Count(count));
        self.inner.set_bounding_sphere_count(count);
    }

    fn update_bounding_sphere(&mut self, index: usize, sphere: BoundingSphere) {
        self.record(EngineCall::UpdateSphere(index));
        self.inner.update_bounding_sphere(index, sphere);
    }

    fn is_visible(&self, index: usize) -> bool {
        self.inner.is_visible(index)
    }

    fn distance_band(&self, index: usize) -> usize {
        self.inner.distance_band(index)
    }

    fn drain_state_changes(&mut self, events: &mut Vec<CullingGroupEvent>) {
        self.inner.drain_state_changes(events);
    }
}

/// Sphere-only target with a read counter
pub(super) struct TestTarget {
    mode: Cell<TransformUpdateMode>,
    sphere: Cell<BoundingSphere>,
    reads: Cell<usize>,
    state_changed: StateChangedListeners,
}

impl TestTarget {
    pub(super) fn new(mode: TransformUpdateMode, position: Vec3, radius: f32) -> Rc<Self> {
        Rc::new(Self {
            mode: Cell::new(mode),
            sphere: Cell::new(BoundingSphere::new(position, radius)),
            reads: Cell::new(0),
            state_changed: StateChangedListeners::new(),
        })
    }

    pub(super) fn dynamic() -> Rc<Self> {
        Self::new(TransformUpdateMode::Dynamic, Vec3::zeros(), 1.0)
    }

    pub(super) fn fixed() -> Rc<Self> {
        Self::new(TransformUpdateMode::Static, Vec3::zeros(), 1.0)
    }

    pub(super) fn set_mode(&self, mode: TransformUpdateMode) {
        self.mode.set(mode);
    }

    pub(super) fn move_to(&self, position: Vec3) {
        let radius = self.sphere.get().radius;
        self.sphere.set(BoundingSphere::new(position, radius));
    }

    pub(super) fn reads(&self) -> usize {
        self.reads.get()
    }
}

impl CullingTarget for TestTarget {
    fn bounding_sphere_update_mode(&self) -> TransformUpdateMode {
        self.mode.get()
    }

    fn bounding_sphere(&self) -> BoundingSphere {
        self.sphere.get()
    }

    fn update_and_get_bounding_sphere(&self) -> BoundingSphere {
        self.reads.set(self.reads.get() + 1);
        self.sphere.get()
    }

    fn state_changed(&self) -> &StateChangedListeners {
        &self.state_changed
    }
}

/// Camera at the origin that sees everything in the tests
pub(super) fn origin_camera() -> Camera {
    Camera::new(Vec3::zeros(), 1000.0)
}
