//! Culling group proxy
//!
//! Owns the list of tracked targets and the bounding sphere snapshot a
//! [`VisibilityEngine`] evaluates. Membership changes are staged with
//! [`add`](CullingGroupProxy::add) and [`remove`](CullingGroupProxy::remove)
//! and committed in one batch by [`rebuild`](CullingGroupProxy::rebuild):
//!
//! ```text
//! add/remove ──> pending sets ──rebuild──> targets ──> spheres ──> engine
//!                                             │
//!                                             └──> dynamic indices (refreshed each update)
//! ```
//!
//! A target's index is stable between rebuilds, and engine events are
//! resolved back to targets through it.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::engine::{Camera, VisibilityEngine};
use super::key::GroupKey;
use super::target::{TargetRef, TransformUpdateMode};
use crate::config::ProxySettings;
use crate::events::{CullingGroupEvent, StateChangedListeners};
use crate::foundation::math::{utils, BoundingSphere, Vec3};
use crate::foundation::memory::TemporaryArray;

/// Smallest bounding sphere array a rebuild allocates
pub const MIN_BOUNDING_SPHERE_CAPACITY: usize = 16;

/// Thresholds handed to the engine when none are configured
const UNBOUNDED_DISTANCES: [f32; 2] = [0.0, f32::INFINITY];

/// Proxies are shared between the directory, targets and callers
pub type SharedProxy = Rc<RefCell<CullingGroupProxy>>;

/// When staged target changes are committed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TargetsUpdateMode {
    /// Every [`update`](CullingGroupProxy::update) rebuilds first
    #[default]
    EveryUpdate,
    /// Only explicit [`rebuild`](CullingGroupProxy::rebuild) calls commit
    Manual,
}

/// Lifecycle of a proxy relative to its [`GroupDirectory`](super::GroupDirectory)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyState {
    /// Never activated, or deactivated
    Inactive,
    /// Registered and evaluating
    Enabled,
    /// Activated before, currently unregistered and paused
    Disabled,
}

/// Registry of culling targets feeding one visibility engine
pub struct CullingGroupProxy {
    key: GroupKey,
    state: ProxyState,
    targets_update_mode: TargetsUpdateMode,
    target_camera: Option<Camera>,
    distance_reference_point: Option<Vec3>,
    bounding_distances: Vec<f32>,

    engine: Box<dyn VisibilityEngine>,
    bounding_spheres: Vec<BoundingSphere>,

    targets: Vec<TargetRef>,
    targets_to_add: HashSet<TargetRef>,
    targets_to_remove: HashSet<TargetRef>,
    dynamic_target_indices: TemporaryArray<usize>,

    state_changed: Rc<StateChangedListeners>,
    event_buffer: Vec<CullingGroupEvent>,
}

impl CullingGroupProxy {
    /// Create an inactive proxy with no targets
    pub fn new(key: GroupKey, mut engine: Box<dyn VisibilityEngine>) -> Self {
        engine.set_target_camera(None);
        engine.set_distance_reference_point(None);
        engine.set_bounding_distances(&UNBOUNDED_DISTANCES);

        Self {
            key,
            state: ProxyState::Inactive,
            targets_update_mode: TargetsUpdateMode::EveryUpdate,
            target_camera: None,
            distance_reference_point: None,
            bounding_distances: Vec::new(),
            engine,
            bounding_spheres: Vec::new(),
            targets: Vec::new(),
            targets_to_add: HashSet::new(),
            targets_to_remove: HashSet::new(),
            dynamic_target_indices: TemporaryArray::default(),
            state_changed: Rc::new(StateChangedListeners::new()),
            event_buffer: Vec::new(),
        }
    }

    /// Create an inactive proxy configured from settings
    pub fn from_settings(settings: &ProxySettings, engine: Box<dyn VisibilityEngine>) -> Self {
        let mut proxy = Self::new(settings.key, engine);
        proxy.set_targets_update_mode(settings.targets_update_mode);
        proxy.set_distance_reference_point(settings.distance_reference_point);
        proxy.set_bounding_distances(settings.bounding_distances.clone());
        proxy
    }

    /// Wrap into the shared form used by the directory and targets
    pub fn into_shared(self) -> SharedProxy {
        Rc::new(RefCell::new(self))
    }

    /// Stage a target for addition, cancelling a staged removal
    pub fn add(&mut self, target: TargetRef) {
        self.targets_to_remove.remove(&target);
        self.targets_to_add.insert(target);
    }

    /// Stage a target for removal, cancelling a staged addition
    pub fn remove(&mut self, target: TargetRef) {
        self.targets_to_add.remove(&target);
        self.targets_to_remove.insert(target);
    }

    /// Commit staged additions and removals
    ///
    /// Returns false without touching anything when nothing is staged.
    /// Otherwise dead targets are pruned along with the staged removals, the
    /// sphere snapshot and the dynamic index list are rebuilt from scratch,
    /// and the engine's sphere count is reset to zero before the new
    /// snapshot is supplied so that every index reports its state again.
    pub fn rebuild(&mut self) -> bool {
        if self.targets_to_add.is_empty() && self.targets_to_remove.is_empty() {
            return false;
        }

        let (removed, added) = self.commit_membership();

        let count = self.targets.len();
        let capacity = utils::next_power_of_two_at_least(count, MIN_BOUNDING_SPHERE_CAPACITY)
            .unwrap_or(count);
        if capacity != self.bounding_spheres.len() {
            self.bounding_spheres = vec![BoundingSphere::default(); capacity];
        }

        let mut dynamic_indices = TemporaryArray::create_as_list(count);
        for (index, target) in self.targets.iter().enumerate() {
            if let Some(target) = target.upgrade() {
                if target.bounding_sphere_update_mode() == TransformUpdateMode::Dynamic {
                    dynamic_indices.push(index);
                }
                self.bounding_spheres[index] = target.update_and_get_bounding_sphere();
            }
        }
        std::mem::replace(&mut self.dynamic_target_indices, dynamic_indices).dispose();

        self.engine.set_bounding_sphere_count(0);
        self.engine.set_bounding_spheres(&self.bounding_spheres);
        self.engine.set_bounding_sphere_count(count);

        log::debug!(
            "Rebuilt culling group {}: -{} +{}, {} targets, {} spheres, {} dynamic",
            self.key,
            removed,
            added,
            count,
            capacity,
            self.dynamic_target_indices.len()
        );
        true
    }

    /// Apply staged removals and additions to the target list
    ///
    /// Returns how many targets actually left and joined the list.
    fn commit_membership(&mut self) -> (usize, usize) {
        let tracked_before = self.targets.len();
        for target in self.targets_to_remove.drain() {
            if let Some(index) = self.targets.iter().position(|tracked| *tracked == target) {
                self.targets.remove(index);
            }
        }
        // Targets dropped without staging their removal go too
        self.targets.retain(TargetRef::is_alive);
        let removed = tracked_before - self.targets.len();

        let mut added = 0;
        for target in self.targets_to_add.drain() {
            if target.is_alive() && !self.targets.contains(&target) {
                self.targets.push(target);
                added += 1;
            }
        }
        (removed, added)
    }

    /// Re-partition targets into dynamic and static without touching membership
    pub fn refresh_dynamic(&mut self) {
        let mut dynamic_indices = TemporaryArray::create_as_list(self.targets.len());
        for (index, target) in self.targets.iter().enumerate() {
            let dynamic = target
                .upgrade()
                .is_some_and(|target| target.bounding_sphere_update_mode() == TransformUpdateMode::Dynamic);
            if dynamic {
                dynamic_indices.push(index);
            }
        }
        std::mem::replace(&mut self.dynamic_target_indices, dynamic_indices).dispose();
    }

    /// Re-read the sphere of every live target
    pub fn refresh_all_geometry(&mut self) {
        for (index, target) in self.targets.iter().enumerate() {
            if let Some(target) = target.upgrade() {
                let sphere = target.update_and_get_bounding_sphere();
                self.bounding_spheres[index] = sphere;
                self.engine.update_bounding_sphere(index, sphere);
            }
        }
    }

    /// Re-read the spheres of live dynamic targets
    pub fn refresh_dynamic_geometry(&mut self) {
        let mut refreshed = 0;
        for &index in &self.dynamic_target_indices {
            let Some(target) = self.targets.get(index).and_then(TargetRef::upgrade) else {
                continue;
            };
            let sphere = target.update_and_get_bounding_sphere();
            self.bounding_spheres[index] = sphere;
            self.engine.update_bounding_sphere(index, sphere);
            refreshed += 1;
        }
        log::trace!("Refreshed {} dynamic spheres in culling group {}", refreshed, self.key);
    }

    /// Per-tick entry point
    ///
    /// Commits staged changes when the update mode is
    /// [`TargetsUpdateMode::EveryUpdate`], then refreshes dynamic geometry.
    pub fn update(&mut self) {
        if self.targets_update_mode == TargetsUpdateMode::EveryUpdate {
            self.rebuild();
        }
        self.refresh_dynamic_geometry();
    }

    /// Index of a tracked target
    pub fn index_of(&self, target: &TargetRef) -> Option<usize> {
        self.targets.iter().position(|tracked| tracked == target)
    }

    /// Whether a tracked target is visible, `None` if it is not tracked
    pub fn is_visible(&self, target: &TargetRef) -> Option<bool> {
        self.index_of(target).map(|index| self.engine.is_visible(index))
    }

    /// Distance band of a tracked target, `None` if it is not tracked
    pub fn distance_band(&self, target: &TargetRef) -> Option<usize> {
        self.index_of(target).map(|index| self.engine.distance_band(index))
    }

    /// Deliver pending engine events to targets and proxy listeners
    ///
    /// The proxy borrow is released before any listener runs, so listeners
    /// may query the proxy. Events for indices whose target has died are
    /// only delivered to the proxy listeners. Returns the number of events.
    pub fn dispatch_state_changes(proxy: &SharedProxy) -> usize {
        let (deliveries, proxy_listeners) = {
            let mut this = proxy.borrow_mut();
            let mut events = std::mem::take(&mut this.event_buffer);
            this.engine.drain_state_changes(&mut events);

            let deliveries: Vec<_> = events
                .iter()
                .map(|event| (*event, this.targets.get(event.index).and_then(TargetRef::upgrade)))
                .collect();

            events.clear();
            this.event_buffer = events;
            (deliveries, this.state_changed.clone())
        };

        for (event, target) in &deliveries {
            if let Some(target) = target {
                target.state_changed().notify(event);
            }
            proxy_listeners.notify(event);
        }
        deliveries.len()
    }

    /// Key this proxy registers under
    pub fn key(&self) -> GroupKey {
        self.key
    }

    /// Lifecycle state
    pub fn state(&self) -> ProxyState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ProxyState) {
        self.state = state;
        self.engine.set_enabled(state == ProxyState::Enabled);
    }

    pub(crate) fn release_dynamic_indices(&mut self) {
        std::mem::take(&mut self.dynamic_target_indices).dispose();
    }

    /// When staged changes are committed
    pub fn targets_update_mode(&self) -> TargetsUpdateMode {
        self.targets_update_mode
    }

    /// Change when staged changes are committed
    pub fn set_targets_update_mode(&mut self, mode: TargetsUpdateMode) {
        self.targets_update_mode = mode;
    }

    /// Camera the group is evaluated against
    pub fn target_camera(&self) -> Option<Camera> {
        self.target_camera
    }

    /// Change the camera, forwarded to the engine
    pub fn set_target_camera(&mut self, camera: Option<Camera>) {
        self.target_camera = camera;
        self.engine.set_target_camera(camera);
    }

    /// Point distances are measured from
    pub fn distance_reference_point(&self) -> Option<Vec3> {
        self.distance_reference_point
    }

    /// Change the distance reference point, forwarded to the engine
    pub fn set_distance_reference_point(&mut self, point: Option<Vec3>) {
        self.distance_reference_point = point;
        self.engine.set_distance_reference_point(point);
    }

    /// Configured distance thresholds
    pub fn bounding_distances(&self) -> &[f32] {
        &self.bounding_distances
    }

    /// Change the distance thresholds
    ///
    /// An empty list gives the engine a single unbounded band.
    pub fn set_bounding_distances(&mut self, distances: Vec<f32>) {
        self.bounding_distances = distances;
        if self.bounding_distances.is_empty() {
            self.engine.set_bounding_distances(&UNBOUNDED_DISTANCES);
        } else {
            self.engine.set_bounding_distances(&self.bounding_distances);
        }
    }

    /// Committed targets in index order
    pub fn targets(&self) -> &[TargetRef] {
        &self.targets
    }

    /// Sphere snapshot, at least as long as the target list
    pub fn bounding_spheres(&self) -> &[BoundingSphere] {
        &self.bounding_spheres
    }

    /// Ascending indices of targets refreshed every update
    pub fn dynamic_target_indices(&self) -> &[usize] {
        self.dynamic_target_indices.as_slice()
    }

    /// Whether any addition or removal is staged
    pub fn has_pending_changes(&self) -> bool {
        !self.targets_to_add.is_empty() || !self.targets_to_remove.is_empty()
    }

    /// Listeners notified of every state change in this group
    pub fn on_state_changed(&self) -> &StateChangedListeners {
        &self.state_changed
    }

    /// Visibility engine fed by this proxy
    pub fn engine(&self) -> &dyn VisibilityEngine {
        self.engine.as_ref()
    }
}

impl std::fmt::Debug for CullingGroupProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CullingGroupProxy")
            .field("key", &self.key)
            .field("state", &self.state)
            .field("targets", &self.targets.len())
            .field("pending_add", &self.targets_to_add.len())
            .field("pending_remove", &self.targets_to_remove.len())
            .finish_non_exhaustive()
    }
}
