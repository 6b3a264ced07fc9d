//! Culling targets
//!
//! Anything that wants to be tracked by a [`CullingGroupProxy`] implements
//! [`CullingTarget`] and is shared as an `Rc`. The proxy only keeps weak
//! [`TargetRef`] handles, so a target dropped by its owner shows up as dead
//! instead of being kept alive by the registry.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use super::directory::GroupDirectory;
use super::key::GroupKey;
use super::proxy::{CullingGroupProxy, SharedProxy};
use crate::events::StateChangedListeners;
use crate::foundation::math::{BoundingSphere, Vec3};

/// How often a target's bounding sphere is re-read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TransformUpdateMode {
    /// Re-read on every proxy update
    #[default]
    Dynamic,
    /// Re-read only on rebuilds and explicit refreshes
    Static,
}

/// Capabilities a culling proxy needs from a tracked object
pub trait CullingTarget {
    /// Whether the sphere must be refreshed every update
    fn bounding_sphere_update_mode(&self) -> TransformUpdateMode;

    /// Sphere computed by the last call to
    /// [`update_and_get_bounding_sphere`](Self::update_and_get_bounding_sphere)
    fn bounding_sphere(&self) -> BoundingSphere;

    /// Recompute the sphere from the target's current placement
    fn update_and_get_bounding_sphere(&self) -> BoundingSphere;

    /// Listeners notified when this target's visibility or band changes
    fn state_changed(&self) -> &StateChangedListeners;
}

/// Weak, identity-compared handle to a culling target
///
/// Two handles are equal when they point at the same allocation, whether or
/// not the target is still alive.
#[derive(Clone)]
pub struct TargetRef(Weak<dyn CullingTarget>);

impl TargetRef {
    /// Handle to a shared target
    pub fn new<T: CullingTarget + 'static>(target: &Rc<T>) -> Self {
        let weak: Weak<T> = Rc::downgrade(target);
        Self(weak)
    }

    /// Wrap an existing weak reference
    pub fn from_weak(target: Weak<dyn CullingTarget>) -> Self {
        Self(target)
    }

    /// Strong reference to the target, `None` once it has been dropped
    pub fn upgrade(&self) -> Option<Rc<dyn CullingTarget>> {
        self.0.upgrade()
    }

    /// Whether the target is still alive
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    fn address(&self) -> usize {
        self.0.as_ptr().cast::<()>() as usize
    }
}

impl<T: CullingTarget + 'static> From<&Rc<T>> for TargetRef {
    fn from(target: &Rc<T>) -> Self {
        Self::new(target)
    }
}

impl PartialEq for TargetRef {
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl Eq for TargetRef {}

impl Hash for TargetRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

impl fmt::Debug for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetRef")
            .field("address", &format_args!("{:#x}", self.address()))
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Stock culling target with a position and a radius
///
/// Registers itself with the proxy found under its group key when enabled,
/// and stages its own removal when disabled or dropped.
pub struct CullingTargetBehaviour {
    this: Weak<Self>,
    group_key: Cell<GroupKey>,
    update_mode: Cell<TransformUpdateMode>,
    position: Cell<Vec3>,
    radius: Cell<f32>,
    bounding_sphere: Cell<BoundingSphere>,
    group: RefCell<Option<Weak<RefCell<CullingGroupProxy>>>>,
    state_changed: StateChangedListeners,
}

impl CullingTargetBehaviour {
    /// Default bounding sphere radius
    pub const DEFAULT_RADIUS: f32 = 1.0;

    /// Create a target that is not yet attached to any group
    pub fn new(group_key: GroupKey, update_mode: TransformUpdateMode, position: Vec3) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            group_key: Cell::new(group_key),
            update_mode: Cell::new(update_mode),
            position: Cell::new(position),
            radius: Cell::new(Self::DEFAULT_RADIUS),
            bounding_sphere: Cell::new(BoundingSphere::default()),
            group: RefCell::new(None),
            state_changed: StateChangedListeners::new(),
        })
    }

    /// Handle the proxy tracks this target by
    pub fn target_ref(&self) -> TargetRef {
        TargetRef::from_weak(self.this.clone())
    }

    /// Attach to the proxy registered under the group key
    ///
    /// Returns false when no proxy holds the key; the target then stays
    /// detached.
    pub fn enable(&self, directory: &GroupDirectory) -> bool {
        self.disable();

        let Some(proxy) = directory.get(self.group_key.get()) else {
            log::debug!("No culling group under key {}, target stays detached", self.group_key.get());
            return false;
        };

        proxy.borrow_mut().add(self.target_ref());
        *self.group.borrow_mut() = Some(Rc::downgrade(&proxy));
        true
    }

    /// Detach from the current group, staging removal
    pub fn disable(&self) {
        let group = self.group.borrow_mut().take();
        if let Some(proxy) = group.and_then(|group| group.upgrade()) {
            proxy.borrow_mut().remove(self.target_ref());
        }
    }

    /// Group the target is attached to
    pub fn group(&self) -> Option<SharedProxy> {
        self.group.borrow().as_ref().and_then(Weak::upgrade)
    }

    /// Key of the group this target joins
    pub fn group_key(&self) -> GroupKey {
        self.group_key.get()
    }

    /// Change the group key, moving an attached target to the new group
    pub fn set_group_key(&self, key: GroupKey, directory: &GroupDirectory) {
        if self.group_key.get() == key {
            return;
        }

        let attached = self.group.borrow().is_some();
        self.disable();
        self.group_key.set(key);
        if attached {
            self.enable(directory);
        }
    }

    /// Set how often the sphere is refreshed
    ///
    /// An attached target asks its group to re-partition its dynamic
    /// targets.
    pub fn set_update_mode(&self, mode: TransformUpdateMode) {
        if self.update_mode.replace(mode) != mode {
            if let Some(proxy) = self.group() {
                proxy.borrow_mut().refresh_dynamic();
            }
        }
    }

    /// World position of the sphere centre
    pub fn position(&self) -> Vec3 {
        self.position.get()
    }

    /// Move the sphere centre
    pub fn set_position(&self, position: Vec3) {
        self.position.set(position);
    }

    /// Sphere radius
    pub fn radius(&self) -> f32 {
        self.radius.get()
    }

    /// Change the sphere radius
    pub fn set_radius(&self, radius: f32) {
        self.radius.set(radius);
    }

    /// Visibility reported by the owning group
    ///
    /// A detached target, or one the group has not committed yet, counts as
    /// visible.
    pub fn is_visible(&self) -> bool {
        self.group()
            .and_then(|proxy| proxy.borrow().is_visible(&self.target_ref()))
            .unwrap_or(true)
    }

    /// Distance band reported by the owning group, `None` when not tracked
    pub fn distance_band(&self) -> Option<usize> {
        self.group()
            .and_then(|proxy| proxy.borrow().distance_band(&self.target_ref()))
    }
}

impl CullingTarget for CullingTargetBehaviour {
    fn bounding_sphere_update_mode(&self) -> TransformUpdateMode {
        self.update_mode.get()
    }

    fn bounding_sphere(&self) -> BoundingSphere {
        self.bounding_sphere.get()
    }

    fn update_and_get_bounding_sphere(&self) -> BoundingSphere {
        let sphere = BoundingSphere::new(self.position.get(), self.radius.get());
        self.bounding_sphere.set(sphere);
        sphere
    }

    fn state_changed(&self) -> &StateChangedListeners {
        &self.state_changed
    }
}

impl Drop for CullingTargetBehaviour {
    fn drop(&mut self) {
        let group = self.group.get_mut().take();
        if let Some(proxy) = group.and_then(|group| group.upgrade()) {
            match proxy.try_borrow_mut() {
                Ok(mut proxy) => proxy.remove(self.target_ref()),
                // The dead entry is pruned by the group's next rebuild
                Err(_) => log::warn!(
                    "Culling target dropped while its group {} was busy, removal not staged",
                    self.group_key.get()
                ),
            }
        }
    }
}

impl fmt::Debug for CullingTargetBehaviour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CullingTargetBehaviour")
            .field("group_key", &self.group_key.get())
            .field("update_mode", &self.update_mode.get())
            .field("position", &self.position.get())
            .field("radius", &self.radius.get())
            .field("attached", &self.group.borrow().is_some())
            .finish()
    }
}
