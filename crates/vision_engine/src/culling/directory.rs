//! Group directory
//!
//! Maps group keys to the proxy currently holding them. At most one proxy
//! holds a key at a time and the "none" sentinel is never stored.

use std::collections::BTreeMap;
use std::rc::Rc;

use super::engine::Camera;
use super::error::CullingError;
use super::key::GroupKey;
use super::proxy::{CullingGroupProxy, ProxyState, SharedProxy};

/// Key slot table of active culling group proxies
#[derive(Default)]
pub struct GroupDirectory {
    slots: BTreeMap<GroupKey, SharedProxy>,
}

impl GroupDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a proxy under its key and enable it
    ///
    /// Re-activating the proxy that already holds the key is allowed. A proxy
    /// with the sentinel key is enabled without being registered. A proxy
    /// coming back from [`deactivate`](Self::deactivate) gets its dynamic
    /// target indices rebuilt.
    ///
    /// # Errors
    /// Returns [`CullingError::DuplicateKey`] when another proxy holds the
    /// key. Neither proxy is modified in that case.
    pub fn activate(&mut self, proxy: &SharedProxy) -> Result<(), CullingError> {
        let key = proxy.borrow().key();

        if !key.is_none() {
            if let Some(current) = self.slots.get(&key) {
                if !Rc::ptr_eq(current, proxy) {
                    log::warn!("Culling group key {} is already held by another proxy", key);
                    return Err(CullingError::DuplicateKey { key });
                }
            }
            self.slots.insert(key, proxy.clone());
        }

        let mut this = proxy.borrow_mut();
        if this.state() == ProxyState::Inactive {
            // Deactivation released the dynamic indices of the kept targets
            this.refresh_dynamic();
        }
        this.set_state(ProxyState::Enabled);
        log::info!("Activated culling group {}", key);
        Ok(())
    }

    /// Wrap a new proxy and activate it
    ///
    /// # Errors
    /// Returns [`CullingError::DuplicateKey`] when the key is taken; the new
    /// proxy is dropped in that case.
    pub fn activate_new(&mut self, proxy: CullingGroupProxy) -> Result<SharedProxy, CullingError> {
        let proxy = proxy.into_shared();
        self.activate(&proxy)?;
        Ok(proxy)
    }

    /// Unregister a proxy and pause its engine
    ///
    /// The slot is only cleared if it still points at this proxy.
    pub fn disable(&mut self, proxy: &SharedProxy) {
        self.release_slot(proxy);
        let mut this = proxy.borrow_mut();
        if this.state() == ProxyState::Enabled {
            this.set_state(ProxyState::Disabled);
        }
    }

    /// Unregister a proxy and release its pooled storage
    pub fn deactivate(&mut self, proxy: &SharedProxy) {
        self.release_slot(proxy);
        let mut this = proxy.borrow_mut();
        this.release_dynamic_indices();
        this.set_state(ProxyState::Inactive);
        log::info!("Deactivated culling group {}", this.key());
    }

    /// Proxy holding `key`; negative keys always miss
    pub fn get(&self, key: GroupKey) -> Option<SharedProxy> {
        if key.is_none() {
            return None;
        }
        self.slots.get(&key).cloned()
    }

    /// Proxy holding `key`, borrowed from the directory
    pub fn try_get(&self, key: GroupKey) -> Option<&SharedProxy> {
        if key.is_none() {
            return None;
        }
        self.slots.get(&key)
    }

    /// Commit staged changes of every registered proxy
    ///
    /// Returns the number of proxies that actually rebuilt.
    pub fn rebuild_all(&self) -> usize {
        self.slots
            .values()
            .filter(|proxy| proxy.borrow_mut().rebuild())
            .count()
    }

    /// Point the proxy holding `key` at a camera
    ///
    /// Returns false when no proxy holds the key.
    pub fn link_target_camera(&self, key: GroupKey, camera: Camera) -> bool {
        match self.try_get(key) {
            Some(proxy) => {
                proxy.borrow_mut().set_target_camera(Some(camera));
                true
            }
            None => false,
        }
    }

    /// Registered proxies in key order
    pub fn iter(&self) -> impl Iterator<Item = (GroupKey, &SharedProxy)> {
        self.slots.iter().map(|(key, proxy)| (*key, proxy))
    }

    /// Number of registered proxies
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no proxy is registered
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn release_slot(&mut self, proxy: &SharedProxy) {
        let key = proxy.borrow().key();
        let holds_slot = self
            .slots
            .get(&key)
            .is_some_and(|current| Rc::ptr_eq(current, proxy));
        if holds_slot {
            self.slots.remove(&key);
        }
    }
}

impl std::fmt::Debug for GroupDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupDirectory")
            .field("keys", &self.slots.keys().collect::<Vec<_>>())
            .finish()
    }
}
