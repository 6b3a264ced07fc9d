//! Event system following Game Engine Architecture Ch 16.8
//!
//! Visibility engines report per-sphere changes as [`CullingGroupEvent`]s
//! keyed by sphere index. The culling proxy resolves each index back to the
//! owning target and publishes the event into that target's
//! [`StateChangedListeners`] and then into the proxy-wide list.
//!
//! Key principles:
//! - Registration system (only subscribed handlers are notified)
//! - Deferred delivery (events are drained after the engine pass, never
//!   delivered while the proxy is mutably borrowed)

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::foundation::collections::{HandleMap, ListenerKey};

/// Visibility or distance band change of one bounding sphere
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CullingGroupEvent {
    /// Index of the sphere in the proxy's bounding sphere array
    pub index: usize,
    /// Distance band before the change
    pub previous_band: usize,
    /// Distance band after the change
    pub current_band: usize,
    /// Visibility before the change
    pub was_visible: bool,
    /// Visibility after the change
    pub is_visible: bool,
}

impl CullingGroupEvent {
    /// Sphere went from invisible to visible
    pub fn has_become_visible(&self) -> bool {
        !self.was_visible && self.is_visible
    }

    /// Sphere went from visible to invisible
    pub fn has_become_invisible(&self) -> bool {
        self.was_visible && !self.is_visible
    }

    /// Sphere moved to another distance band
    pub fn band_changed(&self) -> bool {
        self.previous_band != self.current_band
    }
}

type Listener = Rc<RefCell<dyn FnMut(&CullingGroupEvent)>>;

/// Subscription list for state change events
///
/// Listeners are stored in a handle map so unsubscribing one never
/// invalidates the handles of the others. All methods take `&self`, which
/// lets a listener subscribe or unsubscribe while a notification is running;
/// such changes take effect from the next notification.
#[derive(Default)]
pub struct StateChangedListeners {
    listeners: RefCell<HandleMap<ListenerKey, Listener>>,
}

impl StateChangedListeners {
    /// Create an empty listener list
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener, returning the handle used to unsubscribe it
    pub fn subscribe<F>(&self, listener: F) -> ListenerKey
    where
        F: FnMut(&CullingGroupEvent) + 'static,
    {
        let listener: Listener = Rc::new(RefCell::new(listener));
        self.listeners.borrow_mut().insert(listener)
    }

    /// Remove a listener, returns false if the handle was already stale
    pub fn unsubscribe(&self, key: ListenerKey) -> bool {
        self.listeners.borrow_mut().remove(key).is_some()
    }

    /// Number of subscribed listeners
    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Whether no listener is subscribed
    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }

    /// Deliver an event to every listener subscribed when the call starts
    pub fn notify(&self, event: &CullingGroupEvent) {
        let snapshot: Vec<Listener> = self.listeners.borrow().values().cloned().collect();
        for listener in snapshot {
            // A listener that triggers a nested notification of itself is skipped
            if let Ok(mut callback) = listener.try_borrow_mut() {
                (&mut *callback)(event);
            }
        }
    }
}

impl fmt::Debug for StateChangedListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateChangedListeners")
            .field("len", &self.len())
            .finish()
    }
}
