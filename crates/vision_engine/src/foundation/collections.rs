//! Specialized collection types

pub use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Stable handle to a subscribed state-change listener
    pub struct ListenerKey;
}

/// Handle-based map using slot map for stable references
///
/// Removing an entry never invalidates the handles of the others, and a
/// handle to a removed entry never resolves to a later insertion.
pub type HandleMap<K, T> = SlotMap<K, T>;
