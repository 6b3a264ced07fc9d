//! Group keys

use std::fmt;

use serde::{Deserialize, Serialize};

/// Integer key a culling group proxy registers under
///
/// Any negative value is the "none" sentinel: it is never stored in a
/// [`GroupDirectory`](super::GroupDirectory) and every lookup with it misses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupKey(i32);

impl GroupKey {
    /// The "none" sentinel
    pub const NONE: Self = Self(-1);

    /// Wrap a raw key value
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// Raw key value
    pub const fn value(self) -> i32 {
        self.0
    }

    /// Whether this key is the sentinel (any negative value)
    pub const fn is_none(self) -> bool {
        self.0 < 0
    }
}

impl Default for GroupKey {
    fn default() -> Self {
        Self::NONE
    }
}

impl From<i32> for GroupKey {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl From<GroupKey> for i32 {
    fn from(key: GroupKey) -> Self {
        key.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "None")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
