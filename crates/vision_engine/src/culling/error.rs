//! Culling errors

use super::GroupKey;

/// Errors raised by the culling group registry
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullingError {
    /// Another active proxy already holds this key
    #[error("There is already an active culling group proxy with key {key}")]
    DuplicateKey {
        /// The contested key
        key: GroupKey,
    },
}
