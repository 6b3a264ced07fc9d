//! Culling settings
//!
//! [`VisionSettings`] names the group keys so tools can show them
//! symbolically; the runtime only ever uses the integer [`GroupKey`].
//! [`ProxySettings`] describes a single culling group proxy declaratively.

use std::collections::HashSet;

use super::{Config, ConfigError, Deserialize, Serialize};
use crate::culling::{GroupKey, TargetsUpdateMode};
use crate::foundation::math::Vec3;

/// Name of one group key; its position in the list is the key value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupKeyDefinition {
    /// Display name
    pub name: String,
}

impl GroupKeyDefinition {
    /// Create a key definition
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Project-wide group key names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionSettings {
    /// Ordered key definitions, index `i` names key `i`
    pub group_key_definitions: Vec<GroupKeyDefinition>,
}

impl Default for VisionSettings {
    fn default() -> Self {
        Self {
            group_key_definitions: vec![GroupKeyDefinition::new("Main")],
        }
    }
}

impl VisionSettings {
    /// Name of `key`, `None` for the sentinel or an undefined key
    pub fn key_name(&self, key: GroupKey) -> Option<&str> {
        let index = usize::try_from(key.value()).ok()?;
        self.group_key_definitions
            .get(index)
            .map(|definition| definition.name.as_str())
    }

    /// Key defined with `name`, [`GroupKey::NONE`] if there is none
    pub fn find_key(&self, name: &str) -> GroupKey {
        self.group_key_definitions
            .iter()
            .position(|definition| definition.name == name)
            .and_then(|index| i32::try_from(index).ok())
            .map_or(GroupKey::NONE, GroupKey::new)
    }

    /// All defined keys with their names, in definition order
    pub fn keys(&self) -> impl Iterator<Item = (GroupKey, &str)> + '_ {
        self.group_key_definitions
            .iter()
            .zip(0..)
            .map(|(definition, value)| (GroupKey::new(value), definition.name.as_str()))
    }
}

impl Config for VisionSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for definition in &self.group_key_definitions {
            if definition.name.trim().is_empty() {
                return Err(ConfigError::Invalid("group key name is empty".to_string()));
            }
            if !seen.insert(definition.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "group key name '{}' is defined more than once",
                    definition.name
                )));
            }
        }
        Ok(())
    }
}

/// Declarative set-up of one culling group proxy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    /// Key the proxy registers under
    pub key: GroupKey,

    /// When pending target changes are committed
    pub targets_update_mode: TargetsUpdateMode,

    /// Ascending distance band thresholds, empty for a single unbounded band
    pub bounding_distances: Vec<f32>,

    /// Point distances are measured from, the camera position when unset
    pub distance_reference_point: Option<Vec3>,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            key: GroupKey::NONE,
            targets_update_mode: TargetsUpdateMode::EveryUpdate,
            bounding_distances: Vec::new(),
            distance_reference_point: None,
        }
    }
}

impl Config for ProxySettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(distance) = self
            .bounding_distances
            .iter()
            .find(|distance| distance.is_nan() || **distance < 0.0)
        {
            return Err(ConfigError::Invalid(format!(
                "bounding distance {distance} must be a non-negative number"
            )));
        }

        if self.bounding_distances.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(ConfigError::Invalid(
                "bounding distances must be in ascending order".to_string(),
            ));
        }

        Ok(())
    }
}
