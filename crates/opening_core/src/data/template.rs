//! Position label templates
//!
//! A template names every start position of a map and places it in the
//! canonical (team 0) frame as a fraction of the map extent. The labeler
//! matches cluster centroids against these slots, so supporting another map
//! only needs another template file.

use crate::config::MapSpec;
use crate::error::{ConfigError, Result};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Supreme Isthmus template (compile-time embedded)
pub const SUPREME_ISTHMUS_YAML: &str = include_str!("../../data/templates/supreme_isthmus.yaml");

/// One named start position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSlot {
    pub label: String,
    /// Fraction of map extent along x, in `0.0..=1.0`
    pub x: f64,
    /// Fraction of map extent along z, in `0.0..=1.0`
    pub z: f64,
}

impl TemplateSlot {
    /// Slot position in map units.
    pub fn position(&self, map: &MapSpec) -> (f64, f64) {
        (self.x * map.size, self.z * map.size)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionTemplate {
    pub map_name: String,
    pub slots: Vec<TemplateSlot>,
}

impl PositionTemplate {
    /// Eight-position template for Supreme Isthmus.
    pub fn supreme_isthmus() -> Result<Self> {
        Self::from_yaml(SUPREME_ISTHMUS_YAML)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|s| s.label.as_str())
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.slots.is_empty() {
            return Err(ConfigError::EmptyTemplate);
        }

        let mut seen = FxHashSet::default();
        for slot in &self.slots {
            if !seen.insert(slot.label.as_str()) {
                return Err(ConfigError::DuplicateLabel {
                    label: slot.label.clone(),
                });
            }
            let in_unit = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
            if !in_unit(slot.x) || !in_unit(slot.z) {
                return Err(ConfigError::TemplateSlotOutOfRange {
                    label: slot.label.clone(),
                });
            }
        }

        Ok(())
    }
}
