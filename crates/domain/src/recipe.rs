//! Recipe documents and the recipe generator configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::id::RecipeId;
use crate::time::{Timestamp, format_timestamp};

/// A phased environmental program sent to a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub format: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp_utc: Option<String>,
    pub name: String,
    pub uuid: RecipeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_recipe_uuid: Option<RecipeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_recipe_uuids: Option<Vec<RecipeId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Description>,
    #[serde(default)]
    pub authors: Vec<Contributor>,
    #[serde(default)]
    pub cultivars: Vec<Contributor>,
    #[serde(default)]
    pub cultivation_methods: Vec<Contributor>,
    pub environments: BTreeMap<String, Environment>,
    pub phases: Vec<Phase>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    #[serde(default)]
    pub brief: String,
    #[serde(default)]
    pub verbose: String,
}

/// Named reference used for authors, cultivars and cultivation methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

/// A named set of environment setpoints (light spectrum, temperature, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,
    #[serde(flatten)]
    pub setpoints: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    pub repeat: u32,
    pub cycles: Vec<Cycle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    pub name: String,
    pub environment: String,
    pub duration_hours: f64,
}

impl Recipe {
    /// Check structural invariants the device relies on.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidRecipe`] when the name is blank,
    /// there are no phases, a cycle references an unknown environment or a
    /// cycle duration is negative or not finite.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::InvalidRecipe("name is empty"));
        }
        if self.phases.is_empty() {
            return Err(ValidationError::InvalidRecipe("recipe has no phases"));
        }
        for cycle in self.phases.iter().flat_map(|phase| &phase.cycles) {
            if !self.environments.contains_key(&cycle.environment) {
                return Err(ValidationError::InvalidRecipe(
                    "cycle references an unknown environment",
                ));
            }
            if !cycle.duration_hours.is_finite() || cycle.duration_hours < 0.0 {
                return Err(ValidationError::InvalidRecipe(
                    "cycle duration must be a non-negative number of hours",
                ));
            }
        }
        Ok(())
    }

    /// Total program length: each phase's cycles times its repeat count.
    #[must_use]
    pub fn total_duration_hours(&self) -> f64 {
        self.phases
            .iter()
            .map(|phase| {
                let cycle_hours: f64 = phase.cycles.iter().map(|c| c.duration_hours).sum();
                f64::from(phase.repeat) * cycle_hours
            })
            .sum()
    }
}

/// Recipe generator configuration: a free-form JSON document stored as a
/// singleton record and snapshotted to the analytical store on every write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeConfig(pub Map<String, Value>);

impl RecipeConfig {
    pub const DEVICES_TO_CONTROL: &'static str = "devices_to_control";

    /// First entry of `devices_to_control`, used as the snapshot row key.
    #[must_use]
    pub fn primary_device(&self) -> Option<&str> {
        self.0
            .get(Self::DEVICES_TO_CONTROL)?
            .as_array()?
            .first()?
            .as_str()
    }

    /// Record the time of this write inside the document.
    pub fn stamp(&mut self, at: Timestamp) {
        self.0
            .insert("timestamp".to_string(), Value::String(format_timestamp(at)));
    }
}
