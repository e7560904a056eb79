//! Append-only rows for the analytical store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::time::{Timestamp, format_timestamp};

/// Table names rows are appended to.
pub mod table {
    pub const RECIPE_GENERATOR_CONFIG: &str = "recipe_generator_config";
    pub const RECIPE: &str = "recipe";
    pub const WEATHER_DEVICE: &str = "device";
    pub const WEATHER_COMPUTED: &str = "computed";
    pub const WEATHER_RAW_FIVE_MIN: &str = "raw_five_min";
    pub const WEATHER_RAW_AUX: &str = "raw_aux";
}

/// One analytics row. `key` identifies the source (device or station) and
/// `timestamp` is the wire time the row refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsRow {
    pub table: String,
    pub key: String,
    pub timestamp: String,
    pub payload: Value,
}

impl AnalyticsRow {
    #[must_use]
    pub fn new(
        table: impl Into<String>,
        key: impl Into<String>,
        timestamp: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
            timestamp: timestamp.into(),
            payload,
        }
    }

    #[must_use]
    pub fn at(table: &str, key: &str, at: Timestamp, payload: Value) -> Self {
        Self::new(table, key, format_timestamp(at), payload)
    }
}
