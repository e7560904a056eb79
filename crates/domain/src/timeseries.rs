//! Points written to the time-series database.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::time::Timestamp;

/// A single field value. Integers and floats are kept apart so the sink can
/// preserve the type the device reported.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    Boolean(bool),
    String(String),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl FieldValue {
    /// Convert a decoded JSON value. `null` has no field representation;
    /// arrays and objects are stored as their JSON text.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(flag) => Some(Self::Boolean(*flag)),
            Value::Number(number) => number
                .as_i64()
                .map(Self::Integer)
                .or_else(|| number.as_f64().map(Self::Float)),
            Value::String(text) => Some(Self::String(text.clone())),
            Value::Array(_) | Value::Object(_) => Some(Self::String(value.to_string())),
        }
    }
}

/// One measurement sample: `measurement` plus indexed `tags` and `fields`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub measurement: String,
    #[serde(with = "crate::time::wire")]
    pub time: Timestamp,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, FieldValue>,
}

impl Point {
    #[must_use]
    pub fn new(measurement: impl Into<String>, time: Timestamp) -> Self {
        Self {
            measurement: measurement.into(),
            time,
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn should_keep_integers_and_floats_apart() {
        assert_eq!(FieldValue::from_json(&json!(3)), Some(FieldValue::Integer(3)));
        assert_eq!(FieldValue::from_json(&json!(3.5)), Some(FieldValue::Float(3.5)));
    }

    #[test]
    fn should_skip_null_and_stringify_objects() {
        assert_eq!(FieldValue::from_json(&Value::Null), None);
        assert_eq!(
            FieldValue::from_json(&json!({"a": 1})),
            Some(FieldValue::String(r#"{"a":1}"#.to_string()))
        );
    }

    #[test]
    fn should_build_point_with_tags_and_fields() {
        let time = crate::time::parse_timestamp("2024-01-01T00:00:00Z").unwrap();
        let point = Point::new("env_vars", time)
            .tag("device_id", "EDU-1")
            .field("air_temperature_celcius", 21.5);
        assert_eq!(point.tags["device_id"], "EDU-1");
        assert_eq!(point.fields["air_temperature_celcius"], FieldValue::Float(21.5));
    }
}
