//! Inbound device messages.
//!
//! Devices publish untyped JSON objects discriminated by `messageType`.
//! [`DeviceMessage::parse`] validates the mandatory fields of each type and
//! the report types know how to turn themselves into time-series points.

#[cfg(feature = "legacy-payloads")]
mod legacy;

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::id::DeviceKey;
use crate::literal;
use crate::time::{Timestamp, parse_timestamp};
use crate::timeseries::{FieldValue, Point};

pub const MESSAGE_TYPE_KEY: &str = "messageType";

/// Variable whose value is a light spectrum keyed by wavelength band.
pub const SPECTRUM_VAR: &str = "light_spectrum_nm_percent";

/// Measurement used for `EnvVar` reports.
pub const ENV_VARS_MEASUREMENT: &str = "env_vars";
/// Measurement used for uploaded images.
pub const IMAGES_MEASUREMENT: &str = "images";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    EnvVar,
    CommandReply,
    /// Chunked images from old firmware. Accepted but not processed.
    Image,
    ImageUpload,
    RecipeEvent,
}

impl MessageType {
    pub const ALL: [Self; 5] = [
        Self::EnvVar,
        Self::CommandReply,
        Self::Image,
        Self::ImageUpload,
        Self::RecipeEvent,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EnvVar => "EnvVar",
            Self::CommandReply => "CommandReply",
            Self::Image => "Image",
            Self::ImageUpload => "ImageUpload",
            Self::RecipeEvent => "RecipeEvent",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownMessageType(s.to_string()))
    }
}

/// `EnvVar` or `CommandReply` payload: a variable name and its encoded values.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableReport {
    pub var: String,
    /// Either literal text (`"{'values':[...]}"`) or an already decoded object.
    pub values: Value,
}

/// The sensor name and value carried by the first entry of `values`.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorValue {
    pub name: Option<String>,
    pub value: Value,
}

/// `Image` or `ImageUpload` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReport {
    pub var_name: Option<String>,
    pub image_type: Option<String>,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeAction {
    Start { name: String },
    Stop,
    End,
}

/// A validated inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceMessage {
    EnvVar(VariableReport),
    CommandReply(VariableReport),
    Image(ImageReport),
    ImageUpload(ImageReport),
    RecipeEvent(RecipeAction),
}

fn text_field(payload: &Map<String, Value>, key: &str) -> Option<String> {
    match payload.get(key)? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn required_text(payload: &Map<String, Value>, key: &'static str) -> Result<String, ValidationError> {
    text_field(payload, key).ok_or(ValidationError::MissingField(key))
}

impl DeviceMessage {
    /// Validate a raw payload and extract the fields its type requires.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when `messageType` is missing or unknown,
    /// when a mandatory field of that type is absent or when a recipe event
    /// carries an unknown action.
    pub fn parse(payload: &Map<String, Value>) -> Result<Self, ValidationError> {
        let kind: MessageType = payload
            .get(MESSAGE_TYPE_KEY)
            .and_then(Value::as_str)
            .ok_or(ValidationError::MissingField(MESSAGE_TYPE_KEY))?
            .parse()?;

        match kind {
            MessageType::EnvVar | MessageType::CommandReply => {
                let report = VariableReport {
                    var: required_text(payload, "var")?,
                    values: payload
                        .get("values")
                        .filter(|value| !value.is_null())
                        .cloned()
                        .ok_or(ValidationError::MissingField("values"))?,
                };
                Ok(if kind == MessageType::EnvVar {
                    Self::EnvVar(report)
                } else {
                    Self::CommandReply(report)
                })
            }
            MessageType::Image | MessageType::ImageUpload => {
                let report = ImageReport {
                    var_name: text_field(payload, "varName"),
                    image_type: text_field(payload, "imageType"),
                    file_name: required_text(payload, "fileName")?,
                };
                Ok(if kind == MessageType::Image {
                    Self::Image(report)
                } else {
                    Self::ImageUpload(report)
                })
            }
            MessageType::RecipeEvent => {
                let action = required_text(payload, "action")?;
                let action = match action.as_str() {
                    "start" => RecipeAction::Start {
                        name: required_text(payload, "name")?,
                    },
                    "stop" => RecipeAction::Stop,
                    "end" => RecipeAction::End,
                    _ => return Err(ValidationError::UnknownRecipeAction(action)),
                };
                Ok(Self::RecipeEvent(action))
            }
        }
    }

    #[must_use]
    pub fn kind(&self) -> MessageType {
        match self {
            Self::EnvVar(_) => MessageType::EnvVar,
            Self::CommandReply(_) => MessageType::CommandReply,
            Self::Image(_) => MessageType::Image,
            Self::ImageUpload(_) => MessageType::ImageUpload,
            Self::RecipeEvent(_) => MessageType::RecipeEvent,
        }
    }
}

fn first_entry(decoded: &Value) -> Option<SensorValue> {
    let first = decoded.get("values")?.as_array()?.first()?;
    Some(SensorValue {
        name: first.get("name").and_then(Value::as_str).map(str::to_string),
        value: first.get("value")?.clone(),
    })
}

impl VariableReport {
    /// Decode `values` and return its first entry.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidValues`] when the payload cannot be
    /// decoded into `{values: [{name, value}]}`.
    pub fn sensor_value(&self) -> Result<SensorValue, ValidationError> {
        match &self.values {
            Value::String(raw) => Self::decode_text(raw),
            decoded => first_entry(decoded)
                .ok_or_else(|| ValidationError::InvalidValues(decoded.to_string())),
        }
    }

    #[cfg(feature = "legacy-payloads")]
    fn decode_text(raw: &str) -> Result<SensorValue, ValidationError> {
        if let Some(found) = literal::parse(raw).ok().as_ref().and_then(first_entry) {
            return Ok(found);
        }
        let value = legacy::scan_value(raw)
            .map_err(|err| ValidationError::InvalidValues(err.to_string()))?;
        Ok(SensorValue {
            name: legacy::scan_name(raw),
            value,
        })
    }

    #[cfg(not(feature = "legacy-payloads"))]
    fn decode_text(raw: &str) -> Result<SensorValue, ValidationError> {
        let decoded =
            literal::parse(raw).map_err(|err| ValidationError::InvalidValues(err.to_string()))?;
        first_entry(&decoded).ok_or_else(|| ValidationError::InvalidValues(raw.to_string()))
    }

    #[must_use]
    pub fn is_spectrum(&self) -> bool {
        self.var == SPECTRUM_VAR
    }

    /// Build the time-series point for this report.
    ///
    /// `measurement` is `env_vars` for environment variables and the
    /// variable name for command replies.
    ///
    /// # Errors
    ///
    /// Propagates [`VariableReport::sensor_value`] failures.
    pub fn to_point(
        &self,
        measurement: &str,
        device: &DeviceKey,
        time: Timestamp,
    ) -> Result<Point, ValidationError> {
        let sensor = self.sensor_value()?;
        let mut point = Point::new(measurement, time)
            .tag("device_id", device.as_str())
            .tag("sensor", sensor.name.as_deref().unwrap_or("None"))
            .tag("isSpectrum", self.is_spectrum().to_string());

        match (&sensor.value, self.is_spectrum()) {
            (Value::Object(bands), true) => {
                for (band, value) in bands {
                    if let Some(field) = FieldValue::from_json(value) {
                        point.fields.insert(spectrum_field_name(band), field);
                    }
                }
            }
            (value, _) => {
                if let Some(field) = FieldValue::from_json(value) {
                    point.fields.insert(self.var.clone(), field);
                }
            }
        }
        Ok(point)
    }
}

/// `400-449` becomes `band_400-449`; any other key is kept as is.
fn spectrum_field_name(key: &str) -> String {
    let is_band = key.split_once('-').is_some_and(|(lo, hi)| {
        !lo.is_empty()
            && !hi.is_empty()
            && lo.bytes().all(|b| b.is_ascii_digit())
            && hi.bytes().all(|b| b.is_ascii_digit())
    });
    if is_band {
        format!("band_{key}")
    } else {
        key.to_string()
    }
}

/// Structured form of an uploaded image file name:
/// `<device>_<YYYY-MM-DD>_<Thh-mm-ssZ>_<sensor>.<ext>`.
///
/// The device part may itself contain underscores, so the name is split
/// from the right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFileName {
    pub device: String,
    pub date: String,
    pub time: String,
    pub sensor: String,
}

impl FromStr for ImageFileName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidFileName(s.to_string());
        let mut parts = s.rsplitn(4, '_');
        let sensor_part = parts.next().ok_or_else(invalid)?;
        let time = parts.next().ok_or_else(invalid)?;
        let date = parts.next().ok_or_else(invalid)?;
        let device = parts.next().ok_or_else(invalid)?;

        let sensor = sensor_part.split('.').next().unwrap_or_default();
        if device.is_empty() || sensor.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            device: device.to_string(),
            date: date.to_string(),
            time: time.to_string(),
            sensor: sensor.to_string(),
        })
    }
}

impl ImageFileName {
    /// Capture time: the date joined with the time part, `-` read as `:`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTimestamp`] when the joined text is
    /// not a UTC timestamp.
    pub fn capture_time(&self) -> Result<Timestamp, ValidationError> {
        parse_timestamp(&format!("{}{}", self.date, self.time.replace('-', ":")))
    }
}

impl ImageReport {
    /// Point for the `images` measurement, timed at capture.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the file name is malformed.
    pub fn to_point(&self, device: &DeviceKey) -> Result<Point, ValidationError> {
        let parsed: ImageFileName = self.file_name.parse()?;
        Ok(Point::new(IMAGES_MEASUREMENT, parsed.capture_time()?)
            .tag("device_id", device.as_str())
            .tag("sensor", parsed.sensor)
            .field("filename", self.file_name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    fn device() -> DeviceKey {
        "EDU-1".parse().unwrap()
    }

    fn ts(s: &str) -> Timestamp {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn should_parse_env_var_message() {
        let message = DeviceMessage::parse(&payload(json!({
            "messageType": "EnvVar",
            "var": "air_temperature_celcius",
            "values": "{'values':[{'name':'SHT25', 'type':'float', 'value':21.5}]}"
        })))
        .unwrap();
        assert_eq!(message.kind(), MessageType::EnvVar);
    }

    #[test]
    fn should_reject_missing_message_type() {
        assert_eq!(
            DeviceMessage::parse(&payload(json!({"var": "x"}))),
            Err(ValidationError::MissingField(MESSAGE_TYPE_KEY))
        );
    }

    #[test]
    fn should_reject_unknown_message_type() {
        assert_eq!(
            DeviceMessage::parse(&payload(json!({"messageType": "Heartbeat"}))),
            Err(ValidationError::UnknownMessageType("Heartbeat".to_string()))
        );
    }

    #[test]
    fn should_require_var_and_values() {
        let err = DeviceMessage::parse(&payload(json!({
            "messageType": "CommandReply",
            "var": "status"
        })))
        .unwrap_err();
        assert_eq!(err, ValidationError::MissingField("values"));
    }

    #[test]
    fn should_require_file_name_for_uploads() {
        let err = DeviceMessage::parse(&payload(json!({
            "messageType": "ImageUpload",
            "varName": "Camera-Top"
        })))
        .unwrap_err();
        assert_eq!(err, ValidationError::MissingField("fileName"));
    }

    #[test]
    fn should_require_name_when_recipe_starts() {
        let err = DeviceMessage::parse(&payload(json!({
            "messageType": "RecipeEvent",
            "action": "start"
        })))
        .unwrap_err();
        assert_eq!(err, ValidationError::MissingField("name"));

        let stop = DeviceMessage::parse(&payload(json!({
            "messageType": "RecipeEvent",
            "action": "stop"
        })))
        .unwrap();
        assert_eq!(stop, DeviceMessage::RecipeEvent(RecipeAction::Stop));
    }

    #[test]
    fn should_reject_unknown_recipe_action() {
        let err = DeviceMessage::parse(&payload(json!({
            "messageType": "RecipeEvent",
            "action": "pause"
        })))
        .unwrap_err();
        assert_eq!(err, ValidationError::UnknownRecipeAction("pause".to_string()));
    }

    #[test]
    fn should_extract_first_sensor_value() {
        let report = VariableReport {
            var: "air_temperature_celcius".to_string(),
            values: json!("{'values':[{'name':'SHT25', 'type':'float', 'value':21.5}]}"),
        };
        let sensor = report.sensor_value().unwrap();
        assert_eq!(sensor.name.as_deref(), Some("SHT25"));
        assert_eq!(sensor.value, json!(21.5));
    }

    #[test]
    fn should_decode_deeply_nested_values_without_overflowing() {
        let raw = format!("{}{}", "[".repeat(200_000), "]".repeat(200_000));
        let report = VariableReport {
            var: "air_temperature_celcius".to_string(),
            values: Value::String(raw.clone()),
        };
        let result = report.sensor_value();
        if cfg!(feature = "legacy-payloads") {
            // no markers to scan, so the raw text is kept
            assert_eq!(result.unwrap().value, Value::String(raw));
        } else {
            assert!(matches!(result, Err(ValidationError::InvalidValues(_))));
        }
    }

    #[test]
    fn should_accept_already_decoded_values() {
        let report = VariableReport {
            var: "status".to_string(),
            values: json!({"values": [{"name": "status", "value": "OK"}]}),
        };
        assert_eq!(report.sensor_value().unwrap().value, json!("OK"));
    }

    #[test]
    fn should_build_env_var_point() {
        let report = VariableReport {
            var: "air_temperature_celcius".to_string(),
            values: json!("{'values':[{'name':'SHT25', 'type':'float', 'value':21.5}]}"),
        };
        let point = report
            .to_point(ENV_VARS_MEASUREMENT, &device(), ts("2024-01-01T00:00:00Z"))
            .unwrap();
        assert_eq!(point.measurement, "env_vars");
        assert_eq!(point.tags["device_id"], "EDU-1");
        assert_eq!(point.tags["sensor"], "SHT25");
        assert_eq!(point.tags["isSpectrum"], "false");
        assert_eq!(point.fields["air_temperature_celcius"], FieldValue::Float(21.5));
    }

    #[test]
    fn should_flatten_spectrum_into_band_fields() {
        let report = VariableReport {
            var: SPECTRUM_VAR.to_string(),
            values: json!({"values": [{"name": "LEDPanel-Top", "value": {"400-449": 10.5, "450-499": 89.5}}]}),
        };
        let point = report
            .to_point(ENV_VARS_MEASUREMENT, &device(), ts("2024-01-01T00:00:00Z"))
            .unwrap();
        assert_eq!(point.tags["isSpectrum"], "true");
        assert_eq!(point.fields["band_400-449"], FieldValue::Float(10.5));
        assert_eq!(point.fields["band_450-499"], FieldValue::Float(89.5));
        assert!(!point.fields.contains_key(SPECTRUM_VAR));
    }

    #[cfg(feature = "legacy-payloads")]
    #[test]
    fn should_recover_nested_quote_payload() {
        let report = VariableReport {
            var: SPECTRUM_VAR.to_string(),
            values: json!(
                "{'values':[{'name':'LEDPanel-Top', 'type':'str', 'value':'{'400-449': 0.0, '500-549': 83.33}'}]}"
            ),
        };
        let sensor = report.sensor_value().unwrap();
        assert_eq!(sensor.name.as_deref(), Some("LEDPanel-Top"));
        assert_eq!(sensor.value, json!({"400-449": 0.0, "500-549": 83.33}));
    }

    #[test]
    fn should_parse_image_file_name() {
        let parsed: ImageFileName = "EDU-6B1261EF-b8-27-eb-7f-f2-73_2020-06-05_T19-42-52Z_Camera-Top.png"
            .parse()
            .unwrap();
        assert_eq!(parsed.device, "EDU-6B1261EF-b8-27-eb-7f-f2-73");
        assert_eq!(parsed.sensor, "Camera-Top");
        assert_eq!(parsed.capture_time().unwrap(), ts("2020-06-05T19:42:52Z"));
    }

    #[test]
    fn should_allow_underscores_in_device_part() {
        let parsed: ImageFileName = "my_device_2020-06-05_T19-42-52Z_Camera-Side.jpg".parse().unwrap();
        assert_eq!(parsed.device, "my_device");
        assert_eq!(parsed.sensor, "Camera-Side");
    }

    #[test]
    fn should_reject_short_file_name() {
        assert!("2020-06-05_T19-42-52Z.png".parse::<ImageFileName>().is_err());
    }

    #[test]
    fn should_build_image_point_at_capture_time() {
        let report = ImageReport {
            var_name: None,
            image_type: None,
            file_name: "EDU-1_2020-06-05_T19-42-52Z_Camera-Top.png".to_string(),
        };
        let point = report.to_point(&device()).unwrap();
        assert_eq!(point.measurement, "images");
        assert_eq!(point.time, ts("2020-06-05T19:42:52Z"));
        assert_eq!(point.tags["sensor"], "Camera-Top");
        assert_eq!(
            point.fields["filename"],
            FieldValue::String("EDU-1_2020-06-05_T19-42-52Z_Camera-Top.png".to_string())
        );
    }
}
