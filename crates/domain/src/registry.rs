//! Records exchanged with the IoT device registry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// Subfolder devices listen on for recipe start commands.
pub const START_RECIPE_SUBFOLDER: &str = "recipe/start";

/// Config version assumed when a device has never received a config.
pub const DEFAULT_CONFIG_VERSION: u64 = 1;

/// State recorded on a public key once its device is registered.
pub const VERIFIED_STATE: &str = "verified";

/// A device as reported by the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryDevice {
    pub id: String,
    pub last_heartbeat_time: Option<String>,
    pub last_config_send_time: Option<String>,
    pub last_error_time: Option<String>,
    pub last_error_message: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

/// Row of the registry device list shown to admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryDeviceSummary {
    pub device_uuid: String,
    pub last_heartbeat_time: String,
    pub last_error_time: String,
    pub last_error_message: String,
    pub last_config_send_time: String,
    pub user_uuid: Option<String>,
    pub device_notes: String,
    pub device_name: String,
}

impl From<RegistryDevice> for RegistryDeviceSummary {
    fn from(device: RegistryDevice) -> Self {
        let meta = |key: &str| device.metadata.get(key).cloned();
        Self {
            user_uuid: meta("user_uuid"),
            device_notes: meta("device_notes").unwrap_or_default(),
            device_name: meta("device_name").unwrap_or_default(),
            last_heartbeat_time: device.last_heartbeat_time.unwrap_or_default(),
            last_error_time: device.last_error_time.unwrap_or_default(),
            last_error_message: device.last_error_message.unwrap_or_default(),
            last_config_send_time: device
                .last_config_send_time
                .unwrap_or_else(|| crate::directory::NEVER.to_string()),
            device_uuid: device.id,
        }
    }
}

/// Number of registered devices, formatted with thousands separators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationCount {
    pub registered: String,
    pub timestamp: String,
}

/// `1234567` becomes `1,234,567`.
#[must_use]
pub fn format_count(count: usize) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Config document pushed to a device. Serialised, then base64 encoded by
/// the registry adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    pub last_config_version: String,
    /// Epoch seconds of the push, as text.
    pub message_id: String,
    pub device_id: String,
    pub commands: Value,
}

/// Payload of a recipe start command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartRecipeCommand {
    pub recipe_uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_dict: Option<Value>,
}

/// A device to create in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRegistryDevice {
    pub id: String,
    /// RSA public key in X.509 PEM form.
    pub public_key: String,
    pub metadata: BTreeMap<String, String>,
}

/// Public key uploaded by a device's setup script, looked up by the
/// verification code (`cksum`) the user types in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyRecord {
    pub key: String,
    pub cksum: String,
    pub state: String,
    pub mac: String,
    /// Software version, only reported by newer devices.
    pub version: Option<String>,
}

impl PublicKeyRecord {
    /// Read a stored public key document.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] when any of `key`, `cksum`,
    /// `state` or `MAC` is absent.
    pub fn from_properties(properties: &Map<String, Value>) -> Result<Self, ValidationError> {
        let field = |name: &'static str| {
            properties
                .get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or(ValidationError::MissingField(name))
        };
        Ok(Self {
            key: field("key")?,
            cksum: field("cksum")?,
            state: field("state")?,
            mac: field("MAC")?,
            version: properties
                .get("version")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    /// Registry id for this key: `<type>-<code>-<MAC>`.
    #[must_use]
    pub fn device_id(&self, device_type: &str, verification_code: &str) -> String {
        format!("{device_type}-{verification_code}-{}", self.mac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn should_group_thousands() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1234), "1,234");
        assert_eq!(format_count(1_234_567), "1,234,567");
    }

    #[test]
    fn should_default_missing_registry_fields() {
        let summary = RegistryDeviceSummary::from(RegistryDevice {
            id: "EDU-1".to_string(),
            metadata: BTreeMap::from([("device_name".to_string(), "Kitchen".to_string())]),
            ..RegistryDevice::default()
        });
        assert_eq!(summary.last_config_send_time, "Never");
        assert_eq!(summary.last_heartbeat_time, "");
        assert_eq!(summary.user_uuid, None);
        assert_eq!(summary.device_name, "Kitchen");
    }

    #[test]
    fn should_serialize_config_in_camel_case() {
        let config = DeviceConfig {
            last_config_version: "3".to_string(),
            message_id: "1700000000".to_string(),
            device_id: "EDU-1".to_string(),
            commands: json!([{"command": "LoadRecipeIntoVM", "arg0": "{}", "arg1": "0"}]),
        };
        let value = serde_json::to_value(config).unwrap();
        assert_eq!(value["lastConfigVersion"], "3");
        assert_eq!(value["messageId"], "1700000000");
        assert_eq!(value["deviceId"], "EDU-1");
    }

    #[test]
    fn should_omit_absent_recipe_dict() {
        let command = StartRecipeCommand {
            recipe_uuid: "r-1".to_string(),
            recipe_dict: None,
        };
        assert_eq!(serde_json::to_value(command).unwrap(), json!({"recipe_uuid": "r-1"}));
    }

    #[test]
    fn should_require_mac_on_public_key() {
        let props = json!({"key": "pem", "cksum": "ABC123", "state": "unclaimed"});
        assert_eq!(
            PublicKeyRecord::from_properties(props.as_object().unwrap()),
            Err(ValidationError::MissingField("MAC"))
        );
    }

    #[test]
    fn should_build_device_id_from_code_and_mac() {
        let props = json!({"key": "pem", "cksum": "ABC123", "state": "unclaimed", "MAC": "b8-27-eb"});
        let record = PublicKeyRecord::from_properties(props.as_object().unwrap()).unwrap();
        assert_eq!(record.device_id("EDU", "ABC123"), "EDU-ABC123-b8-27-eb");
        assert_eq!(record.version, None);
    }
}
