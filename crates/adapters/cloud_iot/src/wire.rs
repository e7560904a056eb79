//! Request and response bodies of the registry REST API.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use serde::{Deserialize, Serialize};

use cropcloud_domain::registry::{NewRegistryDevice, RegistryDevice};

/// Credential format of device public keys.
pub const PUBLIC_KEY_FORMAT: &str = "RSA_X509_PEM";

pub fn encode_payload(data: &[u8]) -> String {
    URL_SAFE.encode(data)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceListPage {
    #[serde(default)]
    pub devices: Vec<DeviceId>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeviceId {
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ErrorStatus {
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceResource {
    pub id: String,
    pub last_heartbeat_time: Option<String>,
    pub last_config_send_time: Option<String>,
    pub last_error_time: Option<String>,
    pub last_error_status: Option<ErrorStatus>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl From<DeviceResource> for RegistryDevice {
    fn from(resource: DeviceResource) -> Self {
        Self {
            id: resource.id,
            last_heartbeat_time: resource.last_heartbeat_time,
            last_config_send_time: resource.last_config_send_time,
            last_error_time: resource.last_error_time,
            last_error_message: resource.last_error_status.and_then(|status| status.message),
            metadata: resource.metadata,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigVersions {
    #[serde(default)]
    pub device_configs: Vec<ConfigVersion>,
}

/// `version` is an int64, which the API encodes as a JSON string.
#[derive(Debug, Deserialize)]
pub struct ConfigVersion {
    pub version: String,
}

impl ConfigVersions {
    /// Highest version listed, ignoring unparseable entries.
    pub fn latest(&self) -> Option<u64> {
        self.device_configs
            .iter()
            .filter_map(|config| config.version.parse().ok())
            .max()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyConfigRequest {
    pub version_to_update: String,
    pub binary_data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCommandRequest {
    pub binary_data: String,
    pub subfolder: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredential {
    pub format: &'static str,
    pub key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub public_key: PublicKeyCredential,
}

#[derive(Debug, Serialize)]
pub struct CreateDeviceRequest {
    pub id: String,
    pub credentials: Vec<Credential>,
    pub metadata: BTreeMap<String, String>,
}

impl From<NewRegistryDevice> for CreateDeviceRequest {
    fn from(device: NewRegistryDevice) -> Self {
        Self {
            id: device.id,
            credentials: vec![Credential {
                public_key: PublicKeyCredential {
                    format: PUBLIC_KEY_FORMAT,
                    key: device.public_key,
                },
            }],
            metadata: device.metadata,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: ErrorStatus,
}
