use std::time::Duration;

use serde::Deserialize;

/// Location of the device registry and how to authenticate against it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CloudIotConfig {
    pub endpoint: String,
    pub project: String,
    pub region: String,
    pub registry: String,
    /// OAuth bearer token sent with every call.
    pub access_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for CloudIotConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://cloudiot.googleapis.com/v1".to_string(),
            project: String::new(),
            region: "us-central1".to_string(),
            registry: "device-registry".to_string(),
            access_token: None,
            timeout_secs: 30,
        }
    }
}

impl CloudIotConfig {
    /// Resource path of the registry.
    #[must_use]
    pub fn registry_path(&self) -> String {
        format!(
            "projects/{}/locations/{}/registries/{}",
            self.project, self.region, self.registry
        )
    }

    #[must_use]
    pub fn devices_url(&self) -> String {
        format!("{}/{}/devices", self.endpoint.trim_end_matches('/'), self.registry_path())
    }

    #[must_use]
    pub fn device_url(&self, device_id: &str) -> String {
        format!("{}/{device_id}", self.devices_url())
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
