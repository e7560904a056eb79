use std::time::Duration;

use serde::Deserialize;

/// Connection settings for the `InfluxDB` write endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InfluxConfig {
    /// Base URL of the server, without a trailing slash.
    pub url: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u64,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8086".to_string(),
            database: "cropcloud".to_string(),
            username: None,
            password: None,
            timeout_secs: 10,
        }
    }
}

impl InfluxConfig {
    #[must_use]
    pub fn write_url(&self) -> String {
        format!("{}/write", self.url.trim_end_matches('/'))
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
