//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `cropcloud.toml` in the working directory. Every field has a
//! default so the file is optional. Environment variables take precedence
//! over file values.

use std::time::Duration;

use serde::Deserialize;

use cropcloud_adapter_cloud_iot::CloudIotConfig;
use cropcloud_adapter_http_axum::state::ServiceSettings;
use cropcloud_adapter_influxdb::InfluxConfig;
use cropcloud_adapter_mqtt::MqttConfig;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    /// Storage kinds the services read and write.
    pub datastore: DatastoreConfig,
    /// Broker to relay device events from. No subscriber runs without it.
    pub mqtt: Option<MqttConfig>,
    pub influx: InfluxConfig,
    pub cloud_iot: CloudIotConfig,
    pub scheduler: SchedulerConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    pub port: u16,
}

/// `SQLite` database holding entities and analytics rows.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatastoreConfig {
    pub weather_kind: String,
    pub recipe_kind: String,
    pub recipe_key: String,
    /// Also keep relayed readings in the per-device `DeviceData` series.
    pub mirror_device_data: bool,
}

/// Background pass firing due scheduled commands for every known device.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Config {
    /// Load configuration from `cropcloud.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("cropcloud.toml")?;
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("CROPCLOUD_HOST") {
            self.server.host = val;
        }
        if let Some(port) = var("CROPCLOUD_PORT").and_then(|val| val.parse().ok()) {
            self.server.port = port;
        }
        if let Some(val) = var("CROPCLOUD_BIND") {
            if let Some((host, port)) = val.rsplit_once(':') {
                self.server.host = host.to_string();
                if let Ok(port) = port.parse() {
                    self.server.port = port;
                }
            }
        }
        if let Some(val) = var("CROPCLOUD_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = var("CROPCLOUD_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }

        if let Some(val) = var("DS_WEATHER_ENTITY") {
            self.datastore.weather_kind = val;
        }
        if let Some(val) = var("DS_RECIPE_ENTITY") {
            self.datastore.recipe_kind = val;
        }
        if let Some(val) = var("DS_RECIPE_CONFIG") {
            self.datastore.recipe_key = val;
        }

        if let Some(val) = var("CROPCLOUD_MQTT_HOST") {
            self.mqtt.get_or_insert_with(MqttConfig::default).broker_host = val;
        }
        if let Some(mqtt) = self.mqtt.as_mut() {
            if let Some(port) = var("CROPCLOUD_MQTT_PORT").and_then(|val| val.parse().ok()) {
                mqtt.broker_port = port;
            }
        }

        if let Some(val) = var("CROPCLOUD_INFLUX_URL") {
            self.influx.url = val;
        }
        if let Some(val) = var("CROPCLOUD_INFLUX_DATABASE") {
            self.influx.database = val;
        }
        if let Some(val) = var("CROPCLOUD_INFLUX_USERNAME") {
            self.influx.username = Some(val);
        }
        if let Some(val) = var("CROPCLOUD_INFLUX_PASSWORD") {
            self.influx.password = Some(val);
        }

        if let Some(val) = var("GCLOUD_PROJECT") {
            self.cloud_iot.project = val;
        }
        if let Some(val) = var("GCLOUD_REGION") {
            self.cloud_iot.region = val;
        }
        if let Some(val) = var("GCLOUD_DEV_REG") {
            self.cloud_iot.registry = val;
        }
        if let Some(val) = var("CROPCLOUD_CLOUD_IOT_TOKEN") {
            self.cloud_iot.access_token = Some(val);
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.scheduler.enabled && self.scheduler.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "scheduler interval must be non-zero".to_string(),
            ));
        }
        for (name, value) in [
            ("datastore.weather_kind", &self.datastore.weather_kind),
            ("datastore.recipe_kind", &self.datastore.recipe_kind),
            ("datastore.recipe_key", &self.datastore.recipe_key),
            ("influx.database", &self.influx.database),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    #[must_use]
    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            weather_kind: self.datastore.weather_kind.clone(),
            recipe_kind: self.datastore.recipe_kind.clone(),
            recipe_key: self.datastore.recipe_key.clone(),
            mirror_device_data: self.datastore.mirror_device_data,
        }
    }
}

impl SchedulerConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:cropcloud.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "cropcloudd=info,cropcloud=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        let settings = ServiceSettings::default();
        Self {
            weather_kind: settings.weather_kind,
            recipe_kind: settings.recipe_kind,
            recipe_key: settings.recipe_key,
            mirror_device_data: settings.mirror_device_data,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Validation(String),
}
