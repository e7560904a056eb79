//! MQTT subscriber configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the MQTT subscriber.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// MQTT broker hostname or IP address.
    pub broker_host: String,
    /// MQTT broker port.
    pub broker_port: u16,
    /// MQTT client identifier.
    pub client_id: String,
    /// Subscription filter. The segment after `devices/` is the device id.
    pub topic: String,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// Pause between reconnection attempts, in seconds.
    pub retry_delay_secs: u64,
    /// Consecutive failed connections before giving up. `0` retries forever.
    pub max_retries: u32,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "cropcloud".to_string(),
            topic: "/devices/+/events".to_string(),
            keep_alive_secs: 30,
            retry_delay_secs: 5,
            max_retries: 0,
        }
    }
}

impl MqttConfig {
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}
