//! # cropcloud-adapter-mqtt
//!
//! MQTT adapter: receives device telemetry from the broker the edge
//! devices publish to.
//!
//! ## Responsibilities
//! - Connect to an MQTT broker and subscribe to the device events topic
//! - Extract the device id from each topic and decode the JSON payload
//! - Hand every message to [`MessageRelay`](cropcloud_app::services::MessageRelay)
//! - Reconnect after broker failures until shutdown is requested
//!
//! ## Dependency rule
//! Same as other adapters: depends on `cropcloud-app` and `cropcloud-domain`.

mod config;
mod error;
mod subscriber;
mod topic;

pub use config::MqttConfig;
pub use error::MqttError;
pub use subscriber::run_subscriber;
pub use topic::device_id_from_topic;
