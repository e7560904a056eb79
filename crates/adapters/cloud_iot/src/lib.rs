//! # cropcloud-adapter-cloud-iot
//!
//! Device registry adapter for the Cloud IoT REST API.
//!
//! ## Responsibilities
//! - Implement `DeviceRegistry` from `cropcloud-app::ports`
//! - Encode config and command payloads as URL-safe base64
//! - Surface the API's error message when a call is refused
//!
//! ## Dependency rule
//! Depends on `cropcloud-app` (for port traits) and `cropcloud-domain` (for domain types).

mod client;
mod config;
mod error;
mod wire;

pub use client::CloudIotRegistry;
pub use config::CloudIotConfig;
pub use error::RegistryError;
