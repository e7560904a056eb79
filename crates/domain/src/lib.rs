//! # cropcloud-domain
//!
//! Pure domain model for the cropcloud device data layer.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, wire timestamps
//! - Derive **shard names** for per-device, per-property record queues
//! - Define the **records** kept per device: telemetry, notifications, runs
//!   and scheduled commands
//! - Define **recipes**, the recipe generator config and the weather cache
//! - Parse and validate **inbound device messages** into time-series points
//! - Shape **directory** and **registry** views for admin callers
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod analytics;
pub mod device_data;
pub mod directory;
pub mod literal;
pub mod message;
pub mod notification;
pub mod recipe;
pub mod registry;
pub mod run;
pub mod schedule;
pub mod shard;
pub mod timeseries;
pub mod weather;
