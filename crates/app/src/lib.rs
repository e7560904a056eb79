//! # cropcloud-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `EntityStore`: kind/key entity storage with filtered, ordered queries
//!   - `AnalyticsSink`: append-only analytical rows
//!   - `TimeSeriesSink`: measurement points
//!   - `DeviceRegistry`: the IoT device registry
//!   - `Clock`: the current time, injectable for tests
//! - Define the **services** every caller goes through:
//!   - `DeviceDataAccessor`: sharded per-device series
//!   - `NotificationLedger`, `RunsLedger`, `Scheduler`
//!   - `RecipeConfigService`, `WeatherCache`, `DeviceDirectory`
//!   - `MessageRelay`: inbound device telemetry
//!   - `RegistryRelay`: registry CRUD and command pushes
//! - Orchestrate domain objects without knowing *how* persistence or IO works
//!
//! ## Dependency rule
//! Depends on `cropcloud-domain` only.
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod ports;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;
