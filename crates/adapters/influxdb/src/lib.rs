//! # cropcloud-adapter-influxdb
//!
//! Time-series adapter writing to `InfluxDB` through its HTTP write endpoint.
//!
//! ## Responsibilities
//! - Implement `TimeSeriesSink` from `cropcloud-app::ports`
//! - Encode points as line protocol with second precision
//!
//! ## Dependency rule
//! Depends on `cropcloud-app` (for port traits) and `cropcloud-domain` (for domain types).

mod config;
mod error;
mod line_protocol;
mod sink;

pub use config::InfluxConfig;
pub use error::InfluxError;
pub use line_protocol::encode_points;
pub use sink::InfluxSink;
