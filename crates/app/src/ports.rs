//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod analytics;
pub mod clock;
pub mod entity_store;
pub mod registry;
pub mod timeseries;

pub use analytics::AnalyticsSink;
pub use clock::{Clock, ManualClock, SystemClock};
pub use entity_store::{Entity, EntityStore, Key, KeyPath, Order, Query};
pub use registry::DeviceRegistry;
pub use timeseries::TimeSeriesSink;
