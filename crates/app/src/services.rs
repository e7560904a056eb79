//! Application services: use-case implementations.
//!
//! Each service struct accepts port trait implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.
//!
//! Device-scoped operations take the raw device key callers hand over. A
//! blank key or the `"None"` sentinel short-circuits to the operation's empty
//! result without touching the store. Read failures are logged and surfaced
//! as the empty result too; writes report success as a `bool`.

pub mod device_data;
pub mod directory;
pub mod message_relay;
pub mod notifications;
pub mod recipe_config;
pub mod registry_relay;
pub mod runs;
pub mod scheduler;
pub mod weather;

pub use device_data::DeviceDataAccessor;
pub use directory::DeviceDirectory;
pub use message_relay::MessageRelay;
pub use notifications::NotificationLedger;
pub use recipe_config::RecipeConfigService;
pub use registry_relay::{Registration, RegistrationRequest, RegistryRelay};
pub use runs::RunsLedger;
pub use scheduler::Scheduler;
pub use weather::WeatherCache;

use cropcloud_domain::id::DeviceKey;

fn device_key(raw: &str) -> Option<DeviceKey> {
    DeviceKey::parse(Some(raw))
}
