//! Shared application state for axum handlers.

use std::sync::Arc;

use cropcloud_app::ports::{AnalyticsSink, Clock, DeviceRegistry, EntityStore, TimeSeriesSink};
use cropcloud_app::services::{
    DeviceDataAccessor, DeviceDirectory, MessageRelay, NotificationLedger, RecipeConfigService,
    RegistryRelay, RunsLedger, Scheduler, WeatherCache,
};

/// Storage kinds and switches the services are built with.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Kind holding one weather cache entity per station.
    pub weather_kind: String,
    /// Kind and key of the recipe generator config entity.
    pub recipe_kind: String,
    pub recipe_key: String,
    /// Mirror relayed readings into the `DeviceData` series.
    pub mirror_device_data: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            weather_kind: "Weather".to_string(),
            recipe_kind: "RecipeGenerator".to_string(),
            recipe_key: "config".to_string(),
            mirror_device_data: false,
        }
    }
}

/// Application state shared across all axum handlers.
///
/// Generic over the entity store, analytics sink, time-series sink, device
/// registry and clock to avoid dynamic dispatch. `Clone` is implemented
/// manually so the underlying types themselves do not need to be `Clone`,
/// only the `Arc` wrappers are cloned.
pub struct AppState<S, A, T, R, C> {
    pub device_data: Arc<DeviceDataAccessor<S>>,
    pub notifications: Arc<NotificationLedger<S, C>>,
    pub runs: Arc<RunsLedger<S, C>>,
    pub scheduler: Arc<Scheduler<S, C>>,
    pub recipe_config: Arc<RecipeConfigService<S, A, C>>,
    pub weather: Arc<WeatherCache<S, A>>,
    pub directory: Arc<DeviceDirectory<S, C>>,
    pub relay: Arc<MessageRelay<T, S, C>>,
    pub registry: Arc<RegistryRelay<R, S, C>>,
    pub clock: C,
}

impl<S, A, T, R, C: Clone> Clone for AppState<S, A, T, R, C> {
    fn clone(&self) -> Self {
        Self {
            device_data: Arc::clone(&self.device_data),
            notifications: Arc::clone(&self.notifications),
            runs: Arc::clone(&self.runs),
            scheduler: Arc::clone(&self.scheduler),
            recipe_config: Arc::clone(&self.recipe_config),
            weather: Arc::clone(&self.weather),
            directory: Arc::clone(&self.directory),
            relay: Arc::clone(&self.relay),
            registry: Arc::clone(&self.registry),
            clock: self.clock.clone(),
        }
    }
}

impl<S, A, T, R, C> AppState<S, A, T, R, C>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Clone + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    /// Build every service over the given ports.
    pub fn new(
        store: S,
        analytics: A,
        sink: T,
        registry: R,
        clock: C,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            device_data: Arc::new(DeviceDataAccessor::new(store.clone())),
            notifications: Arc::new(NotificationLedger::new(store.clone(), clock.clone())),
            runs: Arc::new(RunsLedger::new(store.clone(), clock.clone())),
            scheduler: Arc::new(Scheduler::new(store.clone(), clock.clone())),
            recipe_config: Arc::new(RecipeConfigService::new(
                store.clone(),
                analytics.clone(),
                clock.clone(),
                settings.recipe_kind,
                settings.recipe_key,
            )),
            weather: Arc::new(WeatherCache::new(
                store.clone(),
                analytics,
                settings.weather_kind,
            )),
            directory: Arc::new(DeviceDirectory::new(store.clone(), clock.clone())),
            relay: Arc::new(
                MessageRelay::new(sink, store.clone(), clock.clone())
                    .with_device_data_mirror(settings.mirror_device_data),
            ),
            registry: Arc::new(RegistryRelay::new(registry, store, clock.clone())),
            clock,
        }
    }
}
