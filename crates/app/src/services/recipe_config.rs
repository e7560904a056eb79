//! Recipe generator configuration and recipe snapshots.

use serde_json::{Map, Value};

use cropcloud_domain::analytics::{AnalyticsRow, table};
use cropcloud_domain::recipe::{Recipe, RecipeConfig};

use crate::ports::{AnalyticsSink, Clock, Entity, EntityStore, Key};

/// Reads and writes the singleton recipe generator config.
///
/// The config lives in one entity of `config_kind` named `config_key`, under
/// a property of the same name. Every write is also appended to the
/// analytical store so changes can be traced over time.
pub struct RecipeConfigService<S, A, C> {
    store: S,
    analytics: A,
    clock: C,
    config_kind: String,
    config_key: String,
}

impl<S, A, C> RecipeConfigService<S, A, C>
where
    S: EntityStore,
    A: AnalyticsSink,
    C: Clock,
{
    pub fn new(
        store: S,
        analytics: A,
        clock: C,
        config_kind: impl Into<String>,
        config_key: impl Into<String>,
    ) -> Self {
        Self {
            store,
            analytics,
            clock,
            config_kind: config_kind.into(),
            config_key: config_key.into(),
        }
    }

    fn key(&self) -> Key {
        Key::name(&self.config_kind, &self.config_key)
    }

    /// Current config, `None` when it was never written or cannot be read.
    pub async fn read_config(&self) -> Option<RecipeConfig> {
        let entity = match self.store.get(&self.key()).await {
            Ok(entity) => entity?,
            Err(err) => {
                tracing::error!(error = %err, "failed to read recipe config");
                return None;
            }
        };
        let decoded = match entity.get(&self.config_key)? {
            Value::String(text) => serde_json::from_str(text),
            other => serde_json::from_value(other.clone()),
        };
        match decoded {
            Ok(config) => Some(config),
            Err(err) => {
                tracing::error!(error = %err, "stored recipe config is malformed");
                None
            }
        }
    }

    /// Stamp and store the config, then snapshot it to analytics keyed by
    /// its first controlled device.
    #[tracing::instrument(skip_all)]
    pub async fn write_config(&self, mut config: RecipeConfig) -> bool {
        let now = self.clock.now();
        config.stamp(now);
        let document = Value::Object(config.0.clone());

        let mut properties = Map::new();
        properties.insert(self.config_key.clone(), document.clone());
        if let Err(err) = self.store.put(Entity::new(self.key(), properties)).await {
            tracing::error!(error = %err, "failed to store recipe config");
            return false;
        }

        let Some(device) = config.primary_device() else {
            tracing::warn!("recipe config controls no device, snapshot skipped");
            return true;
        };
        let row = AnalyticsRow::at(table::RECIPE_GENERATOR_CONFIG, device, now, document);
        match self.analytics.insert(row).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(error = %err, "failed to snapshot recipe config");
                false
            }
        }
    }

    /// Append a generated recipe for `station` to the analytical store.
    #[tracing::instrument(skip(self, recipe))]
    pub async fn save_recipe(&self, station: &str, timestamp: &str, recipe: &Value) -> bool {
        let empty = recipe.as_object().is_none_or(Map::is_empty);
        if station.trim().is_empty() || timestamp.trim().is_empty() || empty {
            tracing::error!("save_recipe: invalid args");
            return false;
        }
        if let Ok(parsed) = serde_json::from_value::<Recipe>(recipe.clone()) {
            if let Err(err) = parsed.validate() {
                tracing::error!(error = %err, "save_recipe: rejected recipe");
                return false;
            }
        }
        let row = AnalyticsRow::new(table::RECIPE, station, timestamp, recipe.clone());
        match self.analytics.insert(row).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(error = %err, "save_recipe: analytics write failed");
                false
            }
        }
    }
}
