//! Weather station cache: bounded reading lists per station plus analytics
//! snapshots of everything received.

use serde_json::{Map, Value};

use cropcloud_domain::analytics::{AnalyticsRow, table};
use cropcloud_domain::time::parse_date;
use cropcloud_domain::weather::{
    COMPUTED, COMPUTED_CAP, DEVICE, DEVICE_CAP, Reading, filter_by_date_range, push_newest_capped,
};

use crate::ports::{AnalyticsSink, Entity, EntityStore, Key, Query};

pub struct WeatherCache<S, A> {
    store: S,
    analytics: A,
    kind: String,
}

/// Cached list items are JSON documents, or JSON text in older entities.
fn as_reading(item: &Value) -> Option<Reading> {
    match item {
        Value::Object(map) => Some(map.clone()),
        Value::String(text) => serde_json::from_str(text).ok(),
        _ => None,
    }
}

fn valid_args(timestamp: &str, name: &str, doc: &Map<String, Value>) -> bool {
    !timestamp.trim().is_empty() && !name.trim().is_empty() && !doc.is_empty()
}

impl<S: EntityStore, A: AnalyticsSink> WeatherCache<S, A> {
    /// `kind` is the storage kind holding one entity per station.
    pub fn new(store: S, analytics: A, kind: impl Into<String>) -> Self {
        Self {
            store,
            analytics,
            kind: kind.into(),
        }
    }

    /// Names of every cached station.
    pub async fn stations(&self) -> Vec<String> {
        match self.store.keys(&Query::new(&self.kind)).await {
            Ok(keys) => keys
                .iter()
                .filter_map(|key| key.as_name().map(str::to_string))
                .collect(),
            Err(err) => {
                tracing::error!(error = %err, "failed to list weather stations");
                Vec::new()
            }
        }
    }

    async fn cached(&self, station: &str, property: &str) -> Vec<Value> {
        match self.store.get(&Key::name(&self.kind, station)).await {
            Ok(Some(entity)) => entity
                .get(property)
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::error!(error = %err, %station, "failed to read weather cache");
                Vec::new()
            }
        }
    }

    /// Computed readings dated within `start_date..=end_date` (`YYYY-MM-DD`),
    /// newest first, without consecutive duplicate timestamps.
    #[tracing::instrument(skip(self))]
    pub async fn computed_weather(
        &self,
        start_date: &str,
        end_date: &str,
        station: &str,
    ) -> Vec<Reading> {
        let (start, end) = match (parse_date(start_date), parse_date(end_date)) {
            (Ok(start), Ok(end)) => (start, end),
            (Err(err), _) | (_, Err(err)) => {
                tracing::error!(error = %err, "invalid weather date range");
                return Vec::new();
            }
        };
        let readings = self
            .cached(station, COMPUTED)
            .await
            .iter()
            .filter_map(as_reading)
            .collect();
        filter_by_date_range(readings, start, end)
    }

    /// Latest detail snapshot of a station, empty when none is cached.
    pub async fn station_details(&self, station: &str) -> Reading {
        self.cached(station, DEVICE)
            .await
            .first()
            .and_then(as_reading)
            .unwrap_or_default()
    }

    async fn push(&self, station: &str, property: &str, item: Value, cap: usize) -> bool {
        let key = Key::name(&self.kind, station);
        let mut entity = match self.store.get(&key).await {
            Ok(found) => found.unwrap_or_else(|| Entity::new(key, Map::new())),
            Err(err) => {
                tracing::error!(error = %err, %station, "failed to load weather cache");
                return false;
            }
        };
        let mut list = entity
            .get(property)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        push_newest_capped(&mut list, item, cap);
        entity
            .properties
            .insert(property.to_string(), Value::Array(list));
        match self.store.put(entity).await {
            Ok(_) => true,
            Err(err) => {
                tracing::error!(error = %err, %station, "failed to update weather cache");
                false
            }
        }
    }

    async fn snapshot(&self, table: &str, name: &str, timestamp: &str, doc: &Map<String, Value>) -> bool {
        let row = AnalyticsRow::new(table, name, timestamp, Value::Object(doc.clone()));
        match self.analytics.insert(row).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(error = %err, %table, "weather analytics write failed");
                false
            }
        }
    }

    /// Record a station detail document; the station name comes from its
    /// `name` field.
    #[tracing::instrument(skip(self, doc))]
    pub async fn save_station(&self, timestamp: &str, doc: &Map<String, Value>) -> bool {
        let name = doc.get("name").and_then(Value::as_str).unwrap_or_default();
        if !valid_args(timestamp, name, doc) {
            tracing::error!("save_station: invalid args");
            return false;
        }
        self.snapshot(table::WEATHER_DEVICE, name, timestamp, doc).await
            && self
                .push(name, DEVICE, Value::Object(doc.clone()), DEVICE_CAP)
                .await
    }

    #[tracing::instrument(skip(self, doc))]
    pub async fn save_computed(&self, timestamp: &str, station: &str, doc: &Map<String, Value>) -> bool {
        if !valid_args(timestamp, station, doc) {
            tracing::error!("save_computed: invalid args");
            return false;
        }
        self.snapshot(table::WEATHER_COMPUTED, station, timestamp, doc).await
            && self
                .push(station, COMPUTED, Value::Object(doc.clone()), COMPUTED_CAP)
                .await
    }

    /// Raw five-minute data goes to analytics only.
    pub async fn save_raw_five_min(&self, timestamp: &str, station: &str, doc: &Map<String, Value>) -> bool {
        if !valid_args(timestamp, station, doc) {
            tracing::error!("save_raw_five_min: invalid args");
            return false;
        }
        self.snapshot(table::WEATHER_RAW_FIVE_MIN, station, timestamp, doc).await
    }

    pub async fn save_raw_aux(&self, timestamp: &str, station: &str, doc: &Map<String, Value>) -> bool {
        if !valid_args(timestamp, station, doc) {
            tracing::error!("save_raw_aux: invalid args");
            return false;
        }
        self.snapshot(table::WEATHER_RAW_AUX, station, timestamp, doc).await
    }
}
