//! Device data accessor: bounded, time-ordered record queues per device
//! property, each in its own shard kind.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use cropcloud_domain::device_data::{
    DATA_PROPERTY, DeviceStatus, HistoryPoint, TIMESTAMP_PROPERTY, TempHumidityHistory,
    format_two_decimals, value_text,
};
use cropcloud_domain::error::CropCloudError;
use cropcloud_domain::id::DeviceKey;
use cropcloud_domain::shard::{kind, property, shard_name};
use cropcloud_domain::time::{Timestamp, format_timestamp};

use crate::ports::{Entity, EntityStore, Key, Query};

use super::device_key;

/// Reads and writes per-device series.
///
/// Each record is stored as its own entity holding the payload under
/// `data` and the wire time under `timestamp`; reads come back newest first.
#[derive(Clone)]
pub struct DeviceDataAccessor<S> {
    store: S,
}

fn series_entity(key: Key, data: Value, at: Timestamp) -> Entity {
    let mut properties = Map::new();
    properties.insert(DATA_PROPERTY.to_string(), data);
    properties.insert(
        TIMESTAMP_PROPERTY.to_string(),
        Value::String(format_timestamp(at)),
    );
    Entity::new(key, properties)
}

/// Payload of a stored series entity; entities without one read as `{}`.
#[must_use]
pub fn entity_data(entity: &Entity) -> Value {
    entity
        .get(DATA_PROPERTY)
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()))
}

impl<S: EntityStore> DeviceDataAccessor<S> {
    /// Create a new accessor backed by the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Append one record to the `(kind, property, device)` shard.
    #[tracing::instrument(skip(self, data), fields(device = %device))]
    pub async fn append(
        &self,
        kind: &str,
        property: &str,
        device: &DeviceKey,
        data: Value,
        at: Timestamp,
    ) -> bool {
        let shard = shard_name(kind, property, device);
        match self
            .store
            .put(series_entity(Key::incomplete(&shard), data, at))
            .await
        {
            Ok(_) => true,
            Err(err) => {
                tracing::error!(error = %err, %shard, "failed to append record");
                false
            }
        }
    }

    /// Insert or replace the record named `name` in the shard.
    #[tracing::instrument(skip(self, data), fields(device = %device))]
    pub async fn upsert(
        &self,
        kind: &str,
        property: &str,
        device: &DeviceKey,
        name: &str,
        data: Value,
        at: Timestamp,
    ) -> bool {
        let shard = shard_name(kind, property, device);
        match self
            .store
            .put(series_entity(Key::name(&shard, name), data, at))
            .await
        {
            Ok(_) => true,
            Err(err) => {
                tracing::error!(error = %err, %shard, "failed to upsert record");
                false
            }
        }
    }

    /// Write back an entity previously returned by [`Self::entities`].
    pub async fn replace(&self, entity: Entity) -> bool {
        let kind = entity.key.kind.clone();
        match self.store.put(entity).await {
            Ok(_) => true,
            Err(err) => {
                tracing::error!(error = %err, %kind, "failed to replace record");
                false
            }
        }
    }

    pub async fn remove(&self, key: &Key) -> bool {
        match self.store.delete(key).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(error = %err, kind = %key.kind, "failed to delete record");
                false
            }
        }
    }

    /// Up to `limit` most recent stored entities of the shard, all when `None`.
    ///
    /// # Errors
    ///
    /// Propagates store failures; callers that update or delete records need
    /// to tell "empty" from "unavailable".
    pub async fn entities(
        &self,
        kind: &str,
        property: &str,
        device: &DeviceKey,
        limit: Option<usize>,
    ) -> Result<Vec<Entity>, CropCloudError> {
        let query = Query::new(shard_name(kind, property, device))
            .order_desc(TIMESTAMP_PROPERTY)
            .limit(limit);
        self.store.query(&query).await
    }

    /// Up to `limit` most recent record payloads, newest first.
    #[tracing::instrument(skip(self), fields(device = %device))]
    pub async fn read(
        &self,
        kind: &str,
        property: &str,
        device: &DeviceKey,
        limit: Option<usize>,
    ) -> Vec<Value> {
        match self.entities(kind, property, device, limit).await {
            Ok(entities) => entities.iter().map(entity_data).collect(),
            Err(err) => {
                tracing::error!(error = %err, %property, "failed to read records");
                Vec::new()
            }
        }
    }

    /// Most recent `DeviceData` payloads for a raw device key.
    pub async fn device_data(&self, property: &str, device: &str, limit: Option<usize>) -> Vec<Value> {
        let Some(device) = device_key(device) else {
            return Vec::new();
        };
        self.read(kind::DEVICE_DATA, property, &device, limit).await
    }

    async fn latest(&self, property: &str, device: &str) -> Option<Map<String, Value>> {
        self.device_data(property, device, Some(1))
            .await
            .into_iter()
            .next()
            .and_then(|value| match value {
                Value::Object(map) => Some(map),
                _ => None,
            })
    }

    /// Latest value of a property rendered with two decimals, or `""` when
    /// there is none or it is not numeric.
    pub async fn read_latest_scalar(&self, property: &str, device: &str) -> String {
        self.latest(property, device)
            .await
            .and_then(|record| record.get("value").map(value_text))
            .and_then(|text| format_two_decimals(&text))
            .unwrap_or_default()
    }

    pub async fn current_co2_value(&self, device: &str) -> String {
        self.read_latest_scalar(property::CO2, device).await
    }

    pub async fn current_temp_value(&self, device: &str) -> String {
        self.read_latest_scalar(property::TEMP, device).await
    }

    pub async fn current_rh_value(&self, device: &str) -> String {
        self.read_latest_scalar(property::RH, device).await
    }

    pub async fn current_ec_value(&self, device: &str) -> String {
        self.read_latest_scalar(property::WATER_EC, device).await
    }

    pub async fn current_ph_value(&self, device: &str) -> String {
        self.read_latest_scalar(property::WATER_PH, device).await
    }

    pub async fn current_h2o_temp_value(&self, device: &str) -> String {
        self.read_latest_scalar(property::WATER_TEMP, device).await
    }

    /// Latest value of every usual property plus the last boot time.
    pub async fn latest_properties(&self, device: &str) -> BTreeMap<String, String> {
        let mut latest = BTreeMap::new();
        if device_key(device).is_none() {
            return latest;
        }
        let boot_time = self
            .latest(property::BOOT, device)
            .await
            .and_then(|record| record.get(TIMESTAMP_PROPERTY).map(value_text))
            .unwrap_or_default();
        latest.insert("boot_time".to_string(), boot_time);
        for name in property::USUAL {
            let value = self
                .latest(name, device)
                .await
                .and_then(|record| record.get("value").map(value_text))
                .unwrap_or_default();
            latest.insert(name.to_string(), value);
        }
        latest
    }

    async fn history(&self, property: &str, device: &str) -> Vec<HistoryPoint> {
        self.device_data(property, device, None)
            .await
            .iter()
            .filter_map(Value::as_object)
            .filter_map(HistoryPoint::from_record)
            .collect()
    }

    pub async fn co2_history(&self, device: &str) -> Vec<HistoryPoint> {
        self.history(property::CO2, device).await
    }

    /// Every stored LED panel spectrum, as display text.
    pub async fn led_panel_history(&self, device: &str) -> Vec<String> {
        self.device_data(property::LED, device, None)
            .await
            .iter()
            .filter_map(|record| record.get("value").map(value_text))
            .collect()
    }

    pub async fn temp_and_humidity_history(&self, device: &str) -> TempHumidityHistory {
        TempHumidityHistory {
            rh: self.history(property::RH, device).await,
            temp: self.history(property::TEMP, device).await,
        }
    }

    /// Recipe progress summary; `None` unless both a status report and an
    /// air temperature reading exist.
    pub async fn device_status(&self, device: &str) -> Option<DeviceStatus> {
        let temperature = self.latest(property::TEMP, device).await?;
        let status = self.latest(property::STATUS, device).await?;
        Some(DeviceStatus::from_records(&status, &temperature))
    }
}
