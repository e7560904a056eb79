//! In-memory port fakes shared by the service tests.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use cropcloud_domain::analytics::AnalyticsRow;
use cropcloud_domain::error::CropCloudError;
use cropcloud_domain::registry::{NewRegistryDevice, RegistryDevice};
use cropcloud_domain::timeseries::Point;

use crate::ports::{
    AnalyticsSink, DeviceRegistry, Entity, EntityStore, Key, KeyPath, Order, Query, TimeSeriesSink,
};

/// Simulated backend outage.
#[derive(Debug)]
pub struct Unavailable;

impl std::fmt::Display for Unavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("backend unavailable")
    }
}

impl std::error::Error for Unavailable {}

fn unavailable() -> CropCloudError {
    CropCloudError::Storage(Box::new(Unavailable))
}

struct Stored {
    entity: Entity,
    seq: u64,
}

#[derive(Default)]
struct State {
    entities: Vec<Stored>,
    next_seq: u64,
}

/// Entity store keeping everything in a shared vector.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
    failing: Arc<AtomicBool>,
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl InMemoryStore {
    /// Make every subsequent call fail with a storage error.
    pub fn fail(&self) {
        self.failing.store(true, AtomicOrdering::SeqCst);
    }

    fn check(&self) -> Result<(), CropCloudError> {
        if self.failing.load(AtomicOrdering::SeqCst) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }

    /// Every entity of `kind`, in write order.
    pub fn all(&self, kind: &str) -> Vec<Entity> {
        let state = self.state.lock().unwrap();
        state
            .entities
            .iter()
            .filter(|stored| stored.entity.key.kind == kind)
            .map(|stored| stored.entity.clone())
            .collect()
    }

    fn run(&self, query: &Query) -> Vec<Entity> {
        let state = self.state.lock().unwrap();
        let mut matched: Vec<&Stored> = state
            .entities
            .iter()
            .filter(|stored| stored.entity.key.kind == query.kind)
            .filter(|stored| {
                query
                    .filters
                    .iter()
                    .all(|(prop, value)| stored.entity.properties.get(prop) == Some(value))
            })
            .collect();
        match &query.order {
            Some(Order::Descending(prop)) => matched.sort_by(|a, b| {
                compare_values(b.entity.get(prop), a.entity.get(prop))
                    .then(b.seq.cmp(&a.seq))
            }),
            Some(Order::Ascending(prop)) => matched.sort_by(|a, b| {
                compare_values(a.entity.get(prop), b.entity.get(prop))
                    .then(b.seq.cmp(&a.seq))
            }),
            None => matched.sort_by_key(|stored| stored.seq),
        }
        matched
            .into_iter()
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|stored| stored.entity.clone())
            .collect()
    }
}

impl EntityStore for InMemoryStore {
    async fn get(&self, key: &Key) -> Result<Option<Entity>, CropCloudError> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .entities
            .iter()
            .find(|stored| &stored.entity.key == key)
            .map(|stored| stored.entity.clone()))
    }

    async fn put(&self, mut entity: Entity) -> Result<Key, CropCloudError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        if entity.key.path == KeyPath::Incomplete {
            let next_id = state
                .entities
                .iter()
                .filter(|stored| stored.entity.key.kind == entity.key.kind)
                .filter_map(|stored| match stored.entity.key.path {
                    KeyPath::Id(id) => Some(id),
                    _ => None,
                })
                .max()
                .unwrap_or(0)
                + 1;
            entity.key.path = KeyPath::Id(next_id);
        }
        let key = entity.key.clone();
        state.next_seq += 1;
        let seq = state.next_seq;
        state.entities.retain(|stored| stored.entity.key != key);
        state.entities.push(Stored { entity, seq });
        Ok(key)
    }

    async fn delete(&self, key: &Key) -> Result<(), CropCloudError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        state.entities.retain(|stored| &stored.entity.key != key);
        Ok(())
    }

    async fn query(&self, query: &Query) -> Result<Vec<Entity>, CropCloudError> {
        self.check()?;
        Ok(self.run(query))
    }

    async fn keys(&self, query: &Query) -> Result<Vec<Key>, CropCloudError> {
        self.check()?;
        Ok(self.run(query).into_iter().map(|entity| entity.key).collect())
    }
}

/// Analytics sink remembering every row.
#[derive(Clone, Default)]
pub struct RecordingAnalytics {
    pub rows: Arc<Mutex<Vec<AnalyticsRow>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingAnalytics {
    pub fn fail(&self) {
        self.failing.store(true, AtomicOrdering::SeqCst);
    }

    pub fn rows(&self) -> Vec<AnalyticsRow> {
        self.rows.lock().unwrap().clone()
    }
}

impl AnalyticsSink for RecordingAnalytics {
    async fn insert(&self, row: AnalyticsRow) -> Result<(), CropCloudError> {
        if self.failing.load(AtomicOrdering::SeqCst) {
            return Err(unavailable());
        }
        self.rows.lock().unwrap().push(row);
        Ok(())
    }
}

/// Time-series sink remembering every point.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub points: Arc<Mutex<Vec<Point>>>,
}

impl RecordingSink {
    pub fn points(&self) -> Vec<Point> {
        self.points.lock().unwrap().clone()
    }
}

impl TimeSeriesSink for RecordingSink {
    async fn write_points(&self, points: Vec<Point>) -> Result<(), CropCloudError> {
        self.points.lock().unwrap().extend(points);
        Ok(())
    }
}

/// What the fake registry was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryCall {
    Delete(String),
    ModifyConfig {
        device_id: String,
        version: u64,
        data: Vec<u8>,
    },
    SendCommand {
        device_id: String,
        subfolder: String,
        data: Vec<u8>,
    },
    Create(NewRegistryDevice),
}

#[derive(Clone, Default)]
pub struct FakeRegistry {
    pub devices: Arc<Mutex<HashMap<String, RegistryDevice>>>,
    pub config_versions: Arc<Mutex<HashMap<String, u64>>>,
    pub calls: Arc<Mutex<Vec<RegistryCall>>>,
    /// When set, command pushes fail with this message.
    pub command_error: Arc<Mutex<Option<String>>>,
}

#[derive(Debug)]
pub struct RemoteFailure(pub String);

impl std::fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for RemoteFailure {}

impl FakeRegistry {
    pub fn with_device(self, device: RegistryDevice) -> Self {
        self.devices
            .lock()
            .unwrap()
            .insert(device.id.clone(), device);
        self
    }

    pub fn calls(&self) -> Vec<RegistryCall> {
        self.calls.lock().unwrap().clone()
    }

    fn not_found(device_id: &str) -> CropCloudError {
        CropCloudError::NotFound(cropcloud_domain::error::NotFoundError {
            entity: "Device",
            id: device_id.to_string(),
        })
    }
}

impl DeviceRegistry for FakeRegistry {
    async fn list_devices(&self) -> Result<Vec<String>, CropCloudError> {
        let mut ids: Vec<String> = self.devices.lock().unwrap().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn get_device(&self, device_id: &str) -> Result<RegistryDevice, CropCloudError> {
        self.devices
            .lock()
            .unwrap()
            .get(device_id)
            .cloned()
            .ok_or_else(|| Self::not_found(device_id))
    }

    async fn delete_device(&self, device_id: &str) -> Result<(), CropCloudError> {
        self.calls
            .lock()
            .unwrap()
            .push(RegistryCall::Delete(device_id.to_string()));
        self.devices
            .lock()
            .unwrap()
            .remove(device_id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(device_id))
    }

    async fn latest_config_version(&self, device_id: &str) -> Result<Option<u64>, CropCloudError> {
        Ok(self.config_versions.lock().unwrap().get(device_id).copied())
    }

    async fn modify_config(
        &self,
        device_id: &str,
        version_to_update: u64,
        data: Vec<u8>,
    ) -> Result<(), CropCloudError> {
        self.calls.lock().unwrap().push(RegistryCall::ModifyConfig {
            device_id: device_id.to_string(),
            version: version_to_update,
            data,
        });
        Ok(())
    }

    async fn send_command(
        &self,
        device_id: &str,
        subfolder: &str,
        data: Vec<u8>,
    ) -> Result<(), CropCloudError> {
        if let Some(message) = self.command_error.lock().unwrap().clone() {
            return Err(CropCloudError::Remote(Box::new(RemoteFailure(message))));
        }
        self.calls.lock().unwrap().push(RegistryCall::SendCommand {
            device_id: device_id.to_string(),
            subfolder: subfolder.to_string(),
            data,
        });
        Ok(())
    }

    async fn create_device(&self, device: NewRegistryDevice) -> Result<(), CropCloudError> {
        self.calls
            .lock()
            .unwrap()
            .push(RegistryCall::Create(device.clone()));
        self.devices.lock().unwrap().insert(
            device.id.clone(),
            RegistryDevice {
                id: device.id,
                metadata: device.metadata,
                ..RegistryDevice::default()
            },
        );
        Ok(())
    }
}
