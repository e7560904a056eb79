//! Runs ledger: start/stop history of recipes executed on a device.

use cropcloud_domain::device_data::DATA_PROPERTY;
use cropcloud_domain::run::Run;
use cropcloud_domain::shard::{kind, property};

use crate::ports::{Clock, Entity, EntityStore};

use super::device_data::{DeviceDataAccessor, entity_data};
use super::device_key;

pub struct RunsLedger<S, C> {
    data: DeviceDataAccessor<S>,
    clock: C,
}

fn decode(entity: &Entity) -> Option<Run> {
    match serde_json::from_value(entity_data(entity)) {
        Ok(run) => Some(run),
        Err(err) => {
            tracing::error!(error = %err, "skipping malformed run");
            None
        }
    }
}

impl<S: EntityStore, C: Clock> RunsLedger<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self {
            data: DeviceDataAccessor::new(store),
            clock,
        }
    }

    /// Open a run of `recipe_name`. A run still open is closed first so at
    /// most one run is in progress per device.
    #[tracing::instrument(skip(self))]
    pub async fn start(&self, device: &str, recipe_name: &str) -> bool {
        let Some(key) = device_key(device) else {
            return false;
        };
        let now = self.clock.now();
        if !self.close_latest(device).await {
            tracing::debug!("no open run to close");
        }
        let run = Run::begin(recipe_name, now);
        let payload = match serde_json::to_value(&run) {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(error = %err, "failed to encode run");
                return false;
            }
        };
        self.data
            .append(kind::DEVICE_DATA, property::RUNS, &key, payload, run.start)
            .await
    }

    /// Close the latest run at the current time.
    ///
    /// Returns `false` when there is no open run.
    #[tracing::instrument(skip(self))]
    pub async fn stop(&self, device: &str) -> bool {
        self.close_latest(device).await
    }

    async fn close_latest(&self, device: &str) -> bool {
        let Some(key) = device_key(device) else {
            return false;
        };
        let latest = match self
            .data
            .entities(kind::DEVICE_DATA, property::RUNS, &key, Some(1))
            .await
        {
            Ok(entities) => entities.into_iter().next(),
            Err(err) => {
                tracing::error!(error = %err, "failed to read latest run");
                return false;
            }
        };
        let Some(mut entity) = latest else {
            return false;
        };
        let Some(mut run) = decode(&entity) else {
            return false;
        };
        if !run.finish(self.clock.now()) {
            return false;
        }
        match serde_json::to_value(&run) {
            Ok(value) => {
                entity.properties.insert(DATA_PROPERTY.to_string(), value);
                self.data.replace(entity).await
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to encode run");
                false
            }
        }
    }

    /// Every run, newest first.
    pub async fn get_all(&self, device: &str) -> Vec<Run> {
        let Some(key) = device_key(device) else {
            return Vec::new();
        };
        match self
            .data
            .entities(kind::DEVICE_DATA, property::RUNS, &key, None)
            .await
        {
            Ok(entities) => entities.iter().filter_map(decode).collect(),
            Err(err) => {
                tracing::error!(error = %err, "failed to read runs");
                Vec::new()
            }
        }
    }

    pub async fn get_latest(&self, device: &str) -> Option<Run> {
        let key = device_key(device)?;
        match self
            .data
            .entities(kind::DEVICE_DATA, property::RUNS, &key, Some(1))
            .await
        {
            Ok(entities) => entities.first().and_then(decode),
            Err(err) => {
                tracing::error!(error = %err, "failed to read latest run");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ManualClock;
    use crate::testing::InMemoryStore;
    use cropcloud_domain::time::parse_timestamp;

    fn setup() -> (InMemoryStore, ManualClock, RunsLedger<InMemoryStore, ManualClock>) {
        let store = InMemoryStore::default();
        let clock = ManualClock::new(parse_timestamp("2024-01-01T00:00:00Z").unwrap());
        let ledger = RunsLedger::new(store.clone(), clock.clone());
        (store, clock, ledger)
    }

    #[tokio::test]
    async fn should_record_one_closed_run_after_start_and_stop() {
        let (store, clock, ledger) = setup();
        assert!(ledger.start("dev-1", "Demo").await);
        clock.advance_hours(2);
        assert!(ledger.stop("dev-1").await);

        let runs = ledger.get_all("dev-1").await;
        assert_eq!(runs.len(), 1);
        let run = &runs[0];
        assert_eq!(run.recipe_name, "Demo");
        assert_eq!(run.start, parse_timestamp("2024-01-01T00:00:00Z").unwrap());
        assert_eq!(run.end, Some(parse_timestamp("2024-01-01T02:00:00Z").unwrap()));
        assert!(run.end.unwrap() >= run.start);
        assert_eq!(store.all("DeviceData_runs_dev-1").len(), 1);
    }

    #[tokio::test]
    async fn should_not_stop_when_no_run_is_open() {
        let (_, _, ledger) = setup();
        assert!(!ledger.stop("dev-1").await);
        ledger.start("dev-1", "Demo").await;
        assert!(ledger.stop("dev-1").await);
        assert!(!ledger.stop("dev-1").await);
    }

    #[tokio::test]
    async fn should_close_open_run_when_starting_another() {
        let (_, clock, ledger) = setup();
        ledger.start("dev-1", "First").await;
        clock.advance_hours(1);
        ledger.start("dev-1", "Second").await;

        let runs = ledger.get_all("dev-1").await;
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].recipe_name, "Second");
        assert!(runs[0].is_open());
        assert!(!runs[1].is_open());
        assert_eq!(ledger.get_latest("dev-1").await.unwrap().recipe_name, "Second");
    }

    #[tokio::test]
    async fn should_return_nothing_for_unknown_device() {
        let (_, _, ledger) = setup();
        assert!(ledger.get_all("dev-9").await.is_empty());
        assert_eq!(ledger.get_latest("dev-9").await, None);
        assert!(!ledger.start("None", "Demo").await);
    }
}
