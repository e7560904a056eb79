//! Notification ledger: per-device queue of unacknowledged notifications.

use std::collections::HashSet;

use cropcloud_domain::id::NotificationId;
use cropcloud_domain::notification::Notification;
use cropcloud_domain::shard::{kind, property};

use crate::ports::{Clock, EntityStore};

use super::device_data::{DeviceDataAccessor, entity_data};
use super::device_key;

/// Draws before giving up on finding an unused token.
const MAX_ID_ATTEMPTS: usize = 16;

/// Adds, lists and acknowledges device notifications.
pub struct NotificationLedger<S, C> {
    data: DeviceDataAccessor<S>,
    clock: C,
}

impl<S: EntityStore, C: Clock> NotificationLedger<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self {
            data: DeviceDataAccessor::new(store),
            clock,
        }
    }

    /// Queue a notification and return its id, `None` when nothing was stored.
    #[tracing::instrument(skip(self, message, url))]
    pub async fn add(
        &self,
        device: &str,
        message: &str,
        notification_type: &str,
        url: Option<String>,
    ) -> Option<NotificationId> {
        let device = device_key(device)?;
        let existing = match self
            .data
            .entities(kind::DEVICE_DATA, property::NOTIFICATIONS, &device, None)
            .await
        {
            Ok(entities) => entities
                .into_iter()
                .filter_map(|entity| entity.key.as_name().map(str::to_string))
                .collect::<HashSet<_>>(),
            Err(err) => {
                tracing::error!(error = %err, "failed to list notification ids");
                return None;
            }
        };

        let mut notification =
            Notification::new(message, notification_type, url, self.clock.now());
        let mut attempts = 1;
        while existing.contains(notification.id.as_str()) {
            if attempts == MAX_ID_ATTEMPTS {
                tracing::error!(device = %device, "no free notification id");
                return None;
            }
            notification.id = NotificationId::generate();
            attempts += 1;
        }

        let payload = match serde_json::to_value(&notification) {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(error = %err, "failed to encode notification");
                return None;
            }
        };
        let id = notification.id.clone();
        self.data
            .upsert(
                kind::DEVICE_DATA,
                property::NOTIFICATIONS,
                &device,
                id.as_str(),
                payload,
                notification.created_at,
            )
            .await
            .then_some(id)
    }

    /// Every queued notification, newest first.
    pub async fn get_unacknowledged(&self, device: &str) -> Vec<Notification> {
        let Some(device) = device_key(device) else {
            return Vec::new();
        };
        self.data
            .read(kind::DEVICE_DATA, property::NOTIFICATIONS, &device, None)
            .await
            .into_iter()
            .filter_map(|value| match serde_json::from_value(value) {
                Ok(notification) => Some(notification),
                Err(err) => {
                    tracing::error!(error = %err, "skipping malformed notification");
                    None
                }
            })
            .collect()
    }

    /// Delete the first queued notification carrying `id`.
    ///
    /// Returns `false` when no such notification exists.
    #[tracing::instrument(skip(self))]
    pub async fn ack(&self, device: &str, id: &str) -> bool {
        let Some(device) = device_key(device) else {
            return false;
        };
        let entities = match self
            .data
            .entities(kind::DEVICE_DATA, property::NOTIFICATIONS, &device, None)
            .await
        {
            Ok(entities) => entities,
            Err(err) => {
                tracing::error!(error = %err, "failed to scan notifications");
                return false;
            }
        };
        let Some(found) = entities
            .into_iter()
            .find(|entity| entity_data(entity).get("ID").and_then(|v| v.as_str()) == Some(id))
        else {
            tracing::debug!(%id, "notification not found");
            return false;
        };
        self.data.remove(&found.key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ManualClock;
    use crate::testing::InMemoryStore;
    use cropcloud_domain::notification::TYPE_DONE;
    use cropcloud_domain::time::parse_timestamp;

    fn ledger(store: InMemoryStore) -> NotificationLedger<InMemoryStore, ManualClock> {
        NotificationLedger::new(
            store,
            ManualClock::new(parse_timestamp("2024-01-01T00:00:00Z").unwrap()),
        )
    }

    #[tokio::test]
    async fn should_list_added_notification() {
        let ledger = ledger(InMemoryStore::default());
        let id = ledger
            .add("dev-1", "Check your fluid level", TYPE_DONE, None)
            .await
            .unwrap();

        let queued = ledger.get_unacknowledged("dev-1").await;
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].id, id);
        assert_eq!(queued[0].message, "Check your fluid level");
    }

    #[tokio::test]
    async fn should_delete_notification_on_ack() {
        let ledger = ledger(InMemoryStore::default());
        let first = ledger.add("dev-1", "a", TYPE_DONE, None).await.unwrap();
        ledger.add("dev-1", "b", TYPE_DONE, None).await.unwrap();

        assert!(ledger.ack("dev-1", first.as_str()).await);
        let queued = ledger.get_unacknowledged("dev-1").await;
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].message, "b");
    }

    #[tokio::test]
    async fn should_return_false_when_acking_unknown_id() {
        let ledger = ledger(InMemoryStore::default());
        ledger.add("dev-1", "a", TYPE_DONE, None).await;
        assert!(!ledger.ack("dev-1", "NOPE00").await);
        assert_eq!(ledger.get_unacknowledged("dev-1").await.len(), 1);
    }

    #[tokio::test]
    async fn should_keep_queues_separate_per_device() {
        let ledger = ledger(InMemoryStore::default());
        ledger.add("dev-1", "a", TYPE_DONE, None).await;
        assert!(ledger.get_unacknowledged("dev-2").await.is_empty());
    }

    #[tokio::test]
    async fn should_generate_distinct_ids() {
        let ledger = ledger(InMemoryStore::default());
        let mut ids = HashSet::new();
        for _ in 0..20 {
            ids.insert(ledger.add("dev-1", "m", TYPE_DONE, None).await.unwrap());
        }
        assert_eq!(ids.len(), 20);
        assert_eq!(ledger.get_unacknowledged("dev-1").await.len(), 20);
    }

    #[tokio::test]
    async fn should_return_none_when_store_fails() {
        let store = InMemoryStore::default();
        store.fail();
        let ledger = ledger(store);
        assert_eq!(ledger.add("dev-1", "a", TYPE_DONE, None).await, None);
        assert!(ledger.get_unacknowledged("dev-1").await.is_empty());
        assert!(!ledger.ack("dev-1", "ABC123").await);
    }

    #[tokio::test]
    async fn should_ignore_sentinel_device() {
        let ledger = ledger(InMemoryStore::default());
        assert_eq!(ledger.add("None", "a", TYPE_DONE, None).await, None);
    }
}
