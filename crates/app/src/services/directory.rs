//! Device directory: users, devices, sessions and images as seen by the
//! admin UI.

use std::collections::BTreeMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use cropcloud_domain::device_data::value_text;
use cropcloud_domain::directory::{
    BasicDeviceInfo, BootInfo, DeviceDataSummary, DeviceList, DeviceRecord, DeviceSummary,
    EntityCounts, ImageRecord, NEVER, User, UserList, UserSummary, minutes_since,
};
use cropcloud_domain::id::{DeviceKey, UserId};
use cropcloud_domain::shard::{kind, property};
use cropcloud_domain::time::{format_timestamp, parse_timestamp};

use crate::ports::{Clock, Entity, EntityStore, Key, Query};

use super::device_data::DeviceDataAccessor;
use super::device_key;

/// Kinds reported by [`DeviceDirectory::counts`].
const COUNTED_KINDS: [&str; 6] = [
    kind::DEVICES,
    kind::USERS,
    kind::HORTICULTURE_MEASUREMENTS,
    kind::MQTT_SERVICE_CACHE,
    kind::MQTT_SERVICE_TURDS,
    kind::IMAGES,
];

/// Environment series summarised per device in the data list.
const ENVIRONMENT: [&str; 6] = [
    property::RH,
    property::TEMP,
    property::CO2,
    property::WATER_EC,
    property::WATER_PH,
    property::WATER_TEMP,
];

/// Owner name shown when a device has no known owner.
const UNKNOWN_OWNER: &str = "None";

/// Series removed together with a device.
const DEVICE_SERIES: [&str; 3] = [property::RUNS, property::NOTIFICATIONS, property::SCHEDULE];

fn decode<T: DeserializeOwned>(entity: &Entity) -> Option<T> {
    match serde_json::from_value(Value::Object(entity.properties.clone())) {
        Ok(record) => Some(record),
        Err(err) => {
            tracing::error!(error = %err, kind = %entity.key.kind, "skipping malformed record");
            None
        }
    }
}

fn encode<T: Serialize>(record: &T) -> Option<Map<String, Value>> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(err) => {
            tracing::error!(error = %err, "failed to encode record");
            None
        }
    }
}

pub struct DeviceDirectory<S, C> {
    store: S,
    data: DeviceDataAccessor<S>,
    clock: C,
}

impl<S, C> DeviceDirectory<S, C>
where
    S: EntityStore + Clone,
    C: Clock,
{
    pub fn new(store: S, clock: C) -> Self {
        Self {
            data: DeviceDataAccessor::new(store.clone()),
            store,
            clock,
        }
    }

    fn stamp(&self) -> String {
        format_timestamp(self.clock.now())
    }

    async fn fetch(&self, query: &Query) -> Vec<Entity> {
        match self.store.query(query).await {
            Ok(entities) => entities,
            Err(err) => {
                tracing::error!(error = %err, kind = %query.kind, "directory query failed");
                Vec::new()
            }
        }
    }

    async fn first(&self, kind: &str, property: &str, value: &str) -> Option<Entity> {
        self.fetch(&Query::new(kind).filter(property, value).limit(Some(1)))
            .await
            .into_iter()
            .next()
    }

    async fn count(&self, query: &Query) -> usize {
        match self.store.keys(query).await {
            Ok(keys) => keys.len(),
            Err(err) => {
                tracing::error!(error = %err, kind = %query.kind, "failed to count entities");
                0
            }
        }
    }

    /// Number of stored entities in each directory kind.
    pub async fn counts(&self) -> EntityCounts {
        let mut counts = BTreeMap::new();
        for kind in COUNTED_KINDS {
            counts.insert(kind.to_string(), self.count(&Query::new(kind)).await);
        }
        EntityCounts {
            counts,
            timestamp: self.stamp(),
        }
    }

    /// Latest session date of a user. Older sessions are deleted on the way.
    async fn latest_session(&self, user_uuid: &str) -> Option<String> {
        let sessions = self
            .fetch(&Query::new(kind::USER_SESSION).filter("user_uuid", user_uuid))
            .await;
        let latest = sessions
            .iter()
            .filter_map(|session| session.get_str("created_date"))
            .max()?
            .to_string();
        for session in &sessions {
            if session.get_str("created_date") != Some(latest.as_str()) {
                if let Err(err) = self.store.delete(&session.key).await {
                    tracing::warn!(%err, "failed to prune stale session");
                }
            }
        }
        Some(latest)
    }

    /// Every user with device count and last activity.
    pub async fn users(&self) -> UserList {
        let mut users = Vec::new();
        for entity in self.fetch(&Query::new(kind::USERS)).await {
            let Some(user) = decode::<User>(&entity) else {
                continue;
            };
            let user_uuid = user.user_uuid.to_string();
            let number_of_devices = self
                .count(&Query::new(kind::DEVICES).filter("user_uuid", user_uuid.as_str()))
                .await;
            let account_activity_date = self
                .latest_session(&user_uuid)
                .await
                .unwrap_or_else(|| UserSummary::NEVER_ACTIVE.to_string());
            users.push(UserSummary {
                account_creation_date: format_timestamp(user.date_added),
                email_address: user.email_address,
                user_name: user.username,
                user_uuid,
                organization: user.organization,
                number_of_devices,
                account_activity_date,
            });
        }
        UserList {
            users,
            timestamp: self.stamp(),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn add_user(&self, username: &str, email_address: &str, organization: &str) -> Option<UserId> {
        let user = User::new(username, email_address, organization, self.clock.now());
        let properties = encode(&user)?;
        match self
            .store
            .put(Entity::new(Key::incomplete(kind::USERS), properties))
            .await
        {
            Ok(_) => Some(user.user_uuid),
            Err(err) => {
                tracing::error!(error = %err, "failed to add user");
                None
            }
        }
    }

    /// Change a user's profile fields. Returns `false` for unknown users.
    #[tracing::instrument(skip(self))]
    pub async fn update_user(
        &self,
        user_uuid: &str,
        username: &str,
        email_address: &str,
        organization: &str,
    ) -> bool {
        let Some(mut entity) = self.first(kind::USERS, "user_uuid", user_uuid).await else {
            return false;
        };
        for (name, value) in [
            ("username", username),
            ("email_address", email_address),
            ("organization", organization),
        ] {
            entity
                .properties
                .insert(name.to_string(), Value::String(value.to_string()));
        }
        match self.store.put(entity).await {
            Ok(_) => true,
            Err(err) => {
                tracing::error!(error = %err, "failed to update user");
                false
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_user(&self, user_uuid: &str) -> bool {
        let Some(entity) = self.first(kind::USERS, "user_uuid", user_uuid).await else {
            return false;
        };
        match self.store.delete(&entity.key).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(error = %err, "failed to delete user");
                false
            }
        }
    }

    async fn device_records(&self) -> Vec<DeviceRecord> {
        self.fetch(&Query::new(kind::DEVICES))
            .await
            .iter()
            .filter_map(decode)
            .collect()
    }

    async fn user_name(&self, user_uuid: &str, fallback: &str) -> String {
        if user_uuid.is_empty() {
            return fallback.to_string();
        }
        self.first(kind::USERS, "user_uuid", user_uuid)
            .await
            .map_or_else(
                || fallback.to_string(),
                |user| user.get_str("username").unwrap_or(UNKNOWN_OWNER).to_string(),
            )
    }

    async fn boot_info(&self, device_uuid: &str) -> BootInfo {
        self.data
            .device_data(property::BOOT, device_uuid, Some(1))
            .await
            .first()
            .and_then(|record| record.get("value"))
            .map(BootInfo::from_value)
            .unwrap_or_default()
    }

    /// Name, notes and key of every device.
    pub async fn basic_devices(&self) -> Vec<BasicDeviceInfo> {
        self.device_records()
            .await
            .iter()
            .map(BasicDeviceInfo::from)
            .collect()
    }

    /// Every device with owner and connectivity details.
    pub async fn devices(&self) -> DeviceList<DeviceSummary> {
        let mut devices = Vec::new();
        for record in self.device_records().await {
            let boot = self.boot_info(&record.device_uuid).await;
            devices.push(DeviceSummary {
                registration_date: record
                    .registration_date
                    .map(format_timestamp)
                    .unwrap_or_default(),
                user_name: self.user_name(&record.user_uuid, UNKNOWN_OWNER).await,
                device_name: record.device_name,
                device_notes: record.device_notes,
                device_uuid: record.device_uuid,
                user_uuid: record.user_uuid,
                last_config_send_time: NEVER.to_string(),
                last_error_message: DeviceSummary::NO_REGISTRATION.to_string(),
                remote_url: boot.remote_url.unwrap_or_default(),
                access_point: boot.access_point.unwrap_or_default(),
            });
        }
        DeviceList {
            devices,
            timestamp: self.stamp(),
        }
    }

    /// Every device with its latest environment readings and how many
    /// minutes ago it last reported.
    pub async fn device_data_list(&self) -> DeviceList<DeviceDataSummary> {
        let now = self.clock.now();
        let mut devices = Vec::new();
        for record in self.device_records().await {
            let boot = self.boot_info(&record.device_uuid).await;
            let mut readings = BTreeMap::new();
            let mut last_message_time: Option<String> = None;
            for name in ENVIRONMENT {
                let latest = self
                    .data
                    .device_data(name, &record.device_uuid, Some(1))
                    .await
                    .into_iter()
                    .next();
                let value = latest
                    .as_ref()
                    .and_then(|r| r.get("value"))
                    .map(value_text)
                    .unwrap_or_default();
                readings.insert(name.to_string(), value);
                let time = latest
                    .as_ref()
                    .and_then(|r| r.get("timestamp"))
                    .and_then(Value::as_str)
                    .filter(|ts| parse_timestamp(ts).is_ok())
                    .map(str::to_string);
                if time > last_message_time {
                    last_message_time = time;
                }
            }
            let last_message_time = last_message_time.unwrap_or_else(|| NEVER.to_string());
            devices.push(DeviceDataSummary {
                user_name: self.user_name(&record.user_uuid, &record.user_uuid).await,
                last_image: self.latest_image_url(&record.device_uuid).await,
                stale: minutes_since(&last_message_time, now),
                last_message_time,
                device_uuid: record.device_uuid,
                device_name: record.device_name,
                remote_url: boot.remote_url.unwrap_or_default(),
                access_point: boot.access_point.unwrap_or_default(),
                readings,
            });
        }
        DeviceList {
            devices,
            timestamp: self.stamp(),
        }
    }

    /// Add a device owned by a fresh placeholder user; returns its key.
    #[tracing::instrument(skip(self))]
    pub async fn add_device(&self, device_name: &str, device_notes: &str) -> Option<String> {
        let record = DeviceRecord {
            device_name: device_name.to_string(),
            device_notes: device_notes.to_string(),
            device_type: DeviceRecord::DEFAULT_TYPE.to_string(),
            registration_date: Some(self.clock.now()),
            device_uuid: DeviceKey::generate().to_string(),
            user_uuid: UserId::new().to_string(),
            device_software_version: None,
        };
        self.save_device(&record).await.then_some(record.device_uuid)
    }

    /// Store a device record, replacing any record with the same key.
    pub async fn save_device(&self, record: &DeviceRecord) -> bool {
        let Some(properties) = encode(record) else {
            return false;
        };
        let key = match self.first(kind::DEVICES, "device_uuid", &record.device_uuid).await {
            Some(existing) => existing.key,
            None => Key::incomplete(kind::DEVICES),
        };
        match self.store.put(Entity::new(key, properties)).await {
            Ok(_) => true,
            Err(err) => {
                tracing::error!(error = %err, "failed to save device");
                false
            }
        }
    }

    /// Remove a device record and its runs, notifications and schedule.
    #[tracing::instrument(skip(self))]
    pub async fn delete_device(&self, device_uuid: &str) -> bool {
        let Some(device) = device_key(device_uuid) else {
            return false;
        };
        let mut ok = true;
        if let Some(entity) = self.first(kind::DEVICES, "device_uuid", device_uuid).await {
            ok &= self.data.remove(&entity.key).await;
        }
        for series in DEVICE_SERIES {
            match self
                .data
                .entities(kind::DEVICE_DATA, series, &device, None)
                .await
            {
                Ok(entities) => {
                    for entity in entities {
                        ok &= self.data.remove(&entity.key).await;
                    }
                }
                Err(err) => {
                    tracing::error!(error = %err, %series, "failed to list device series");
                    ok = false;
                }
            }
        }
        ok
    }

    pub async fn device_name(&self, device_uuid: &str) -> String {
        self.first(kind::DEVICES, "device_uuid", device_uuid)
            .await
            .and_then(|entity| entity.get_str("device_name").map(str::to_string))
            .unwrap_or_else(|| DeviceRecord::INVALID_NAME.to_string())
    }

    /// Software version the device reported at registration, if any.
    pub async fn software_version(&self, device_uuid: &str) -> Option<String> {
        self.first(kind::DEVICES, "device_uuid", device_uuid)
            .await?
            .get_str("device_software_version")
            .map(str::to_string)
    }

    /// URL of the newest image published by the device, `""` if none.
    pub async fn latest_image_url(&self, device_uuid: &str) -> String {
        if device_key(device_uuid).is_none() {
            return String::new();
        }
        let query = Query::new(kind::IMAGES)
            .filter("device_uuid", device_uuid)
            .order_desc("creation_date")
            .limit(Some(1));
        self.fetch(&query)
            .await
            .first()
            .and_then(|entity| entity.get_str("URL").map(str::to_string))
            .unwrap_or_default()
    }

    #[tracing::instrument(skip(self))]
    pub async fn save_image_url(&self, device_uuid: &str, url: &str, camera_name: &str) -> bool {
        let record = ImageRecord {
            device_uuid: device_uuid.to_string(),
            url: url.to_string(),
            camera_name: camera_name.to_string(),
            creation_date: self.stamp(),
        };
        let Some(properties) = encode(&record) else {
            return false;
        };
        match self
            .store
            .put(Entity::new(Key::incomplete(kind::IMAGES), properties))
            .await
        {
            Ok(_) => true,
            Err(err) => {
                tracing::error!(error = %err, "failed to save image url");
                false
            }
        }
    }

    /// Whole minutes since a wire timestamp, or `Never`.
    pub fn minutes_since(&self, timestamp: &str) -> String {
        minutes_since(timestamp, self.clock.now())
    }
}
