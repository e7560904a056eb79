//! User and device directory records and the admin views built from them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::UserId;
use crate::time::{Timestamp, minutes_between, parse_timestamp};

/// Placeholder shown for times that never happened.
pub const NEVER: &str = "Never";

/// A registered user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub email_address: String,
    #[serde(default)]
    pub password: String,
    #[serde(with = "crate::time::wire")]
    pub date_added: Timestamp,
    #[serde(default)]
    pub organization: String,
    pub user_uuid: UserId,
    #[serde(default)]
    pub is_verified: bool,
}

impl User {
    /// A verified account with no password, as created from the admin UI.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        email_address: impl Into<String>,
        organization: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            username: username.into(),
            email_address: email_address.into(),
            password: String::new(),
            date_added: now,
            organization: organization.into(),
            user_uuid: UserId::new(),
            is_verified: true,
        }
    }
}

/// Row of the admin user list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub account_creation_date: String,
    pub email_address: String,
    pub user_name: String,
    pub user_uuid: String,
    pub organization: String,
    pub number_of_devices: usize,
    pub account_activity_date: String,
}

impl UserSummary {
    pub const NEVER_ACTIVE: &'static str = "Never Active";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserList {
    pub users: Vec<UserSummary>,
    pub timestamp: String,
}

/// A device as recorded in the directory. Every field is optional on read
/// because records are written by several generations of tooling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceRecord {
    pub device_name: String,
    pub device_notes: String,
    pub device_type: String,
    #[serde(with = "crate::time::wire::option")]
    pub registration_date: Option<Timestamp>,
    pub device_uuid: String,
    pub user_uuid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_software_version: Option<String>,
}

impl DeviceRecord {
    /// Default type for devices added from the admin UI.
    pub const DEFAULT_TYPE: &'static str = "EDU";
    /// Name reported for unknown devices.
    pub const INVALID_NAME: &'static str = "Invalid device";
}

/// Name, notes and key of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicDeviceInfo {
    pub device_name: String,
    pub device_notes: String,
    pub device_uuid: String,
}

impl From<&DeviceRecord> for BasicDeviceInfo {
    fn from(record: &DeviceRecord) -> Self {
        Self {
            device_name: record.device_name.clone(),
            device_notes: record.device_notes.clone(),
            device_uuid: record.device_uuid.clone(),
        }
    }
}

/// Connectivity details a device announces in its `boot` report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootInfo {
    pub remote_url: Option<String>,
    pub access_point: Option<String>,
}

impl BootInfo {
    const ACCESS_POINT_PREFIX: &'static str = "BeagleBone-";

    /// Read a boot report value, stored either as a JSON document or as its
    /// text. The remote URL is lower-cased and only the wifi code of a
    /// `BeagleBone-<code>` access point is kept.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let parsed;
        let document = match value {
            Value::String(text) => {
                parsed = serde_json::from_str::<Value>(text)
                    .or_else(|_| crate::literal::parse(text))
                    .unwrap_or(Value::Null);
                &parsed
            }
            other => other,
        };
        let remote_url = document
            .get("remote_URL")
            .and_then(Value::as_str)
            .map(str::to_lowercase);
        let access_point = document
            .get("access_point")
            .and_then(Value::as_str)
            .filter(|ap| ap.starts_with(Self::ACCESS_POINT_PREFIX))
            .and_then(|ap| ap.split('-').nth(1))
            .map(str::to_string);
        Self {
            remote_url,
            access_point,
        }
    }
}

/// Row of the detailed admin device list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub registration_date: String,
    pub device_name: String,
    pub device_notes: String,
    pub device_uuid: String,
    pub user_uuid: String,
    pub last_config_send_time: String,
    pub last_error_message: String,
    pub user_name: String,
    #[serde(rename = "remote_URL")]
    pub remote_url: String,
    pub access_point: String,
}

impl DeviceSummary {
    pub const NO_REGISTRATION: &'static str = "No IoT registration";
}

/// Row of the per-device latest environment list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDataSummary {
    pub device_uuid: String,
    pub device_name: String,
    pub user_name: String,
    #[serde(rename = "remote_URL")]
    pub remote_url: String,
    pub access_point: String,
    /// Latest value per environment property.
    #[serde(flatten)]
    pub readings: BTreeMap<String, String>,
    pub last_message_time: String,
    pub stale: String,
    pub last_image: String,
}

/// A list of devices stamped with the time it was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceList<T> {
    pub devices: Vec<T>,
    pub timestamp: String,
}

/// Number of stored entities per kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCounts {
    #[serde(flatten)]
    pub counts: BTreeMap<String, usize>,
    pub timestamp: String,
}

/// Pointer to a stored device image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub device_uuid: String,
    #[serde(rename = "URL")]
    pub url: String,
    pub camera_name: String,
    pub creation_date: String,
}

/// Whole minutes since `then` as text, or `Never` when `then` is `Never`
/// or unreadable.
#[must_use]
pub fn minutes_since(then: &str, now: Timestamp) -> String {
    match parse_timestamp(then) {
        Ok(then) => minutes_between(then, now).to_string(),
        Err(_) => NEVER.to_string(),
    }
}
