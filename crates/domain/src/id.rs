//! Typed identifiers.
//!
//! Users and recipes are identified by UUIDs. Devices use a registry id
//! string (`EDU-6B1261EF-b8-27-eb-7f-f2-73`) or a UUID, so [`DeviceKey`]
//! wraps a plain string. Notifications carry a short random token.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl Default for $name {
            fn default() -> Self {
                Self(uuid::Uuid::new_v4())
            }
        }

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Access the inner UUID.
            #[must_use]
            pub fn as_uuid(self) -> uuid::Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s).map(Self)
            }
        }
    };
}

define_id!(
    /// Unique identifier for a [`User`](crate::directory::User).
    UserId
);

define_id!(
    /// Unique identifier for a [`Recipe`](crate::recipe::Recipe).
    RecipeId
);

/// Identifier of a device, as stored in shard names and registry paths.
///
/// Callers often hand over the literal string `"None"` when no device is
/// selected; that sentinel, like an empty string, never forms a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceKey(String);

impl DeviceKey {
    /// Placeholder sent by UI callers when no device is selected.
    pub const SENTINEL: &'static str = "None";

    /// Build a key from optional caller input, treating the sentinel and
    /// blank strings as absent.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|value| value.parse().ok())
    }

    /// A fresh UUID key, for devices created without a registry id.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for DeviceKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == Self::SENTINEL {
            return Err(ValidationError::MissingDeviceKey);
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl TryFrom<String> for DeviceKey {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeviceKey> for String {
    fn from(key: DeviceKey) -> Self {
        key.0
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DeviceKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Short random token identifying a notification within a device's queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    /// Token length in characters.
    pub const LEN: usize = 6;

    /// Draw a new random token from `[A-Z0-9]`.
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let token = (0..Self::LEN)
            .map(|_| char::from(TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())]))
            .collect();
        Self(token)
    }

    /// Wrap a token received from a caller.
    #[must_use]
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_generate_unique_ids_when_called_twice() {
        let a = UserId::new();
        let b = UserId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn should_roundtrip_user_id_through_display_and_from_str() {
        let id = UserId::new();
        let parsed: UserId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn should_serialize_recipe_id_as_bare_uuid_string() {
        let uuid = uuid::Uuid::new_v4();
        let json = serde_json::to_string(&RecipeId::from_uuid(uuid)).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));
    }

    #[test]
    fn should_treat_sentinel_and_blank_as_missing_device_key() {
        assert_eq!(DeviceKey::parse(Some("None")), None);
        assert_eq!(DeviceKey::parse(Some("  ")), None);
        assert_eq!(DeviceKey::parse(None), None);
        assert_eq!(
            "None".parse::<DeviceKey>(),
            Err(ValidationError::MissingDeviceKey)
        );
    }

    #[test]
    fn should_accept_registry_style_device_key() {
        let key = DeviceKey::parse(Some("EDU-6B1261EF-b8-27-eb-7f-f2-73")).unwrap();
        assert_eq!(key.as_str(), "EDU-6B1261EF-b8-27-eb-7f-f2-73");
    }

    #[test]
    fn should_reject_sentinel_device_key_when_deserializing() {
        let result: Result<DeviceKey, _> = serde_json::from_str("\"None\"");
        assert!(result.is_err());
    }

    #[test]
    fn should_generate_six_char_uppercase_alphanumeric_token() {
        let id = NotificationId::generate();
        assert_eq!(id.as_str().len(), NotificationId::LEN);
        assert!(
            id.as_str()
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
    }
}
