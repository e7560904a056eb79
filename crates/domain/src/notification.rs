//! User-facing notifications queued per device.
//!
//! A stored notification is by definition unacknowledged; acknowledging one
//! deletes it.

use serde::{Deserialize, Serialize};

use crate::id::NotificationId;
use crate::time::Timestamp;

/// Notification type that renders a single "Done" button.
pub const TYPE_DONE: &str = "Done";

/// One queued notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "ID")]
    pub id: NotificationId,
    #[serde(rename = "type", default = "default_type")]
    pub kind: String,
    pub message: String,
    #[serde(alias = "created", with = "crate::time::wire")]
    pub created_at: Timestamp,
    #[serde(rename = "URL", default)]
    pub url: Option<String>,
}

fn default_type() -> String {
    TYPE_DONE.to_string()
}

impl Notification {
    /// Create a notification with a fresh random id.
    #[must_use]
    pub fn new(
        message: impl Into<String>,
        kind: impl Into<String>,
        url: Option<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: NotificationId::generate(),
            kind: kind.into(),
            message: message.into(),
            created_at,
            url: url.filter(|u| !u.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse_timestamp;
    use serde_json::json;

    #[test]
    fn should_serialize_wire_field_names() {
        let mut notification = Notification::new(
            "Check your fluid level",
            TYPE_DONE,
            None,
            parse_timestamp("2024-01-01T00:00:00Z").unwrap(),
        );
        notification.id = NotificationId::from_token("ABC123");

        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(
            json,
            json!({
                "ID": "ABC123",
                "type": "Done",
                "message": "Check your fluid level",
                "created_at": "2024-01-01T00:00:00Z",
                "URL": null,
            })
        );
    }

    #[test]
    fn should_read_legacy_created_field() {
        let notification: Notification = serde_json::from_value(json!({
            "ID": "XYZ789",
            "type": "Done",
            "message": "Time to prune your plant",
            "created": "2019-08-09T16:52:46Z",
            "URL": "https://example.com/video",
        }))
        .unwrap();
        assert_eq!(notification.id.as_str(), "XYZ789");
        assert_eq!(notification.url.as_deref(), Some("https://example.com/video"));
    }

    #[test]
    fn should_drop_empty_url() {
        let notification = Notification::new("m", TYPE_DONE, Some(String::new()), crate::time::now());
        assert_eq!(notification.url, None);
    }
}
