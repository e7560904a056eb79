//! Time and timestamp helpers.
//!
//! Every timestamp stored or sent on the wire is a fixed-width, zero padded
//! UTC string (`2024-01-01T00:00:00Z`), so two timestamps compare correctly
//! as plain strings.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::ValidationError;

/// UTC timestamp used for run starts, schedule deadlines, notifications, etc.
pub type Timestamp = DateTime<Utc>;

/// `strftime` pattern of the wire timestamp format.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// `strftime` pattern of calendar dates used in range queries.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Render a timestamp in the wire format.
#[must_use]
pub fn format_timestamp(ts: Timestamp) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a wire-format timestamp.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidTimestamp`] if `text` is not in
/// [`TIMESTAMP_FORMAT`].
pub fn parse_timestamp(text: &str) -> Result<Timestamp, ValidationError> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| ValidationError::InvalidTimestamp(text.to_string()))
}

/// Parse a `YYYY-MM-DD` calendar date.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidDate`] on malformed input.
pub fn parse_date(text: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(text.to_string()))
}

/// Whole minutes elapsed between `then` and `now`, truncated toward zero.
#[must_use]
pub fn minutes_between(then: Timestamp, now: Timestamp) -> i64 {
    (now - then).num_minutes()
}

/// Serde adapter storing a [`Timestamp`] field in the wire format.
///
/// Use with `#[serde(with = "cropcloud_domain::time::wire")]`.
pub mod wire {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{TIMESTAMP_FORMAT, Timestamp, parse_timestamp};

    pub fn serialize<S: Serializer>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&ts.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_timestamp(&text).map_err(serde::de::Error::custom)
    }

    /// Same as the parent module for `Option<Timestamp>`; `null` maps to `None`.
    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};

        use super::super::{TIMESTAMP_FORMAT, Timestamp, parse_timestamp};

        #[allow(clippy::ref_option)]
        pub fn serialize<S: Serializer>(
            ts: &Option<Timestamp>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match ts {
                Some(ts) => serializer.collect_str(&ts.format(TIMESTAMP_FORMAT)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Timestamp>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|text| parse_timestamp(&text).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn should_return_current_utc_time() {
        let before = Utc::now();
        let ts = now();
        let after = Utc::now();
        assert!(ts >= before);
        assert!(ts <= after);
    }

    #[test]
    fn should_format_with_fixed_width_zero_padding() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_timestamp(ts), "2024-01-02T03:04:05Z");
    }

    #[test]
    fn should_parse_what_it_formats() {
        let ts = Utc.with_ymd_and_hms(2019, 8, 9, 16, 52, 46).unwrap();
        assert_eq!(parse_timestamp(&format_timestamp(ts)).unwrap(), ts);
    }

    #[test]
    fn should_reject_timestamp_with_offset() {
        let result = parse_timestamp("2024-01-01T00:00:00+02:00");
        assert!(matches!(result, Err(ValidationError::InvalidTimestamp(_))));
    }

    #[test]
    fn should_order_formatted_timestamps_lexicographically() {
        let early = Utc.with_ymd_and_hms(2024, 9, 30, 23, 59, 59).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap();
        assert!(format_timestamp(early) < format_timestamp(late));
    }

    #[test]
    fn should_reject_invalid_date() {
        assert!(parse_date("2024-13-01").is_err());
        assert!(parse_date("2024-01-01").is_ok());
    }

    #[test]
    fn should_count_whole_minutes_between_timestamps() {
        let then = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 1, 30, 59).unwrap();
        assert_eq!(minutes_between(then, now), 90);
    }
}
