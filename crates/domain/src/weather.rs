//! Cached readings from field weather stations.
//!
//! Each station entity keeps two bounded lists, newest first: `computed`
//! readings and `device` detail snapshots. Every item is a JSON document
//! with a `time` field whose first ten characters are its calendar date.

use chrono::NaiveDate;
use serde_json::{Map, Value};

/// Property holding computed readings.
pub const COMPUTED: &str = "computed";
/// Property holding station detail snapshots.
pub const DEVICE: &str = "device";

/// Maximum cached computed readings per station.
pub const COMPUTED_CAP: usize = 2500;
/// Maximum cached detail snapshots per station.
pub const DEVICE_CAP: usize = 100;

/// One cached reading.
pub type Reading = Map<String, Value>;

/// Calendar date of a reading, taken from the first ten characters of `time`.
#[must_use]
pub fn reading_date(reading: &Reading) -> Option<NaiveDate> {
    let time = reading.get("time")?.as_str()?;
    NaiveDate::parse_from_str(time.get(..10)?, crate::time::DATE_FORMAT).ok()
}

/// Keep readings dated within `start..=end`, preserving order, then drop
/// readings whose `time` repeats the previous kept reading's.
#[must_use]
pub fn filter_by_date_range(readings: Vec<Reading>, start: NaiveDate, end: NaiveDate) -> Vec<Reading> {
    let mut kept: Vec<Reading> = readings
        .into_iter()
        .filter(|reading| reading_date(reading).is_some_and(|date| start <= date && date <= end))
        .collect();
    kept.dedup_by(|current, previous| current.get("time") == previous.get("time"));
    kept
}

/// Push `item` onto the front of a newest-first list and trim it to `cap`.
pub fn push_newest_capped(list: &mut Vec<Value>, item: Value, cap: usize) {
    list.insert(0, item);
    list.truncate(cap);
}
