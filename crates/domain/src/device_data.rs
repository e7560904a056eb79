//! Device telemetry records and the views derived from them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Property holding the record payload on a stored series entity.
pub const DATA_PROPERTY: &str = "data";

/// Property holding the wire timestamp a series is ordered by.
pub const TIMESTAMP_PROPERTY: &str = "timestamp";

/// One `{value, time}` point of a chartable history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub value: String,
    pub time: String,
}

impl HistoryPoint {
    /// Build a point from a stored reading, if it carries both fields.
    #[must_use]
    pub fn from_record(record: &Map<String, Value>) -> Option<Self> {
        Some(Self {
            value: value_text(record.get("value")?),
            time: record.get(TIMESTAMP_PROPERTY)?.as_str()?.to_string(),
        })
    }
}

/// Combined air temperature and humidity histories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempHumidityHistory {
    #[serde(rename = "RH")]
    pub rh: Vec<HistoryPoint>,
    pub temp: Vec<HistoryPoint>,
}

/// Summary of a device's latest recipe status report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub timestamp: String,
    pub percent_complete: String,
    pub time_elapsed: String,
    pub device_status: String,
    pub air_temp: String,
}

impl DeviceStatus {
    /// Combine the latest `status` record with the latest air temperature.
    #[must_use]
    pub fn from_records(status: &Map<String, Value>, temperature: &Map<String, Value>) -> Self {
        let text = |record: &Map<String, Value>, key: &str| {
            record.get(key).map(value_text).unwrap_or_default()
        };
        Self {
            timestamp: text(status, TIMESTAMP_PROPERTY),
            percent_complete: text(status, "recipe_percent_complete_string"),
            time_elapsed: text(status, "recipe_time_elapsed_string"),
            device_status: text(status, "status"),
            air_temp: text(temperature, "value"),
        }
    }
}

/// Render a stored JSON value as display text: strings unquoted, everything
/// else in its JSON form.
#[must_use]
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Format a decimal string to exactly two fractional digits, rounding half
/// away from zero on the decimal digits themselves.
///
/// `"512.345"` becomes `"512.35"` regardless of how the number would be
/// represented as a binary float. Inputs in exponent notation fall back to
/// float formatting. Returns `None` for anything that is not a number.
#[must_use]
pub fn format_two_decimals(raw: &str) -> Option<String> {
    let text = raw.trim();
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return text
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| format!("{v:.2}"));
    }

    let mut digits: Vec<u8> = if int_part.is_empty() {
        vec![0]
    } else {
        int_part.bytes().map(|b| b - b'0').collect()
    };
    let mut frac = frac_part.bytes().map(|b| b - b'0');
    digits.push(frac.next().unwrap_or(0));
    digits.push(frac.next().unwrap_or(0));

    if frac.next().is_some_and(|d| d >= 5) {
        let mut carry = true;
        for digit in digits.iter_mut().rev() {
            if !carry {
                break;
            }
            if *digit == 9 {
                *digit = 0;
            } else {
                *digit += 1;
                carry = false;
            }
        }
        if carry {
            digits.insert(0, 1);
        }
    }

    let split = digits.len() - 2;
    let first_significant = digits[..split]
        .iter()
        .position(|d| *d != 0)
        .unwrap_or(split.saturating_sub(1));
    let render = |slice: &[u8]| slice.iter().map(|d| char::from(b'0' + d)).collect::<String>();
    let sign = if negative { "-" } else { "" };
    Some(format!(
        "{sign}{}.{}",
        render(&digits[first_significant..split]),
        render(&digits[split..])
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn should_round_half_up_on_decimal_digits() {
        assert_eq!(format_two_decimals("512.345").as_deref(), Some("512.35"));
        assert_eq!(format_two_decimals("0.125").as_deref(), Some("0.13"));
        assert_eq!(format_two_decimals("1.004").as_deref(), Some("1.00"));
    }

    #[test]
    fn should_pad_short_fractions() {
        assert_eq!(format_two_decimals("400").as_deref(), Some("400.00"));
        assert_eq!(format_two_decimals("21.5").as_deref(), Some("21.50"));
        assert_eq!(format_two_decimals(".5").as_deref(), Some("0.50"));
    }

    #[test]
    fn should_carry_into_integer_part() {
        assert_eq!(format_two_decimals("9.999").as_deref(), Some("10.00"));
        assert_eq!(format_two_decimals("-99.995").as_deref(), Some("-100.00"));
    }

    #[test]
    fn should_strip_leading_zeros() {
        assert_eq!(format_two_decimals("007.1").as_deref(), Some("7.10"));
        assert_eq!(format_two_decimals("000").as_deref(), Some("0.00"));
    }

    #[test]
    fn should_fall_back_to_float_for_exponent_notation() {
        assert_eq!(format_two_decimals("1e2").as_deref(), Some("100.00"));
    }

    #[test]
    fn should_reject_non_numbers() {
        assert_eq!(format_two_decimals(""), None);
        assert_eq!(format_two_decimals("abc"), None);
        assert_eq!(format_two_decimals("."), None);
    }

    #[test]
    fn should_build_history_point_from_reading() {
        let record = json!({"value": 412, "timestamp": "2024-01-01T00:00:00Z"});
        let point = HistoryPoint::from_record(record.as_object().unwrap()).unwrap();
        assert_eq!(point.value, "412");
        assert_eq!(point.time, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn should_summarise_status_with_empty_defaults() {
        let status = json!({"timestamp": "2024-01-01T00:00:00Z", "status": "OK"});
        let temp = json!({"value": "22.1"});
        let summary =
            DeviceStatus::from_records(status.as_object().unwrap(), temp.as_object().unwrap());
        assert_eq!(summary.device_status, "OK");
        assert_eq!(summary.percent_complete, "");
        assert_eq!(summary.air_temp, "22.1");
    }

    #[test]
    fn should_serialize_humidity_history_under_rh_key() {
        let json = serde_json::to_value(TempHumidityHistory::default()).unwrap();
        assert_eq!(json, json!({"RH": [], "temp": []}));
    }
}
