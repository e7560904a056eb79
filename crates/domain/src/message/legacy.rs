//! Scanning fallback for `values` strings old firmware produced with
//! unescaped nested quotes, e.g.
//! `{'values':[{'name':'LEDPanel-Top', 'type':'str', 'value':'{'400-449': 0.0}'}]}`.

use serde_json::Value;

use crate::literal::{self, LiteralError};

const VALUE_TAG: &str = "'value':'";
const NAME_TAG: &str = "'name':'";
const END_TAG: &str = "}]}";

/// Decode the text between `'value':'` and the closing `'}]}`.
///
/// When either marker is missing the raw text itself is the value.
pub(super) fn scan_value(raw: &str) -> Result<Value, LiteralError> {
    let (Some(start), Some(end)) = (raw.find(VALUE_TAG), raw.find(END_TAG)) else {
        return Ok(Value::String(raw.to_string()));
    };
    let start = start + VALUE_TAG.len();
    let inner = end
        .checked_sub(1)
        .and_then(|end| raw.get(start..end))
        .unwrap_or_default();
    literal::parse(inner)
}

/// Text between `'name':'` and the next quote.
pub(super) fn scan_name(raw: &str) -> Option<String> {
    let start = raw.find(NAME_TAG)? + NAME_TAG.len();
    let len = raw[start..].find('\'')?;
    Some(raw[start..start + len].to_string())
}
