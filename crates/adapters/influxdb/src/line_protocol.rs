//! Line protocol encoding.
//!
//! `measurement,tag=value field=value seconds`, one point per line.

use std::fmt::Write;

use cropcloud_domain::timeseries::{FieldValue, Point};

/// Escape `specials` in an unquoted identifier.
///
/// Line breaks become escaped spaces so a point never spans two lines, and
/// trailing backslashes are dropped since they would escape the delimiter
/// that follows.
fn escape_identifier(out: &mut String, text: &str, specials: &[char]) {
    for c in text.trim_end_matches('\\').chars() {
        match c {
            '\n' | '\r' => out.push_str("\\ "),
            c if specials.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
}

fn escape_measurement(out: &mut String, text: &str) {
    escape_identifier(out, text, &[',', ' ']);
}

/// Tag keys, tag values and field keys share the same escaping.
fn escape_key(out: &mut String, text: &str) {
    escape_identifier(out, text, &[',', '=', ' ']);
}

fn push_field_value(out: &mut String, value: &FieldValue) {
    match value {
        FieldValue::Float(float) => {
            let _ = write!(out, "{float}");
        }
        FieldValue::Integer(int) => {
            let _ = write!(out, "{int}i");
        }
        FieldValue::Boolean(flag) => out.push_str(if *flag { "true" } else { "false" }),
        FieldValue::String(text) => {
            out.push('"');
            for c in text.chars() {
                match c {
                    '"' | '\\' => {
                        out.push('\\');
                        out.push(c);
                    }
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    c => out.push(c),
                }
            }
            out.push('"');
        }
    }
}

/// Encode one point. Points without fields cannot be written and yield `None`.
fn encode_point(point: &Point) -> Option<String> {
    if point.fields.is_empty() {
        return None;
    }
    let mut line = String::new();
    escape_measurement(&mut line, &point.measurement);
    let tags = point
        .tags
        .iter()
        .filter(|(_, value)| !value.trim_end_matches('\\').is_empty());
    for (key, value) in tags {
        line.push(',');
        escape_key(&mut line, key);
        line.push('=');
        escape_key(&mut line, value);
    }
    for (index, (key, value)) in point.fields.iter().enumerate() {
        line.push(if index == 0 { ' ' } else { ',' });
        escape_key(&mut line, key);
        line.push('=');
        push_field_value(&mut line, value);
    }
    let _ = write!(line, " {}", point.time.timestamp());
    Some(line)
}

/// Newline-separated body for the write endpoint.
#[must_use]
pub fn encode_points(points: &[Point]) -> String {
    points
        .iter()
        .filter_map(encode_point)
        .collect::<Vec<_>>()
        .join("\n")
}
