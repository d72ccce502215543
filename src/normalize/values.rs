//! Cell-level cleaning: identifiers, numbers, dates and coordinates.
//!
//! None of these fail. An unusable cell comes back as `None` (or an empty
//! identifier) and the caller decides whether the record survives.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;

static LEADING_ROUTE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)").expect("valid regex"));

static LEADING_HOUR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{1,2}):").expect("valid regex"));

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d-%b-%y", "%d-%b-%Y", "%B %d, %Y"];

/// Canonical route identifier: numbers are stringified, text is trimmed,
/// anything else is empty.
#[must_use]
pub fn clean_route_id(value: Option<&Value>) -> String {
    match value {
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Some(Value::String(s)) => s.trim().to_string(),
        _ => String::new(),
    }
}

/// Parses a numeric cell. Empty, null, non-numeric and non-finite cells are `None`.
#[must_use]
pub fn parse_number(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<f64>().ok()
        }
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

/// Parses a non-negative count cell, rounding fractional values.
#[must_use]
pub fn parse_count(value: Option<&Value>) -> Option<u64> {
    parse_number(value)
        .filter(|n| *n >= 0.0)
        .map(|n| n.round() as u64)
}

/// Parses a date cell.
///
/// Accepts RFC 3339, ISO-like date-times, several day-first and
/// month-first date layouts, and integer epoch milliseconds.
#[must_use]
pub fn parse_date(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::String(s) => parse_date_str(s),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| dt.naive_utc()),
        _ => None,
    }
}

fn parse_date_str(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// True when both values are finite and within WGS84 bounds.
#[must_use]
pub fn is_valid_coordinate(lat: f64, lng: f64) -> bool {
    lat.is_finite()
        && lng.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lng)
}

/// Reduces a route label to its leading route number, e.g.
/// `"102 MARKHAM ROAD"` becomes `"102"`. Labels without one are trimmed.
#[must_use]
pub fn route_number(label: &str) -> String {
    match LEADING_ROUTE_NUMBER.captures(label) {
        Some(caps) => caps[1].to_string(),
        None => label.trim().to_string(),
    }
}

/// Hour of day from a leading `HH:` in a time-of-day string.
#[must_use]
pub fn leading_hour(time: &str) -> Option<u32> {
    let caps = LEADING_HOUR.captures(time)?;
    caps[1].parse::<u32>().ok().filter(|h| *h < 24)
}

/// Stable identifier derived from a location name.
#[must_use]
pub fn sanitize_location_id(name: &str) -> String {
    let mut id = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        match c {
            ' ' | '/' | '\\' => id.push('_'),
            '&' => id.push_str("and"),
            '\'' | '"' | '(' | ')' | ',' => {}
            other => id.push(other),
        }
    }
    id.chars().take(50).collect()
}

/// Non-empty trimmed text of a scalar cell.
#[must_use]
pub fn text(value: Option<&Value>) -> Option<String> {
    let s = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}
