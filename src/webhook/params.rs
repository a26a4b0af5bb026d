// Coercion of Dialogflow parameter values.
//
// Dialogflow is loose with types: a student id may arrive as 1234567,
// 1234567.0 or "1234567", a date as an ISO string, a dd/mm/YYYY string or an
// object. Everything here takes a `serde_json::Value` and returns a typed
// value or `None`.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::core::booking::booking_models::{MAX_GROUP, MIN_GROUP};
use crate::core::booking::{BookingWindow, OpeningHours, PeriodError};

const DATE_FORMATS: [&str; 4] = ["%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d", "%Y-%m-%d"];
const DATE_OBJECT_KEYS: [&str; 5] = ["date_time", "startDate", "start_date", "start", "date"];

/// Why a time period parameter could not be turned into a booking window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeError {
    /// No period, or one without both ends.
    Missing,
    /// The ends are not readable date-times.
    Unreadable,
    Period(PeriodError),
}

/// A 7-digit student id, from a number or a string. Non-digits are dropped
/// before counting.
pub fn normalize_student_id(value: &Value) -> Option<String> {
    let raw = match value {
        Value::Number(n) => match (n.as_u64(), n.as_f64()) {
            (Some(int), _) => int.to_string(),
            (None, Some(float)) if float.fract() == 0.0 && float >= 0.0 => {
                format!("{:.0}", float)
            }
            _ => return None,
        },
        Value::String(s) => {
            let s = s.trim();
            s.strip_suffix(".0").unwrap_or(s).to_string()
        }
        _ => return None,
    };

    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    (digits.len() == 7).then_some(digits)
}

/// Integers, integral floats and digit strings.
pub fn integer(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => match (n.as_u64(), n.as_f64()) {
            (Some(int), _) => u32::try_from(int).ok(),
            (None, Some(float)) if float.fract() == 0.0 && float >= 0.0 => {
                u32::try_from(float as u64).ok()
            }
            _ => None,
        },
        Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
                s.parse().ok()
            } else {
                None
            }
        }
        _ => None,
    }
}

/// A group size the library has rooms for (1..=9).
pub fn group_size(value: &Value) -> Option<u32> {
    integer(value).filter(|n| (MIN_GROUP..=MAX_GROUP).contains(n))
}

/// A date from `today`/`tomorrow`, an ISO date or date-time, one of the
/// day-first or year-first formats, or an object wrapping one of those.
pub fn parse_date(value: &Value, today: NaiveDate) -> Option<NaiveDate> {
    match value {
        Value::String(s) => parse_date_str(s, today),
        Value::Object(map) => DATE_OBJECT_KEYS
            .iter()
            .filter_map(|key| map.get(*key).and_then(Value::as_str))
            .find(|s| !s.trim().is_empty())
            .and_then(|s| parse_date_str(s, today)),
        _ => None,
    }
}

fn parse_date_str(value: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = value.trim();
    match s.to_ascii_lowercase().as_str() {
        "" => return None,
        "today" => return Some(today),
        "tomorrow" => return today.succ_opt(),
        _ => {}
    }

    if let Some(dt) = parse_datetime(s) {
        return Some(dt.date());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// An ISO-8601 date-time, with or without an offset. The wall-clock time is
/// kept and the offset dropped.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let s = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Reads a `@sys.time-period` value (`{"startTime": .., "endTime": ..}`) and
/// validates it against the opening hours.
pub fn parse_time_period(value: &Value, hours: &OpeningHours) -> Result<BookingWindow, TimeError> {
    let Some(period) = value.as_object() else {
        return Err(TimeError::Missing);
    };
    let start = period.get("startTime").and_then(Value::as_str).unwrap_or("");
    let end = period.get("endTime").and_then(Value::as_str).unwrap_or("");
    if start.trim().is_empty() || end.trim().is_empty() {
        return Err(TimeError::Missing);
    }

    let (Some(start), Some(end)) = (parse_datetime(start), parse_datetime(end)) else {
        return Err(TimeError::Unreadable);
    };
    hours.validate(start, end).map_err(TimeError::Period)
}

/// Slot indices from a JSON array (numbers are rounded) or a JSON-encoded
/// array string. `None` when the value holds anything else.
pub fn slots_from_value(value: &Value) -> Option<Vec<u32>> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_f64()
                    .filter(|f| *f >= 0.5)
                    .map(|f| f.round() as u32)
            })
            .collect(),
        Value::String(s) => serde_json::from_str::<Value>(s)
            .ok()
            .filter(Value::is_array)
            .and_then(|v| slots_from_value(&v)),
        _ => None,
    }
}

/// ISO date-time the way the window is written back into contexts.
pub fn iso_datetime(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%dT%H:%M:%S").to_string()
}
