//! A lenient view over one untrusted timeline record.

use serde_json::{Map, Value};

/// The fields of a timeline record the calendar cares about.
///
/// Every field is optional and extracted on its own, so a broken field never takes the rest of
/// the record down with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    pub id: Option<String>,
    pub title: Option<String>,
    pub source: Option<String>,
    pub description: Option<String>,
    pub start_date_time: Option<String>,
    pub end_date_time: Option<String>,
    pub event_url: Option<String>,
    pub location_name: Option<String>,
    pub location_address: Option<String>,
}

impl Event {
    /// Read an event out of a raw record.
    ///
    /// Returns `None` when the record is not a JSON object at all.
    pub fn from_record(record: &Value) -> Option<Self> {
        let fields = record.as_object()?;
        Some(Self {
            id: text(fields, "id"),
            title: text(fields, "title"),
            source: text(fields, "source"),
            description: text(fields, "description"),
            start_date_time: text(fields, "startDateTime"),
            end_date_time: text(fields, "endDateTime"),
            event_url: text(fields, "eventURL"),
            location_name: text(fields, "locationName"),
            location_address: text(fields, "locationAddress"),
        })
    }
}

/// A field is present when it holds a non-empty string or a non-zero number.
fn text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(value) if !value.is_empty() => Some(value.clone()),
        Value::Number(value) if value.as_f64() != Some(0.0) => Some(value.to_string()),
        _ => None,
    }
}
