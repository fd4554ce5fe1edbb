//! Renders timeline records as an iCalendar (RFC 5545) document.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, trace};

use crate::event::Event;

static PROD_ID: &str = "-//dogodki-google-cal//EN";
static UID_DOMAIN: &str = "dogodki-google-cal";
static UNTITLED: &str = "Untitled Event";
static FORMAT: &str = "%Y%m%dT%H%M%SZ";
static CRLF: &str = "\r\n";

/// Longest physical line in octets, line break excluded.
const MAX_LINE_OCTETS: usize = 75;
/// How many hex digits of the digest stand in for an id without usable characters.
const UID_DIGEST_LENGTH: usize = 32;

static UID_UNSAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]").unwrap());
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

static OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
];
static NAIVE_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Render the records with the current time as `DTSTAMP`.
pub fn render(records: &[Value]) -> String {
    render_at(records, Utc::now())
}

/// Render the records into a complete calendar.
///
/// This never fails. Fields that cannot be used are left out of their event, and records that
/// are not objects are left out of the calendar. Events keep the order of `records`.
pub fn render_at(records: &[Value], dtstamp: DateTime<Utc>) -> String {
    let dtstamp = format_utc(&dtstamp);
    let mut calendar = ContentLines::default();
    calendar.push("BEGIN", "VCALENDAR");
    calendar.push("VERSION", "2.0");
    calendar.push("PRODID", PROD_ID);
    calendar.push("CALSCALE", "GREGORIAN");
    calendar.push("METHOD", "PUBLISH");
    for record in records {
        let Some(event) = Event::from_record(record) else {
            debug!("skipping timeline record that is not an object");
            continue;
        };
        push_event(&mut calendar, &event, &dtstamp);
    }
    calendar.push("END", "VCALENDAR");
    calendar.finish()
}

/// Folded, CRLF-terminated content lines.
#[derive(Debug, Default)]
struct ContentLines {
    buffer: String,
}

impl ContentLines {
    /// Append `name:value`. The value must already be escaped where needed.
    fn push(&mut self, name: &str, value: &str) {
        self.buffer.push_str(&fold_line(&format!("{name}:{value}")));
        self.buffer.push_str(CRLF);
    }

    fn finish(self) -> String {
        self.buffer
    }
}

fn push_event(calendar: &mut ContentLines, event: &Event, dtstamp: &str) {
    calendar.push("BEGIN", "VEVENT");
    if let Some(id) = &event.id {
        let uid = format!("{}@{UID_DOMAIN}", sanitize_uid(id));
        calendar.push("UID", &escape_text(&uid));
    }
    calendar.push("DTSTAMP", dtstamp);
    if let Some(start) = event.start_date_time.as_deref().and_then(format_timestamp) {
        calendar.push("DTSTART", &start);
    }
    if let Some(end) = event.end_date_time.as_deref().and_then(format_timestamp) {
        calendar.push("DTEND", &end);
    }
    calendar.push("SUMMARY", &escape_text(&summary(event)));
    if let Some(description) = description(event) {
        calendar.push("DESCRIPTION", &escape_text(&description));
    }
    if let Some(url) = &event.event_url {
        calendar.push("URL", &escape_text(url));
    }
    if let Some(location) = location(event) {
        calendar.push("LOCATION", &escape_text(&location));
    }
    calendar.push("END", "VEVENT");
}

/// `[source] title`, or only the title when the source is unknown.
fn summary(event: &Event) -> String {
    let title = event.title.as_deref().unwrap_or(UNTITLED);
    match &event.source {
        Some(source) => format!("[{source}] {title}"),
        None => title.to_owned(),
    }
}

/// The description without markup, followed by a link to the event page.
fn description(event: &Event) -> Option<String> {
    let mut parts = vec![];
    if let Some(description) = &event.description {
        parts.push(strip_html(description));
    }
    if let Some(url) = &event.event_url {
        parts.push(format!("More info: {url}"));
    }
    let description = parts.join("\n\n");
    (!description.is_empty()).then_some(description)
}

fn location(event: &Event) -> Option<String> {
    match (&event.location_name, &event.location_address) {
        (Some(name), Some(address)) => Some(format!("{name}, {address}")),
        (Some(name), None) => Some(name.clone()),
        (None, Some(address)) => Some(address.clone()),
        (None, None) => None,
    }
}

/// Remove anything that looks like a tag. Entities are left alone.
fn strip_html(value: &str) -> String {
    HTML_TAG.replace_all(value, "").into_owned()
}

/// Escape a TEXT value. The backslash goes first so later escapes are not escaped again.
pub fn escape_text(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace(',', "\\,")
        .replace(';', "\\;")
}

/// Fold a content line so that no physical line exceeds 75 octets.
///
/// Continuation lines start with a single space, which counts towards their length. Folds
/// never split a multi-byte character.
pub fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_owned();
    }
    let mut folded = String::with_capacity(line.len() + line.len() / (MAX_LINE_OCTETS - 1) * 3);
    let mut rest = line;
    let mut limit = MAX_LINE_OCTETS;
    while !rest.is_empty() {
        if limit < MAX_LINE_OCTETS {
            folded.push_str(CRLF);
            folded.push(' ');
        }
        let split = floor_char_boundary(rest, limit);
        folded.push_str(&rest[..split]);
        rest = &rest[split..];
        limit = MAX_LINE_OCTETS - 1;
    }
    folded
}

fn floor_char_boundary(value: &str, index: usize) -> usize {
    if index >= value.len() {
        return value.len();
    }
    let mut index = index;
    while !value.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Keep only characters that are safe in a UID.
///
/// An id without any such character is replaced by the first 32 hex digits of its SHA-256
/// digest, so the same id always maps to the same UID.
pub fn sanitize_uid(raw: &str) -> String {
    let clean = UID_UNSAFE.replace_all(raw, "");
    if !clean.is_empty() {
        return clean.into_owned();
    }
    let mut digest = hex::encode(Sha256::digest(raw.as_bytes()));
    digest.truncate(UID_DIGEST_LENGTH);
    digest
}

/// Parse an ISO 8601 timestamp.
///
/// A `Z` suffix means UTC, timestamps without an offset are taken as UTC and a bare date is
/// midnight UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.with_timezone(&Utc));
    }
    let normalized = match raw.strip_suffix('Z') {
        Some(local) => format!("{local}+00:00"),
        None => raw.to_owned(),
    };
    for format in OFFSET_FORMATS {
        if let Ok(timestamp) = DateTime::parse_from_str(&normalized, format) {
            return Some(timestamp.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&timestamp));
        }
    }
    let midnight = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight))
}

fn format_timestamp(raw: &str) -> Option<String> {
    let formatted = parse_timestamp(raw).map(|timestamp| format_utc(&timestamp));
    if formatted.is_none() {
        trace!(raw, "ignoring unparseable timestamp");
    }
    formatted
}

fn format_utc(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(FORMAT).to_string()
}
