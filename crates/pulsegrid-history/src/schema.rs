//! Load-boundary normalization of the history file.
//!
//! Older files were written with looser typing: `"online"` instead of
//! `"status"`, `"ports"` instead of `"endpoints"`, scalar values that were
//! not strings, and occasionally `[time, status]` pairs instead of objects.
//! Everything is coerced into [`History`] here so nothing past `load` has
//! to care which shape was on disk.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::types::{History, HistoryEntry, RecordedStatus, ServiceHistory};

const STATUS_KEYS: [&str; 2] = ["status", "online"];
const ENDPOINT_KEYS: [&str; 2] = ["ports", "endpoints"];

/// Counters from one normalization pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeStats {
    pub entries: usize,
    pub dropped: usize,
    pub unknown_status: usize,
    pub skipped_services: usize,
}

/// Coerce a decoded JSON document into a [`History`].
///
/// A non-object top level (including `null`) is rejected; malformed
/// records and entries below it are skipped.
pub fn normalize(value: Value) -> Result<(History, NormalizeStats), String> {
    let root = match value {
        Value::Object(map) => map,
        other => return Err(format!("expected a JSON object at top level, found {}", kind_of(&other))),
    };

    let mut stats = NormalizeStats::default();
    let mut history = History::new();

    for (name, raw) in root {
        let Value::Object(fields) = raw else {
            warn!(service = %name, "skipping history record that is not an object");
            stats.skipped_services += 1;
            continue;
        };

        let record = normalize_record(&name, &fields, &mut stats);
        if !record.is_empty() {
            history.services.insert(name, record);
        }
    }

    if stats.dropped > 0 || stats.unknown_status > 0 {
        warn!(
            dropped = stats.dropped,
            unknown_status = stats.unknown_status,
            "history contained unreadable entries"
        );
    }
    debug!(services = history.len(), entries = stats.entries, "history normalized");

    Ok((history, stats))
}

fn normalize_record(service: &str, fields: &Map<String, Value>, stats: &mut NormalizeStats) -> ServiceHistory {
    let mut record = ServiceHistory::default();

    if let Some(raw) = fields.get("service_history") {
        record.service_history = normalize_entries(service, "service_history", raw, stats);
    }

    for key in ENDPOINT_KEYS {
        let Some(raw) = fields.get(key) else { continue };
        let Value::Object(urls) = raw else {
            if !raw.is_null() {
                warn!(service, key, "ignoring endpoint history that is not an object");
            }
            continue;
        };
        for (url, entries) in urls {
            let mut normalized = normalize_entries(service, url, entries, stats);
            if !normalized.is_empty() {
                record.endpoints.entry(url.clone()).or_default().append(&mut normalized);
            }
        }
    }

    record
}

fn normalize_entries(service: &str, series: &str, raw: &Value, stats: &mut NormalizeStats) -> Vec<HistoryEntry> {
    let Value::Array(items) = raw else {
        if !raw.is_null() {
            warn!(service, series, "ignoring history series that is not an array");
        }
        return Vec::new();
    };

    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        match normalize_entry(item) {
            Some(entry) => {
                if entry.status == RecordedStatus::Unknown {
                    stats.unknown_status += 1;
                }
                stats.entries += 1;
                entries.push(entry);
            }
            None => {
                debug!(service, series, entry = %item, "dropping unreadable history entry");
                stats.dropped += 1;
            }
        }
    }
    entries
}

fn normalize_entry(item: &Value) -> Option<HistoryEntry> {
    let (time, status) = match item {
        Value::Object(map) => {
            let time = map.get("time")?;
            let status = STATUS_KEYS.iter().find_map(|k| map.get(*k));
            (time, status)
        }
        Value::Array(pair) if pair.len() == 2 => (&pair[0], Some(&pair[1])),
        _ => return None,
    };

    let time = parse_time(&scalar_text(time)?)?;
    let status = status
        .and_then(scalar_text)
        .map(|s| RecordedStatus::parse_stored(&s))
        .unwrap_or(RecordedStatus::Unknown);

    Some(HistoryEntry::new(time, status))
}

fn parse_time(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// String form of a scalar, the way the old writer stringified values.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
