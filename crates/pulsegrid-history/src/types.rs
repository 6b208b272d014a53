//! Domain types for the PulseGrid history file.
//!
//! The file is a JSON object keyed by service name. Each record holds the
//! service-level status sequence and one sequence per endpoint URL. Every
//! entry carries an RFC 3339 timestamp (second precision) and a status.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize, Serializer};

use pulse_core::Status;

/// A status as read back from storage.
///
/// `Unknown` only exists for stored strings that are not a valid status;
/// classification never produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordedStatus {
    All,
    Part,
    None,
    Unknown,
}

impl RecordedStatus {
    /// Lenient parse for stored strings (case and surrounding whitespace
    /// are ignored).
    pub fn parse_stored(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => RecordedStatus::All,
            "part" => RecordedStatus::Part,
            "none" => RecordedStatus::None,
            _ => RecordedStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordedStatus::All => "all",
            RecordedStatus::Part => "part",
            RecordedStatus::None => "none",
            RecordedStatus::Unknown => "unknown",
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, RecordedStatus::All)
    }
}

impl From<Status> for RecordedStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::All => RecordedStatus::All,
            Status::Part => RecordedStatus::Part,
            Status::None => RecordedStatus::None,
        }
    }
}

impl fmt::Display for RecordedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `(time, status)` point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(serialize_with = "serialize_time")]
    pub time: DateTime<Utc>,
    pub status: RecordedStatus,
}

impl HistoryEntry {
    /// Timestamps are truncated to whole seconds so an entry survives a
    /// write/read cycle unchanged.
    pub fn new(time: DateTime<Utc>, status: impl Into<RecordedStatus>) -> Self {
        Self {
            time: time.trunc_subsecs(0),
            status: status.into(),
        }
    }
}

fn serialize_time<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_time(time))
}

/// RFC 3339 with second precision and a `Z` suffix.
pub fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// History of one service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHistory {
    #[serde(default)]
    pub service_history: Vec<HistoryEntry>,
    /// Endpoint URL → its own status sequence.
    #[serde(default)]
    pub endpoints: BTreeMap<String, Vec<HistoryEntry>>,
}

impl ServiceHistory {
    pub fn is_empty(&self) -> bool {
        self.service_history.is_empty() && self.endpoints.values().all(Vec::is_empty)
    }

    /// Latest timestamp across service and endpoint entries.
    pub fn latest_time(&self) -> Option<DateTime<Utc>> {
        self.service_history
            .iter()
            .chain(self.endpoints.values().flatten())
            .map(|e| e.time)
            .max()
    }
}

/// The whole history file: service name → record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    pub services: BTreeMap<String, ServiceHistory>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, service: &str) -> Option<&ServiceHistory> {
        self.services.get(service)
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Latest timestamp in the whole history.
    pub fn latest_time(&self) -> Option<DateTime<Utc>> {
        self.services.values().filter_map(ServiceHistory::latest_time).max()
    }
}
