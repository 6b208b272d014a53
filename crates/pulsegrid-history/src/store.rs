//! HistoryStore — JSON-file persistence for the status history.
//!
//! The whole history lives in one JSON document. Reads go through
//! [`schema::normalize`](crate::schema::normalize) so older layouts are
//! upgraded on load. Writes serialize in memory first and then replace the
//! file atomically, so a crash mid-write leaves the previous file intact.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{HistoryError, HistoryResult};
use crate::schema;
use crate::types::History;

/// Handle to the history file on disk.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and normalize the history file.
    ///
    /// A missing file is an empty history. Any other I/O failure, invalid
    /// JSON (an empty file included), or a document that is not an object
    /// is an error; a corrupt file is never silently replaced.
    pub fn load(&self) -> HistoryResult<History> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no history file yet");
                return Ok(History::new());
            }
            Err(source) => {
                return Err(HistoryError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let value: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|e| self.corrupt(e.to_string()))?;
        let (history, stats) = schema::normalize(value).map_err(|reason| self.corrupt(reason))?;

        info!(
            path = %self.path.display(),
            services = history.len(),
            entries = stats.entries,
            "history loaded"
        );
        Ok(history)
    }

    /// Write the history, replacing the previous file atomically.
    pub fn persist(&self, history: &History) -> HistoryResult<()> {
        let json = serde_json::to_vec_pretty(history).map_err(|source| HistoryError::Serialize {
            what: "history",
            source,
        })?;
        write_atomic(&self.path, &json)?;
        info!(path = %self.path.display(), services = history.len(), "history persisted");
        Ok(())
    }

    fn corrupt(&self, reason: String) -> HistoryError {
        HistoryError::Corrupt {
            path: self.path.clone(),
            reason,
        }
    }
}

/// Replace `path` with `contents` via a temp file in the same directory.
///
/// The parent directory is created if needed. Readers observe either the
/// old file or the complete new one. An existing file keeps its mode; a
/// new one is created world-readable (0644 on unix).
pub fn write_atomic(path: &Path, contents: &[u8]) -> HistoryResult<()> {
    let write_err = |source: std::io::Error| HistoryError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(write_err)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(contents).map_err(write_err)?;
    if let Some(perms) = target_permissions(path) {
        tmp.as_file().set_permissions(perms).map_err(write_err)?;
    }
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    // Best-effort: make the rename itself durable.
    if let Ok(d) = File::open(dir) {
        let _ = d.sync_all();
    }

    debug!(path = %path.display(), bytes = contents.len(), "file replaced");
    Ok(())
}

/// Temp files are created owner-only; the replacement should not be.
fn target_permissions(path: &Path) -> Option<fs::Permissions> {
    match fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(_) => default_permissions(),
    }
}

#[cfg(unix)]
fn default_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<fs::Permissions> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pulse_core::Status;

    use crate::types::{HistoryEntry, RecordedStatus};

    fn sample() -> History {
        let t = Utc.with_ymd_and_hms(2026, 10, 16, 8, 30, 0).unwrap();
        let mut history = History::new();
        let record = history.services.entry("web".to_string()).or_default();
        record.service_history.push(HistoryEntry::new(t, Status::Part));
        record
            .endpoints
            .insert("http://web/healthz".to_string(), vec![HistoryEntry::new(t, Status::None)]);
        history
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("pulse_log.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn empty_or_null_file_is_corrupt_and_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pulse_log.json");

        for content in ["", "  \n", "null"] {
            fs::write(&path, content).unwrap();
            let err = HistoryStore::new(&path).load().unwrap_err();
            assert!(matches!(err, HistoryError::Corrupt { .. }), "{content:?}: {err}");
            assert_eq!(fs::read_to_string(&path).unwrap(), content);
        }
    }

    #[cfg(unix)]
    #[test]
    fn replaced_file_keeps_its_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.html");
        fs::write(&path, "old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        write_atomic(&path, b"new").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[cfg(unix)]
    #[test]
    fn new_file_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pulse_result.json");

        write_atomic(&path, b"[]").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[test]
    fn persist_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("pulse_log.json"));
        let history = sample();

        store.persist(&history).unwrap();
        assert_eq!(store.load().unwrap(), history);

        let text = fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("\"2026-10-16T08:30:00Z\""));
    }

    #[test]
    fn persist_creates_parent_dir_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("data").join("pulse_log.json"));

        store.persist(&sample()).unwrap();
        store.persist(&History::new()).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path().join("data"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("pulse_log.json")]);
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn invalid_json_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pulse_log.json");
        fs::write(&path, "{\"web\": [").unwrap();

        let err = HistoryStore::new(&path).load().unwrap_err();
        assert!(matches!(err, HistoryError::Corrupt { .. }), "{err}");
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"web\": [");
    }

    #[test]
    fn non_object_document_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pulse_log.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let err = HistoryStore::new(&path).load().unwrap_err();
        assert!(err.to_string().contains("top level"));
    }

    #[test]
    fn legacy_file_is_upgraded_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pulse_log.json");
        fs::write(
            &path,
            r#"{"web": {"service_history": [{"time": "2026-10-16T08:30:00Z", "online": "ALL"}], "ports": {}}}"#,
        )
        .unwrap();

        let history = HistoryStore::new(&path).load().unwrap();
        assert_eq!(
            history.get("web").unwrap().service_history[0].status,
            RecordedStatus::All
        );
    }

    #[test]
    fn unreadable_path_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = HistoryStore::new(dir.path()).load().unwrap_err();
        assert!(matches!(err, HistoryError::Read { .. }), "{err}");
    }
}
