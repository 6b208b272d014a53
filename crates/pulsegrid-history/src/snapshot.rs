//! Latest-run snapshot and the combined end-of-run write.

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use pulse_core::ServiceOutcome;

use crate::error::{HistoryError, HistoryResult, OutputErrors};
use crate::store::{HistoryStore, write_atomic};
use crate::types::History;

/// Write the full results of one run as a pretty-printed JSON array,
/// replacing any previous snapshot.
pub fn write_snapshot(path: &Path, results: &[ServiceOutcome]) -> HistoryResult<()> {
    let json = serde_json::to_vec_pretty(results).map_err(|source| HistoryError::Serialize {
        what: "run snapshot",
        source,
    })?;
    write_atomic(path, &json)?;
    info!(path = %path.display(), services = results.len(), "snapshot written");
    Ok(())
}

/// Write the snapshot and fold the run into the history file.
///
/// Both writes are attempted regardless of each other. On success the
/// updated history is returned; otherwise every failure is reported.
pub fn write_outputs(
    snapshot_path: &Path,
    store: &HistoryStore,
    results: &[ServiceOutcome],
    retention_days: u32,
    now: DateTime<Utc>,
) -> Result<History, OutputErrors> {
    let mut errors = Vec::new();

    if let Err(e) = write_snapshot(snapshot_path, results) {
        error!(error = %e, "snapshot write failed");
        errors.push(e);
    }

    let history = match store.load() {
        Ok(mut history) => {
            history.append(results, retention_days, now);
            match store.persist(&history) {
                Ok(()) => Some(history),
                Err(e) => {
                    error!(error = %e, "history write failed");
                    errors.push(e);
                    None
                }
            }
        }
        Err(e) => {
            error!(error = %e, "history load failed, leaving the file untouched");
            errors.push(e);
            None
        }
    };

    match (history, errors.is_empty()) {
        (Some(history), true) => Ok(history),
        (history, _) => Err(OutputErrors {
            errors,
            history: history.map(Box::new),
        }),
    }
}
