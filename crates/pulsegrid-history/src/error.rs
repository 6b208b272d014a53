//! Error types for the PulseGrid history store.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::History;

/// Result type alias for history store operations.
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Errors that can occur while loading or writing history and snapshots.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Every failure from recording a run.
///
/// The snapshot and the history file are written independently, so one
/// failing does not stop the other. `history` holds the updated history
/// when it was persisted even though something else failed.
#[derive(Debug)]
pub struct OutputErrors {
    pub errors: Vec<HistoryError>,
    pub history: Option<Box<History>>,
}

impl fmt::Display for OutputErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} output error(s)", self.errors.len())?;
        for (i, err) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for OutputErrors {}
