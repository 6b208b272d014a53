//! Tri-state availability status and the two aggregation rules built on it.
//!
//! The same value type is used at every level: attempts roll up into an
//! endpoint status, endpoints into a service status, and repeated
//! occurrences of one URL within a run into a single history entry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Availability of a set of units (attempts, endpoints, or runs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Every unit succeeded.
    All,
    /// Some units succeeded, some failed.
    Part,
    /// No unit succeeded.
    None,
}

impl Status {
    /// Classify `success` successes out of `total` executed attempts.
    ///
    /// `total` must be the number of attempts actually made, not the
    /// configured retry limit. Zero attempts classify as `None`: nothing
    /// was observed to succeed.
    pub fn classify_by_count(success: u32, total: u32) -> Self {
        if total == 0 || success == 0 {
            Status::None
        } else if success >= total {
            Status::All
        } else {
            Status::Part
        }
    }

    /// Merge a collection of statuses.
    ///
    /// `All` iff every element is `All`, `None` iff every element is `None`
    /// (including the empty collection), otherwise `Part`. The result does
    /// not depend on order or grouping.
    pub fn merge<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = Status>,
    {
        let mut has_all = false;
        let mut has_none = false;
        for status in statuses {
            match status {
                Status::All => has_all = true,
                Status::None => has_none = true,
                Status::Part => return Status::Part,
            }
        }
        match (has_all, has_none) {
            (true, false) => Status::All,
            (false, _) => Status::None,
            (true, true) => Status::Part,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::All => "all",
            Status::Part => "part",
            Status::None => "none",
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Status::All)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not one of `all`, `part`, `none`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Status::All),
            "part" => Ok(Status::Part),
            "none" => Ok(Status::None),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}
