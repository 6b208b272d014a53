//! pulsegrid-history — retention-pruned status history for PulseGrid.
//!
//! Keeps one JSON file mapping each service name to its service-level
//! status sequence and a per-endpoint-URL sequence, plus a snapshot of the
//! latest run.
//!
//! # Architecture
//!
//! ```text
//! write_outputs()
//!   ├── write_snapshot()        → pulse_result.json
//!   └── HistoryStore
//!       ├── load()    → schema::normalize() → History
//!       ├── History::append()   (merge per URL, prune by age)
//!       └── persist() → write_atomic()      → pulse_log.json
//! ```
//!
//! Old on-disk layouts are upgraded in `schema`; nothing after `load`
//! sees them.

pub mod error;
pub mod retention;
pub mod schema;
pub mod snapshot;
pub mod store;
pub mod types;

pub use error::{HistoryError, HistoryResult, OutputErrors};
pub use snapshot::{write_outputs, write_snapshot};
pub use store::{HistoryStore, write_atomic};
pub use types::*;
