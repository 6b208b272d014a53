//! pulsegrid-probe — HTTP availability probing for PulseGrid.
//!
//! Probes each configured endpoint with a bounded retry loop, classifies
//! every attempt, and aggregates endpoint outcomes into service outcomes.
//!
//! # Architecture
//!
//! ```text
//! Runner
//!   ├── Semaphore-bounded job per endpoint (declaration order)
//!   │   └── probe_endpoint() → ProbeOutcome
//!   │       ├── HttpTransport::send() (hard per-attempt timeout)
//!   │       └── classify_response() → Ok | AttemptError
//!   └── ServiceOutcome::from_endpoints() per service
//! ```
//!
//! A failed attempt is recorded and retried; it never aborts the run.
//! Only an external shutdown signal stops a run early.

pub mod checker;
pub mod runner;
pub mod transport;

pub use checker::{AttemptError, MAX_RETAINED_BODY_BYTES, classify_response, probe_endpoint};
pub use runner::{RunError, RunResult, Runner};
pub use transport::{HttpTransport, HyperTransport, ProbeRequest, ProbeResponse, TransportError};
