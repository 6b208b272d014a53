//! pulsegrid-report — static HTML status page for PulseGrid.
//!
//! Builds view types from the history file and renders them through an
//! Askama template into a single self-contained page.

pub mod views;

use std::path::Path;

use askama::Template;
use thiserror::Error;
use tracing::info;

use pulsegrid_history::{History, HistoryError, write_atomic};

pub use views::{ReportView, build_report};

pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to render report: {0}")]
    Render(#[from] askama::Error),

    #[error(transparent)]
    Write(#[from] HistoryError),
}

#[derive(Template)]
#[template(path = "report.html")]
struct ReportTemplate {
    report: ReportView,
}

/// Render the status page for `history`.
pub fn render_report(history: &History) -> ReportResult<String> {
    let report = build_report(history);
    Ok(ReportTemplate { report }.render()?)
}

/// Render and atomically write the status page.
pub fn write_report(history: &History, path: &Path) -> ReportResult<()> {
    let html = render_report(history)?;
    write_atomic(path, html.as_bytes())?;
    info!(path = %path.display(), services = history.len(), "report written");
    Ok(())
}
