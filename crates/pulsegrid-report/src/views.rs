//! View types for the report template.
//!
//! Everything the template prints is pre-formatted here so the template
//! itself stays free of logic.

use chrono::{DateTime, Utc};

use pulsegrid_history::{History, HistoryEntry, RecordedStatus, ServiceHistory, format_time};

pub struct ReportView {
    pub services: Vec<ServiceView>,
    pub updated_at: String,
    pub service_count: usize,
    pub healthy_count: usize,
}

pub struct ServiceView {
    pub name: String,
    /// Fraction of service-level entries that were `all`, in `0.0..=1.0`.
    pub availability: f64,
    pub availability_display: String,
    pub availability_color: &'static str,
    pub current_status: &'static str,
    pub current_color: &'static str,
    pub bars: Vec<StatusCell>,
    pub endpoints: Vec<EndpointView>,
}

pub struct EndpointView {
    pub url: String,
    pub current_status: &'static str,
    pub bars: Vec<StatusCell>,
}

pub struct StatusCell {
    pub color: &'static str,
    pub title: String,
}

impl ReportView {
    /// Services come out sorted by name.
    pub fn from_history(history: &History) -> Self {
        let services: Vec<ServiceView> = history
            .services
            .iter()
            .map(|(name, record)| ServiceView::from_record(name, record))
            .collect();
        let healthy_count = services.iter().filter(|s| s.current_status == "all").count();

        Self {
            service_count: services.len(),
            healthy_count,
            updated_at: format_updated(history.latest_time()),
            services,
        }
    }
}

impl ServiceView {
    pub fn from_record(name: &str, record: &ServiceHistory) -> Self {
        let availability = availability(&record.service_history);
        let current = latest_status(&record.service_history);

        let endpoints = record
            .endpoints
            .iter()
            .map(|(url, entries)| EndpointView {
                url: url.clone(),
                current_status: status_label(latest_status(entries)),
                bars: status_cells(entries),
            })
            .collect();

        Self {
            name: name.to_string(),
            availability,
            availability_display: format!("{:.1}%", availability * 100.0),
            availability_color: availability_color(availability),
            current_status: status_label(current),
            current_color: status_color(current),
            bars: status_cells(&record.service_history),
            endpoints,
        }
    }
}

/// Build the view for a whole history.
pub fn build_report(history: &History) -> ReportView {
    ReportView::from_history(history)
}

/// `all` entries over all entries; zero for an empty history.
pub fn availability(entries: &[HistoryEntry]) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    let all = entries.iter().filter(|e| e.status.is_all()).count();
    all as f64 / entries.len() as f64
}

/// One cell per entry in chronological order.
pub fn status_cells(entries: &[HistoryEntry]) -> Vec<StatusCell> {
    let mut sorted: Vec<&HistoryEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.time);
    sorted
        .into_iter()
        .map(|e| StatusCell {
            color: status_color(Some(e.status)),
            title: format!("{} {}", format_time(&e.time), e.status),
        })
        .collect()
}

fn latest_status(entries: &[HistoryEntry]) -> Option<RecordedStatus> {
    entries.iter().max_by_key(|e| e.time).map(|e| e.status)
}

fn status_label(status: Option<RecordedStatus>) -> &'static str {
    status.map(|s| s.as_str()).unwrap_or("unknown")
}

pub fn status_color(status: Option<RecordedStatus>) -> &'static str {
    match status {
        Some(RecordedStatus::All) => "cell-all",
        Some(RecordedStatus::Part) => "cell-part",
        Some(RecordedStatus::None) => "cell-none",
        Some(RecordedStatus::Unknown) | None => "cell-unknown",
    }
}

pub fn availability_color(availability: f64) -> &'static str {
    if availability >= 0.99 {
        "text-good"
    } else if availability >= 0.9 {
        "text-warn"
    } else {
        "text-bad"
    }
}

pub fn format_updated(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string())
}
