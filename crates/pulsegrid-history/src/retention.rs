//! Appending a run to the history and age-based pruning.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use pulse_core::{ServiceOutcome, Status};

use crate::types::{History, HistoryEntry};

/// Maximum entry age for a retention of `days` days.
pub fn retention_window(days: u32) -> Duration {
    Duration::hours(i64::from(days) * 24)
}

/// Keep entries no older than `window` relative to `now`. Future-dated
/// entries are kept.
pub fn prune_entries(entries: &mut Vec<HistoryEntry>, now: DateTime<Utc>, window: Duration) -> usize {
    let before = entries.len();
    entries.retain(|e| now.signed_duration_since(e.time) <= window);
    before - entries.len()
}

/// One merged entry per distinct URL of a service run, in first-seen order.
///
/// A URL may be declared more than once (e.g. as both a health and an api
/// endpoint); its statuses are merged and the earliest start time wins.
pub fn merge_by_url(outcome: &ServiceOutcome) -> Vec<(String, HistoryEntry)> {
    let mut order: Vec<(&str, Vec<Status>, DateTime<Utc>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for probe in outcome.endpoints() {
        match index.get(probe.url.as_str()) {
            Some(&i) => {
                let slot = &mut order[i];
                slot.1.push(probe.status);
                slot.2 = slot.2.min(probe.start_time);
            }
            None => {
                index.insert(probe.url.as_str(), order.len());
                order.push((probe.url.as_str(), vec![probe.status], probe.start_time));
            }
        }
    }

    order
        .into_iter()
        .map(|(url, statuses, time)| (url.to_string(), HistoryEntry::new(time, Status::merge(statuses))))
        .collect()
}

impl History {
    /// Record one run and drop everything older than the retention window.
    ///
    /// Each service gets one service-level entry and one merged entry per
    /// distinct endpoint URL. Records of services that were not part of
    /// this run are pruned too; records left with no entries are removed.
    pub fn append(&mut self, results: &[ServiceOutcome], retention_days: u32, now: DateTime<Utc>) {
        for outcome in results {
            let record = self.services.entry(outcome.name.clone()).or_default();
            record
                .service_history
                .push(HistoryEntry::new(outcome.start_time, outcome.status));

            for (url, entry) in merge_by_url(outcome) {
                record.endpoints.entry(url).or_default().push(entry);
            }
        }

        self.prune(retention_days, now);
    }

    /// Drop expired entries everywhere. Returns the number removed.
    pub fn prune(&mut self, retention_days: u32, now: DateTime<Utc>) -> usize {
        let window = retention_window(retention_days);
        let mut removed = 0;

        for (name, record) in self.services.iter_mut() {
            let mut dropped = prune_entries(&mut record.service_history, now, window);
            for history in record.endpoints.values_mut() {
                dropped += prune_entries(history, now, window);
            }
            record.endpoints.retain(|_, history| !history.is_empty());
            if dropped > 0 {
                debug!(service = %name, dropped, "pruned expired history entries");
            }
            removed += dropped;
        }
        self.services.retain(|_, record| !record.is_empty());

        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pulse_core::{EndpointKind, Method, ProbeOutcome};

    use crate::types::RecordedStatus;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
    }

    fn probe(url: &str, kind: EndpointKind, status: Status, start: DateTime<Utc>) -> ProbeOutcome {
        ProbeOutcome {
            url: url.to_string(),
            kind,
            method: Method::Get,
            body: None,
            status,
            status_code: None,
            start_time: start,
            end_time: start + Duration::seconds(1),
            total_attempts: 1,
            success_count: u32::from(status == Status::All),
            failures: Vec::new(),
            response_body: String::new(),
        }
    }

    fn service(name: &str, health: Vec<ProbeOutcome>, api: Vec<ProbeOutcome>) -> ServiceOutcome {
        ServiceOutcome::from_endpoints(name, health, api, now())
    }

    fn seed(history: &mut History, name: &str, age: Duration) {
        history
            .services
            .entry(name.to_string())
            .or_default()
            .service_history
            .push(HistoryEntry::new(now() - age, Status::All));
    }

    #[test]
    fn append_creates_record_on_first_sight() {
        let mut history = History::new();
        let run = service(
            "web",
            vec![probe("http://web/healthz", EndpointKind::Health, Status::All, now())],
            vec![],
        );
        history.append(&[run], 30, now());

        let record = history.get("web").unwrap();
        assert_eq!(record.service_history, vec![HistoryEntry::new(now(), Status::All)]);
        assert_eq!(record.endpoints["http://web/healthz"].len(), 1);
    }

    #[test]
    fn expired_entry_is_dropped() {
        let mut history = History::new();
        seed(&mut history, "web", Duration::days(31));
        let run = service("web", vec![probe("http://web/", EndpointKind::Health, Status::All, now())], vec![]);

        history.append(&[run], 30, now());

        let entries = &history.get("web").unwrap().service_history;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].time, now());
    }

    #[test]
    fn entry_just_inside_window_is_kept() {
        let mut history = History::new();
        seed(&mut history, "web", Duration::days(30) - Duration::seconds(1));
        seed(&mut history, "web", Duration::days(30));
        let run = service("web", vec![probe("http://web/", EndpointKind::Health, Status::All, now())], vec![]);

        history.append(&[run], 30, now());

        assert_eq!(history.get("web").unwrap().service_history.len(), 3);
    }

    #[test]
    fn future_entries_are_kept() {
        let mut history = History::new();
        seed(&mut history, "web", Duration::hours(-2));
        assert_eq!(history.prune(1, now()), 0);
        assert_eq!(history.get("web").unwrap().service_history.len(), 1);
    }

    #[test]
    fn same_url_in_health_and_api_merges_to_one_entry() {
        let mut history = History::new();
        let url = "http://shop/status";
        let early = now() - Duration::seconds(10);
        let run = service(
            "shop",
            vec![probe(url, EndpointKind::Health, Status::All, now())],
            vec![probe(url, EndpointKind::Api, Status::None, early)],
        );

        history.append(&[run], 30, now());

        let entries = &history.get("shop").unwrap().endpoints[url];
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, RecordedStatus::Part);
        assert_eq!(entries[0].time, early);
    }

    #[test]
    fn repeated_url_with_same_status_keeps_status() {
        let url = "http://a/";
        let run = service(
            "a",
            vec![
                probe(url, EndpointKind::Health, Status::None, now()),
                probe(url, EndpointKind::Health, Status::None, now()),
            ],
            vec![],
        );
        let merged = merge_by_url(&run);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].1.status, RecordedStatus::None);
    }

    #[test]
    fn merge_by_url_keeps_first_seen_order() {
        let run = service(
            "a",
            vec![
                probe("http://a/z", EndpointKind::Health, Status::All, now()),
                probe("http://a/b", EndpointKind::Health, Status::All, now()),
            ],
            vec![probe("http://a/z", EndpointKind::Api, Status::All, now())],
        );
        let urls: Vec<_> = merge_by_url(&run).into_iter().map(|(u, _)| u).collect();
        assert_eq!(urls, vec!["http://a/z", "http://a/b"]);
    }

    #[test]
    fn repeated_append_adds_exactly_one_entry_each_time() {
        let mut history = History::new();
        seed(&mut history, "web", Duration::days(3));
        let run = service("web", vec![probe("http://web/", EndpointKind::Health, Status::Part, now())], vec![]);

        history.append(std::slice::from_ref(&run), 30, now());
        let after_first = history.clone();
        history.append(std::slice::from_ref(&run), 30, now());

        let first = &after_first.get("web").unwrap().service_history;
        let second = &history.get("web").unwrap().service_history;
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 3);
        assert_eq!(&second[..2], &first[..]);
        assert_eq!(history.get("web").unwrap().endpoints["http://web/"].len(), 2);
    }

    #[test]
    fn services_outside_the_run_are_pruned_and_removed() {
        let mut history = History::new();
        seed(&mut history, "retired", Duration::days(40));
        seed(&mut history, "quiet", Duration::days(1));
        let run = service("web", vec![probe("http://web/", EndpointKind::Health, Status::All, now())], vec![]);

        history.append(&[run], 30, now());

        assert!(history.get("retired").is_none());
        assert_eq!(history.get("quiet").unwrap().service_history.len(), 1);
        assert!(history.get("web").is_some());
    }

    #[test]
    fn expired_endpoint_histories_are_removed() {
        let mut history = History::new();
        let record = history.services.entry("web".to_string()).or_default();
        record.endpoints.insert(
            "http://web/old".to_string(),
            vec![HistoryEntry::new(now() - Duration::days(90), Status::All)],
        );
        let run = service("web", vec![probe("http://web/new", EndpointKind::Health, Status::All, now())], vec![]);

        history.append(&[run], 30, now());

        let endpoints = &history.get("web").unwrap().endpoints;
        assert!(!endpoints.contains_key("http://web/old"));
        assert!(endpoints.contains_key("http://web/new"));
    }
}
