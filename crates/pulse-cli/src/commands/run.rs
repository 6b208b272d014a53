use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{error, info, warn};

use pulse_core::{Defaults, PulseConfig, ServiceOutcome, Status};
use pulsegrid_history::{History, HistoryStore, write_outputs};
use pulsegrid_probe::{HyperTransport, Runner};

use super::DataPaths;

pub async fn run(config: &Path, data_dir: &Path, concurrency: Option<usize>) -> anyhow::Result<()> {
    let cfg = PulseConfig::from_file(config)
        .and_then(|raw| raw.resolve(&Defaults::default()))
        .with_context(|| format!("invalid configuration in {}", config.display()))?;

    let runner = Runner::new(Arc::new(HyperTransport::new()))
        .with_concurrency(concurrency.unwrap_or(cfg.concurrency));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    let results = runner.run_all(&cfg, shutdown_rx).await;
    signal.abort();
    // Nothing is written for an interrupted run.
    let results = results.context("probe run did not complete")?;

    for svc in &results {
        print_outcome(svc);
    }

    let failures = record(&DataPaths::new(data_dir), &results, cfg.max_log_days, Utc::now());
    if failures > 0 {
        anyhow::bail!("{failures} output file(s) could not be written");
    }
    Ok(())
}

/// Write snapshot, history and report. Returns the number of failed writes.
pub fn record(paths: &DataPaths, results: &[ServiceOutcome], retention_days: u32, now: DateTime<Utc>) -> usize {
    let store = HistoryStore::new(&paths.log);
    let (history, mut failures): (Option<History>, usize) =
        match write_outputs(&paths.result, &store, results, retention_days, now) {
            Ok(history) => (Some(history), 0),
            Err(e) => {
                for err in &e.errors {
                    error!(error = %err, "output write failed");
                }
                (e.history.map(|h| *h), e.errors.len())
            }
        };

    match history {
        Some(history) => {
            if let Err(e) = pulsegrid_report::write_report(&history, &paths.report) {
                error!(error = %e, "report write failed");
                failures += 1;
            } else {
                println!("Report generated: {}", paths.report.display());
            }
        }
        None => warn!("history was not updated, skipping report"),
    }

    failures
}

fn print_outcome(svc: &ServiceOutcome) {
    let mark = match svc.status {
        Status::All => "✓",
        Status::Part => "~",
        Status::None => "✗",
    };
    println!(
        "{mark} {} [{}] {}/{} attempts succeeded",
        svc.name, svc.status, svc.success_count, svc.total_attempts
    );
    for ep in svc.endpoints().filter(|ep| ep.status != Status::All) {
        let reason = ep.failures.last().map(String::as_str).unwrap_or("");
        println!("    {} {} [{}] {reason}", ep.method, ep.url, ep.status);
    }
}
