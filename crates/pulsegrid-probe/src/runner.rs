//! Runner — probes every configured service and aggregates the results.
//!
//! Each endpoint probe is an independent job. A semaphore bounds how many
//! run at once; permits are taken in declaration order, so a concurrency
//! of 1 probes strictly sequentially. Results are slotted back by index,
//! which makes the output independent of completion order.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use pulse_core::{ProbeOutcome, ResolvedConfig, ServiceOutcome};

use crate::checker::probe_endpoint;
use crate::transport::HttpTransport;

pub type RunResult<T> = Result<T, RunError>;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("run cancelled before all probes completed")]
    Cancelled,

    #[error("probe task failed: {0}")]
    Task(String),

    #[error("missing probe outcome for service {0:?}")]
    Incomplete(String),
}

/// Probes all services of a resolved configuration.
#[derive(Clone)]
pub struct Runner {
    transport: Arc<dyn HttpTransport>,
    concurrency: usize,
}

impl Runner {
    /// Create a sequential runner.
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            concurrency: 1,
        }
    }

    /// Allow up to `concurrency` probes in flight (minimum 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Probe every endpoint of every service and return one outcome per
    /// service, in declaration order.
    ///
    /// When `shutdown` flips to `true`, in-flight probes are aborted and
    /// [`RunError::Cancelled`] is returned.
    pub async fn run_all(
        &self,
        config: &ResolvedConfig,
        mut shutdown: watch::Receiver<bool>,
    ) -> RunResult<Vec<ServiceOutcome>> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut jobs = JoinSet::new();
        let mut slots: Vec<Vec<Option<ProbeOutcome>>> = config
            .services
            .iter()
            .map(|svc| vec![None; svc.endpoint_count()])
            .collect();

        info!(
            services = config.services.len(),
            endpoints = config.endpoint_count(),
            concurrency = self.concurrency,
            "probe run starting"
        );

        for (svc_idx, svc) in config.services.iter().enumerate() {
            for (ep_idx, endpoint) in svc.endpoints().enumerate() {
                let permit = tokio::select! {
                    biased;
                    _ = cancelled(&mut shutdown) => {
                        jobs.abort_all();
                        warn!("probe run cancelled");
                        return Err(RunError::Cancelled);
                    }
                    permit = semaphore.clone().acquire_owned() => {
                        permit.map_err(|e| RunError::Task(e.to_string()))?
                    }
                };

                let transport = self.transport.clone();
                let service = svc.name.clone();
                let endpoint = endpoint.clone();
                let settings = svc.settings;
                jobs.spawn(async move {
                    let outcome =
                        probe_endpoint(transport.as_ref(), &service, &endpoint, settings).await;
                    drop(permit);
                    (svc_idx, ep_idx, outcome)
                });
            }
        }

        loop {
            tokio::select! {
                biased;
                _ = cancelled(&mut shutdown) => {
                    jobs.abort_all();
                    warn!("probe run cancelled");
                    return Err(RunError::Cancelled);
                }
                joined = jobs.join_next() => match joined {
                    None => break,
                    Some(Ok((svc_idx, ep_idx, outcome))) => {
                        debug!(url = %outcome.url, status = %outcome.status, "endpoint probed");
                        slots[svc_idx][ep_idx] = Some(outcome);
                    }
                    Some(Err(e)) => {
                        jobs.abort_all();
                        return Err(RunError::Task(e.to_string()));
                    }
                },
            }
        }

        let mut results = Vec::with_capacity(config.services.len());
        for (svc, slots) in config.services.iter().zip(slots) {
            let mut outcomes = slots
                .into_iter()
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| RunError::Incomplete(svc.name.clone()))?;
            let api = outcomes.split_off(svc.health.len());
            let outcome = ServiceOutcome::from_endpoints(svc.name.clone(), outcomes, api, Utc::now());
            info!(
                service = %outcome.name,
                status = %outcome.status,
                attempts = outcome.total_attempts,
                successes = outcome.success_count,
                "service checked"
            );
            results.push(outcome);
        }

        Ok(results)
    }
}

/// Resolves once shutdown is requested; never resolves if the sender is gone.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    let sender_dropped = shutdown.wait_for(|stop| *stop).await.is_err();
    if sender_dropped {
        std::future::pending::<()>().await;
    }
}
