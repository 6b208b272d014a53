//! Endpoint probe logic.
//!
//! Runs one endpoint's retry loop: attempts are made sequentially until
//! one is classified successful or the retry budget is spent. Transport
//! failures and classification mismatches only fail the attempt, never
//! the run.

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use pulse_core::{EndpointSpec, ProbeOutcome, ProbeSettings, Status};

use crate::transport::{HttpTransport, ProbeRequest, TransportError};

/// Upper bound on the response body kept for a fully failed endpoint.
pub const MAX_RETAINED_BODY_BYTES: usize = 4096;

/// Why a single attempt did not count as a success.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    #[error("status N/A: {0}")]
    Transport(TransportError),

    #[error("status {status}: failed to read response body: {message}")]
    BodyRead { status: u16, message: String },

    #[error("status {status}: response body did not match pattern (match=false)")]
    PatternMismatch { status: u16 },

    #[error("status {status}: expected status {expected}")]
    StatusMismatch { status: u16, expected: u16 },
}

impl From<TransportError> for AttemptError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Body { status, message } => AttemptError::BodyRead { status, message },
            other => AttemptError::Transport(other),
        }
    }
}

/// Decide whether a received response satisfies the endpoint's expectations.
///
/// Precedence:
/// 1. a configured body pattern that does not match fails the attempt;
/// 2. with no expected status and no pattern, only 200 succeeds;
/// 3. with only a pattern (already matched), any status succeeds;
/// 4. with an expected status, the status must equal it.
pub fn classify_response(spec: &EndpointSpec, status: u16, body: &[u8]) -> Result<(), AttemptError> {
    if let Some(pattern) = &spec.response_pattern {
        if !pattern.is_match(body) {
            return Err(AttemptError::PatternMismatch { status });
        }
    }

    let expected = match (spec.expected_status, &spec.response_pattern) {
        (Some(expected), _) => expected,
        (None, Some(_)) => return Ok(()),
        (None, None) => 200,
    };

    if status == expected {
        Ok(())
    } else {
        Err(AttemptError::StatusMismatch { status, expected })
    }
}

/// Probe one endpoint with up to `settings.retry` attempts.
pub async fn probe_endpoint(
    transport: &dyn HttpTransport,
    service: &str,
    spec: &EndpointSpec,
    settings: ProbeSettings,
) -> ProbeOutcome {
    let request = ProbeRequest::from(spec);
    let retry = settings.retry.get();

    let mut failures = Vec::new();
    let mut success_count = 0u32;
    let mut attempts = 0u32;
    let mut status_code = None;
    let mut last_body = bytes::Bytes::new();

    let start_time = Utc::now();

    for attempt in 1..=retry {
        attempts = attempt;
        info!(
            %service,
            method = %spec.method,
            url = %spec.url,
            kind = %spec.kind,
            attempt,
            retry,
            "probing endpoint"
        );

        let result = match transport.send(&request, settings.timeout).await {
            Ok(resp) => {
                status_code = Some(resp.status);
                let verdict = classify_response(spec, resp.status, &resp.body);
                last_body = resp.body;
                verdict
            }
            Err(e) => {
                let err = AttemptError::from(e);
                if let AttemptError::BodyRead { status, .. } = &err {
                    status_code = Some(*status);
                }
                Err(err)
            }
        };

        match result {
            Ok(()) => {
                success_count += 1;
                debug!(%service, url = %spec.url, attempt, "attempt succeeded");
                break;
            }
            Err(err) => {
                warn!(%service, url = %spec.url, attempt, error = %err, "attempt failed");
                failures.push(err.to_string());
            }
        }
    }

    let end_time = Utc::now();
    let status = Status::classify_by_count(success_count, attempts);

    // Payloads are only worth keeping when nothing succeeded.
    let response_body = if status == Status::None {
        retain_body(&last_body)
    } else {
        String::new()
    };

    ProbeOutcome {
        url: spec.url.clone(),
        kind: spec.kind,
        method: spec.method,
        body: spec.body.clone(),
        status,
        status_code,
        start_time,
        end_time,
        total_attempts: attempts,
        success_count,
        failures,
        response_body,
    }
}

/// Lossy-decode at most [`MAX_RETAINED_BODY_BYTES`] of `body`, cut on a
/// character boundary.
fn retain_body(body: &[u8]) -> String {
    // A few spare bytes so a multi-byte char straddling the limit decodes.
    let window = &body[..body.len().min(MAX_RETAINED_BODY_BYTES + 3)];
    let mut text = String::from_utf8_lossy(window).into_owned();
    if text.len() > MAX_RETAINED_BODY_BYTES {
        let mut cut = MAX_RETAINED_BODY_BYTES;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
    }
    text
}
