//! Shared types used across PulseGrid crates.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::bytes::Regex;
use serde::{Deserialize, Serialize};

use crate::status::Status;

/// HTTP methods a probe may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    /// Case-insensitive; the empty string means `GET`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            _ => Err(s.to_string()),
        }
    }
}

impl From<Method> for http::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Get => http::Method::GET,
            Method::Post => http::Method::POST,
            Method::Put => http::Method::PUT,
        }
    }
}

/// Which list of a service an endpoint was declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    Health,
    Api,
}

impl EndpointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointKind::Health => "health",
            EndpointKind::Api => "api",
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Resolved configuration ────────────────────────────────────────

/// One validated probe target.
#[derive(Debug, Clone)]
pub struct EndpointSpec {
    pub kind: EndpointKind,
    pub url: String,
    pub method: Method,
    pub body: Option<String>,
    /// Expected HTTP status. `None` means "200, unless a pattern is set".
    pub expected_status: Option<u16>,
    /// Pattern the response body must match.
    pub response_pattern: Option<Regex>,
}

/// Timeout and attempt budget shared by every endpoint of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Hard limit for one attempt, including reading the body.
    pub timeout: Duration,
    /// Maximum attempts per endpoint.
    pub retry: NonZeroU32,
}

/// One validated service with its endpoints in declaration order.
#[derive(Debug, Clone)]
pub struct ServiceSpec {
    pub name: String,
    pub health: Vec<EndpointSpec>,
    pub api: Vec<EndpointSpec>,
    pub settings: ProbeSettings,
}

impl ServiceSpec {
    /// Health endpoints first, then api endpoints.
    pub fn endpoints(&self) -> impl Iterator<Item = &EndpointSpec> {
        self.health.iter().chain(self.api.iter())
    }

    pub fn endpoint_count(&self) -> usize {
        self.health.len() + self.api.len()
    }
}

// ── Run results ───────────────────────────────────────────────────

/// Result of probing one endpoint once (with retries).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub url: String,
    pub kind: EndpointKind,
    pub method: Method,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub status: Status,
    /// Last HTTP status code received, if any response arrived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_attempts: u32,
    pub success_count: u32,
    /// One description per failed attempt, in attempt order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<String>,
    /// Last response body; only kept when every attempt failed.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub response_body: String,
}

/// Aggregated result for one service in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOutcome {
    pub name: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub health: Vec<ProbeOutcome>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub api: Vec<ProbeOutcome>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_attempts: u32,
    pub success_count: u32,
}

impl ServiceOutcome {
    /// Build the service-level aggregate from its endpoint outcomes.
    ///
    /// The status merges endpoint-level statuses, not raw attempt counts.
    /// `fallback_time` is used for the time span only when there are no
    /// endpoints at all.
    pub fn from_endpoints(
        name: impl Into<String>,
        health: Vec<ProbeOutcome>,
        api: Vec<ProbeOutcome>,
        fallback_time: DateTime<Utc>,
    ) -> Self {
        let all = || health.iter().chain(api.iter());
        let status = Status::merge(all().map(|o| o.status));
        let start_time = all().map(|o| o.start_time).min().unwrap_or(fallback_time);
        let end_time = all().map(|o| o.end_time).max().unwrap_or(fallback_time);
        let total_attempts = all().map(|o| o.total_attempts).sum();
        let success_count = all().map(|o| o.success_count).sum();

        Self {
            name: name.into(),
            status,
            health,
            api,
            start_time,
            end_time,
            total_attempts,
            success_count,
        }
    }

    /// Health outcomes first, then api outcomes.
    pub fn endpoints(&self) -> impl Iterator<Item = &ProbeOutcome> {
        self.health.iter().chain(self.api.iter())
    }
}
