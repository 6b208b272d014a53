//! pulse.toml configuration parser.
//!
//! The raw document is parsed as-is and then resolved into a
//! [`ResolvedConfig`]: numeric fields fall back service → global →
//! [`Defaults`] when unset or non-positive, and every endpoint is
//! validated (method allow-list, URL, status code, body pattern).

use std::collections::HashSet;
use std::num::NonZeroU32;
use std::path::Path;
use std::time::Duration;

use regex::bytes::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::types::{EndpointKind, EndpointSpec, Method, ProbeSettings, ServiceSpec};

/// Built-in fallbacks for every numeric setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Defaults {
    pub timeout_secs: u64,
    pub retry: u32,
    pub max_log_days: u32,
    pub concurrency: usize,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            retry: 2,
            max_log_days: 30,
            concurrency: 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PulseConfig {
    pub timeout: Option<i64>,
    pub retry: Option<i64>,
    pub max_log_days: Option<i64>,
    pub concurrency: Option<i64>,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub name: String,
    pub timeout: Option<i64>,
    pub retry: Option<i64>,
    #[serde(default)]
    pub health: Vec<EndpointConfig>,
    #[serde(default)]
    pub api: Vec<EndpointConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default)]
    pub url: String,
    pub method: Option<String>,
    pub body: Option<String>,
    pub status_code: Option<i64>,
    pub response_regex: Option<String>,
}

/// Fully defaulted and validated configuration.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub services: Vec<ServiceSpec>,
    pub max_log_days: u32,
    pub concurrency: usize,
}

impl ResolvedConfig {
    pub fn endpoint_count(&self) -> usize {
        self.services.iter().map(ServiceSpec::endpoint_count).sum()
    }
}

/// Positive value or nothing.
fn positive(v: Option<i64>) -> Option<u64> {
    v.filter(|n| *n > 0).map(|n| n as u64)
}

fn clamp_u32(v: u64) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}

impl PulseConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply defaults and validate every service and endpoint.
    pub fn resolve(&self, defaults: &Defaults) -> ConfigResult<ResolvedConfig> {
        if self.services.is_empty() {
            return Err(ConfigError::NoServices);
        }

        let global_timeout = positive(self.timeout).unwrap_or(defaults.timeout_secs.max(1));
        let global_retry = positive(self.retry).unwrap_or(u64::from(defaults.retry.max(1)));
        let max_log_days = positive(self.max_log_days)
            .map(clamp_u32)
            .unwrap_or(defaults.max_log_days.max(1));
        let concurrency = positive(self.concurrency)
            .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
            .unwrap_or(defaults.concurrency.max(1));

        let mut seen = HashSet::new();
        let mut services = Vec::with_capacity(self.services.len());
        for (index, svc) in self.services.iter().enumerate() {
            let name = svc.name.trim();
            if name.is_empty() {
                return Err(ConfigError::EmptyServiceName { index });
            }
            if !seen.insert(name.to_string()) {
                return Err(ConfigError::DuplicateService(name.to_string()));
            }
            if svc.health.is_empty() && svc.api.is_empty() {
                return Err(ConfigError::NoEndpoints(name.to_string()));
            }

            let timeout = positive(svc.timeout).unwrap_or(global_timeout);
            let retry = clamp_u32(positive(svc.retry).unwrap_or(global_retry));
            let settings = ProbeSettings {
                timeout: Duration::from_secs(timeout),
                // Both fallbacks are forced positive above.
                retry: NonZeroU32::new(retry).unwrap_or(NonZeroU32::MIN),
            };

            let health = svc
                .health
                .iter()
                .map(|e| e.resolve(name, EndpointKind::Health))
                .collect::<ConfigResult<Vec<_>>>()?;
            let api = svc
                .api
                .iter()
                .map(|e| e.resolve(name, EndpointKind::Api))
                .collect::<ConfigResult<Vec<_>>>()?;

            services.push(ServiceSpec {
                name: name.to_string(),
                health,
                api,
                settings,
            });
        }

        Ok(ResolvedConfig {
            services,
            max_log_days,
            concurrency,
        })
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Starter document with one service and every setting spelled out.
    pub fn sample() -> Self {
        let defaults = Defaults::default();
        Self {
            timeout: Some(defaults.timeout_secs as i64),
            retry: Some(i64::from(defaults.retry)),
            max_log_days: Some(i64::from(defaults.max_log_days)),
            concurrency: Some(defaults.concurrency as i64),
            services: vec![ServiceConfig {
                name: "example".to_string(),
                timeout: None,
                retry: None,
                health: vec![EndpointConfig {
                    url: "http://localhost:8080/healthz".to_string(),
                    status_code: Some(200),
                    ..Default::default()
                }],
                api: vec![EndpointConfig {
                    url: "http://localhost:8080/api/items".to_string(),
                    method: Some("POST".to_string()),
                    body: Some("{\"probe\": true}".to_string()),
                    status_code: Some(201),
                    response_regex: Some("\"id\"".to_string()),
                }],
            }],
        }
    }
}

impl EndpointConfig {
    fn resolve(&self, service: &str, kind: EndpointKind) -> ConfigResult<EndpointSpec> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ConfigError::EmptyUrl {
                service: service.to_string(),
            });
        }
        validate_url(service, url)?;

        let method = self
            .method
            .as_deref()
            .unwrap_or_default()
            .parse::<Method>()
            .map_err(|method| ConfigError::UnsupportedMethod {
                service: service.to_string(),
                url: url.to_string(),
                method,
            })?;

        // Zero and unset both mean "no expectation".
        let expected_status = match self.status_code {
            None | Some(0) => None,
            Some(code) if (100..=599).contains(&code) => Some(code as u16),
            Some(code) => {
                return Err(ConfigError::InvalidStatusCode {
                    service: service.to_string(),
                    url: url.to_string(),
                    code,
                });
            }
        };

        let response_pattern = match self.response_regex.as_deref() {
            None | Some("") => None,
            Some(pattern) => Some(Regex::new(pattern).map_err(|source| {
                ConfigError::InvalidRegex {
                    service: service.to_string(),
                    url: url.to_string(),
                    source,
                }
            })?),
        };

        Ok(EndpointSpec {
            kind,
            url: url.to_string(),
            method,
            body: self.body.clone().filter(|b| !b.is_empty()),
            expected_status,
            response_pattern,
        })
    }
}

fn validate_url(service: &str, url: &str) -> ConfigResult<()> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        service: service.to_string(),
        url: url.to_string(),
        reason,
    };
    let uri = url
        .parse::<http::Uri>()
        .map_err(|e| invalid(e.to_string()))?;
    match uri.scheme_str() {
        Some("http") | Some("https") => {}
        Some(other) => return Err(invalid(format!("unsupported scheme {other:?}"))),
        None => return Err(invalid("url must be absolute".to_string())),
    }
    if uri.host().is_none() {
        return Err(invalid("url has no host".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(toml_str: &str) -> ConfigResult<ResolvedConfig> {
        PulseConfig::from_toml_str(toml_str)?.resolve(&Defaults::default())
    }

    #[test]
    fn test_parse_minimal() {
        let cfg = resolve(
            r#"
[[services]]
name = "web"
[[services.health]]
url = "http://127.0.0.1:8080/healthz"
"#,
        )
        .unwrap();
        assert_eq!(cfg.services.len(), 1);
        assert_eq!(cfg.max_log_days, 30);
        assert_eq!(cfg.concurrency, 1);

        let svc = &cfg.services[0];
        assert_eq!(svc.name, "web");
        assert_eq!(svc.settings.timeout, Duration::from_secs(5));
        assert_eq!(svc.settings.retry.get(), 2);
        assert_eq!(svc.health[0].method, Method::Get);
        assert_eq!(svc.health[0].kind, EndpointKind::Health);
        assert!(svc.health[0].expected_status.is_none());
        assert!(svc.health[0].response_pattern.is_none());
    }

    #[test]
    fn test_defaults_chain() {
        let cfg = resolve(
            r#"
timeout = 7
retry = 0
max_log_days = -3

[[services]]
name = "a"
retry = 4
[[services.api]]
url = "http://a.local/"

[[services]]
name = "b"
timeout = -1
[[services.api]]
url = "http://b.local/"
"#,
        )
        .unwrap();
        let a = &cfg.services[0];
        assert_eq!(a.settings.timeout, Duration::from_secs(7));
        assert_eq!(a.settings.retry.get(), 4);
        let b = &cfg.services[1];
        assert_eq!(b.settings.timeout, Duration::from_secs(7));
        assert_eq!(b.settings.retry.get(), 2);
        assert_eq!(cfg.max_log_days, 30);
    }

    #[test]
    fn test_custom_defaults_struct() {
        let defaults = Defaults {
            timeout_secs: 1,
            retry: 5,
            max_log_days: 7,
            concurrency: 4,
        };
        let cfg = PulseConfig::from_toml_str(
            r#"
[[services]]
name = "a"
[[services.health]]
url = "http://a.local/"
"#,
        )
        .unwrap()
        .resolve(&defaults)
        .unwrap();
        assert_eq!(cfg.services[0].settings.retry.get(), 5);
        assert_eq!(cfg.services[0].settings.timeout, Duration::from_secs(1));
        assert_eq!(cfg.max_log_days, 7);
        assert_eq!(cfg.concurrency, 4);
    }

    #[test]
    fn test_endpoint_fields() {
        let cfg = resolve(
            r#"
[[services]]
name = "a"
[[services.api]]
url = "http://a.local/items"
method = "post"
body = '{"x":1}'
status_code = 201
response_regex = "id\\d+"
"#,
        )
        .unwrap();
        let ep = &cfg.services[0].api[0];
        assert_eq!(ep.method, Method::Post);
        assert_eq!(ep.body.as_deref(), Some(r#"{"x":1}"#));
        assert_eq!(ep.expected_status, Some(201));
        assert!(ep.response_pattern.as_ref().unwrap().is_match(b"id42"));
    }

    #[test]
    fn test_no_services_is_error() {
        assert!(matches!(resolve("timeout = 3"), Err(ConfigError::NoServices)));
    }

    #[test]
    fn test_unsupported_method_is_error() {
        let err = resolve(
            r#"
[[services]]
name = "a"
[[services.health]]
url = "http://a.local/"
method = "DELETE"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedMethod { ref method, .. } if method == "DELETE"));
    }

    #[test]
    fn test_invalid_regex_is_error() {
        let err = resolve(
            r#"
[[services]]
name = "a"
[[services.health]]
url = "http://a.local/"
response_regex = "("
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRegex { .. }));
    }

    #[test]
    fn test_bad_urls_are_errors() {
        for url in ["", "not a url", "/relative", "ftp://a.local/"] {
            let doc = format!("[[services]]\nname = \"a\"\n[[services.health]]\nurl = \"{url}\"\n");
            let err = resolve(&doc).unwrap_err();
            assert!(
                matches!(err, ConfigError::EmptyUrl { .. } | ConfigError::InvalidUrl { .. }),
                "{url:?} gave {err}"
            );
        }
    }

    #[test]
    fn test_service_without_endpoints_is_error() {
        let err = resolve("[[services]]\nname = \"lonely\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::NoEndpoints(ref n) if n == "lonely"));
    }

    #[test]
    fn test_duplicate_service_is_error() {
        let err = resolve(
            r#"
[[services]]
name = "a"
[[services.health]]
url = "http://a.local/"
[[services]]
name = "a"
[[services.health]]
url = "http://a.local/"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateService(_)));
    }

    #[test]
    fn test_status_code_range() {
        let err = resolve(
            r#"
[[services]]
name = "a"
[[services.health]]
url = "http://a.local/"
status_code = 42
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidStatusCode { code: 42, .. }));
    }

    #[test]
    fn test_roundtrip_to_toml() {
        let raw = PulseConfig::from_toml_str(
            r#"
retry = 3
[[services]]
name = "a"
[[services.health]]
url = "http://a.local/"
"#,
        )
        .unwrap();
        let toml_str = raw.to_toml_string().unwrap();
        assert!(toml_str.contains("retry = 3"));
        assert!(toml_str.contains("http://a.local/"));
    }

    #[test]
    fn test_sample_resolves_after_roundtrip() {
        let text = PulseConfig::sample().to_toml_string().unwrap();
        let cfg = PulseConfig::from_toml_str(&text)
            .unwrap()
            .resolve(&Defaults::default())
            .unwrap();
        assert_eq!(cfg.services.len(), 1);
        assert_eq!(cfg.endpoint_count(), 2);
        assert_eq!(cfg.services[0].api[0].method, Method::Post);
        assert_eq!(cfg.services[0].api[0].expected_status, Some(201));
    }
}
