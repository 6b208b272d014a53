//! Configuration errors. All of these are fatal before any probing starts.

use std::path::PathBuf;

use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no services defined in the configuration")]
    NoServices,

    #[error("service #{index} has an empty name")]
    EmptyServiceName { index: usize },

    #[error("service {0:?} is defined more than once")]
    DuplicateService(String),

    #[error("service {0:?} declares no health or api endpoints")]
    NoEndpoints(String),

    #[error("service {service:?}: endpoint has an empty url")]
    EmptyUrl { service: String },

    #[error("service {service:?}: invalid url {url:?}: {reason}")]
    InvalidUrl {
        service: String,
        url: String,
        reason: String,
    },

    #[error("service {service:?}: method {method:?} is not supported for {url}")]
    UnsupportedMethod {
        service: String,
        url: String,
        method: String,
    },

    #[error("service {service:?}: invalid response_regex for {url}: {source}")]
    InvalidRegex {
        service: String,
        url: String,
        #[source]
        source: regex::Error,
    },

    #[error("service {service:?}: status_code {code} for {url} is not a valid HTTP status")]
    InvalidStatusCode {
        service: String,
        url: String,
        code: i64,
    },
}
