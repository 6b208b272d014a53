//! HTTP transport used by the prober.
//!
//! [`HttpTransport`] is the seam between probe logic and the network: the
//! prober only sees a status code and a body (or an error), which lets
//! tests script responses without a server. [`HyperTransport`] is the real
//! implementation on top of the hyper legacy client.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use thiserror::Error;

use pulse_core::{EndpointSpec, Method};

/// `content-type` sent with configured request bodies.
pub const BODY_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Boxed future alias for transport results.
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ProbeResponse, TransportError>> + Send + 'a>>;

/// Request for a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<String>,
}

impl From<&EndpointSpec> for ProbeRequest {
    fn from(spec: &EndpointSpec) -> Self {
        Self {
            method: spec.method,
            url: spec.url.clone(),
            body: spec.body.clone(),
        }
    }
}

/// A fully received response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Attempt-level failures below HTTP semantics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("invalid request: {0}")]
    Request(String),

    #[error("request failed: {0}")]
    Send(String),

    /// Headers arrived with `status` but the body could not be read.
    #[error("failed to read response body: {message}")]
    Body { status: u16, message: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Executes one request with a hard deadline. Tests substitute scripted implementations.
///
/// The deadline covers sending the request and reading the whole body.
pub trait HttpTransport: Send + Sync {
    fn send<'a>(&'a self, request: &'a ProbeRequest, timeout: Duration) -> TransportFuture<'a>;
}

/// Plain-HTTP transport backed by `hyper_util`'s pooled client.
///
/// `https` URLs are rejected by the connector and surface as
/// [`TransportError::Send`].
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Full<Bytes>>,
    user_agent: String,
}

impl HyperTransport {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http();
        Self {
            client,
            user_agent: concat!("pulsegrid/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    fn build(&self, request: &ProbeRequest) -> Result<http::Request<Full<Bytes>>, TransportError> {
        let body = request
            .body
            .as_ref()
            .map(|b| Bytes::from(b.clone()))
            .unwrap_or_default();
        let mut builder = http::Request::builder()
            .method(http::Method::from(request.method))
            .uri(request.url.as_str())
            .header(http::header::USER_AGENT, self.user_agent.as_str());
        if request.body.is_some() {
            builder = builder.header(http::header::CONTENT_TYPE, BODY_CONTENT_TYPE);
        }
        builder
            .body(Full::new(body))
            .map_err(|e| TransportError::Request(e.to_string()))
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport for HyperTransport {
    fn send<'a>(&'a self, request: &'a ProbeRequest, timeout: Duration) -> TransportFuture<'a> {
        Box::pin(async move {
            let req = self.build(request)?;

            let exchange = async {
                let resp: hyper::Response<hyper::body::Incoming> = self
                    .client
                    .request(req)
                    .await
                    .map_err(|e| TransportError::Send(error_chain(&e)))?;
                let status = resp.status().as_u16();
                let body = resp
                    .into_body()
                    .collect()
                    .await
                    .map_err(|e| TransportError::Body {
                        status,
                        message: error_chain(&e),
                    })?
                    .to_bytes();
                Ok(ProbeResponse { status, body })
            };

            match tokio::time::timeout(timeout, exchange).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(timeout)),
            }
        })
    }
}

/// Render an error with its source chain, e.g.
/// `client error (Connect): tcp connect error: Connection refused`.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !out.ends_with(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = inner.source();
    }
    out
}
