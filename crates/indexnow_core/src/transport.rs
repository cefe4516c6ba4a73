use std::error::Error as StdError;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;

use crate::config::ResolvedSettings;

/// What came back from the endpoint, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSummary {
    pub status: u16,
    pub elapsed: Duration,
    pub remote_ip: Option<String>,
    pub body: String,
}

impl ResponseSummary {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    Connect,
    Request,
    Body,
    Other,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Request => "request",
            Self::Body => "body",
            Self::Other => "other",
        }
    }
}

/// The request never produced an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub kind: FailureKind,
    pub message: String,
    pub elapsed: Duration,
}

pub type TransportResult = std::result::Result<ResponseSummary, TransportFailure>;

pub trait SubmitTransport {
    fn post_json(&self, endpoint: &str, body: &str) -> TransportResult;
}

impl<T: SubmitTransport + ?Sized> SubmitTransport for &T {
    fn post_json(&self, endpoint: &str, body: &str) -> TransportResult {
        (**self).post_json(endpoint, body)
    }
}

#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub timeout: Duration,
}

impl HttpTransportConfig {
    pub fn from_settings(settings: &ResolvedSettings) -> Self {
        Self {
            user_agent: settings.user_agent.clone(),
            connect_timeout: settings.connect_timeout,
            timeout: settings.timeout,
        }
    }
}

/// Blocking reqwest transport; one POST per call, no retries.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &HttpTransportConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .context("failed to build IndexNow HTTP client")?;
        Ok(Self { client })
    }
}

impl SubmitTransport for HttpTransport {
    fn post_json(&self, endpoint: &str, body: &str) -> TransportResult {
        let started = Instant::now();
        let response = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .send()
            .map_err(|error| failure(&error, started))?;

        let status = response.status().as_u16();
        let remote_ip = response.remote_addr().map(|addr| addr.ip().to_string());
        let body = response.text().map_err(|error| failure(&error, started))?;

        Ok(ResponseSummary {
            status,
            elapsed: started.elapsed(),
            remote_ip,
            body,
        })
    }
}

fn failure(error: &reqwest::Error, started: Instant) -> TransportFailure {
    TransportFailure {
        kind: classify_error(error),
        message: error_chain(error),
        elapsed: started.elapsed(),
    }
}

fn classify_error(error: &reqwest::Error) -> FailureKind {
    if error.is_timeout() {
        FailureKind::Timeout
    } else if error.is_connect() {
        FailureKind::Connect
    } else if error.is_body() || error.is_decode() {
        FailureKind::Body
    } else if error.is_request() || error.is_builder() {
        FailureKind::Request
    } else {
        FailureKind::Other
    }
}

fn error_chain(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = StdError::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
