use std::time::Duration;

use crate::config::{DEFAULT_ENDPOINT, KeySource};
use crate::log::NotifyLog;
use crate::submission::{SubmissionRequest, extract_host};
use crate::transport::{ResponseSummary, SubmitTransport, TransportFailure};

const MAX_LOGGED_BODY_CHARS: usize = 2_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingKey,
    UnresolvedTitle,
    UnparseableHost,
    EncodeFailed(String),
}

/// How one `notify` call ended. Callers on the host side never see this as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Skipped(SkipReason),
    Delivered(ResponseSummary),
    Rejected(ResponseSummary),
    Failed(TransportFailure),
}

impl NotifyOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Skipped(_) => "skipped",
            Self::Delivered(_) => "delivered",
            Self::Rejected(_) => "rejected",
            Self::Failed(_) => "failed",
        }
    }

    pub fn attempted(&self) -> bool {
        !matches!(self, Self::Skipped(_))
    }
}

pub struct Notifier<K, L, T> {
    keys: K,
    log: L,
    transport: T,
    endpoint: String,
}

impl<K, L, T> Notifier<K, L, T>
where
    K: KeySource,
    L: NotifyLog,
    T: SubmitTransport,
{
    pub fn new(keys: K, log: L, transport: T) -> Self {
        Self::with_endpoint(keys, log, transport, DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(keys: K, log: L, transport: T, endpoint: &str) -> Self {
        Self {
            keys,
            log,
            transport,
            endpoint: endpoint.to_string(),
        }
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Submit one URL. Every failure is logged and folded into the outcome.
    pub fn notify(&self, url: &str) -> NotifyOutcome {
        let Some(key) = self
            .keys
            .index_now_key()
            .filter(|key| !key.trim().is_empty())
        else {
            self.log
                .warning("IndexNowKey not configured. Skipping submission.", &[]);
            return NotifyOutcome::Skipped(SkipReason::MissingKey);
        };

        let Some(host) = extract_host(url) else {
            self.log
                .error("Failed to parse host from URL.", &[("url", url.to_string())]);
            return NotifyOutcome::Skipped(SkipReason::UnparseableHost);
        };

        let payload = match SubmissionRequest::for_url(&host, &key, url).to_json() {
            Ok(payload) => payload,
            Err(error) => {
                self.log.error(
                    "Failed to encode JSON payload.",
                    &[("json_error", error.to_string())],
                );
                return NotifyOutcome::Skipped(SkipReason::EncodeFailed(error.to_string()));
            }
        };

        self.log.info(
            "Submitting URL to IndexNow.",
            &[
                ("url", url.to_string()),
                ("host", host),
                ("endpoint", self.endpoint.clone()),
                ("payload", payload.clone()),
            ],
        );

        match self.transport.post_json(&self.endpoint, &payload) {
            Ok(response) => {
                self.log.info(
                    "IndexNow response received.",
                    &[
                        ("http_code", response.status.to_string()),
                        ("elapsed_ms", millis(response.elapsed)),
                        (
                            "remote_ip",
                            response.remote_ip.clone().unwrap_or_default(),
                        ),
                        ("response", truncate(&response.body, MAX_LOGGED_BODY_CHARS)),
                    ],
                );
                if response.is_success() {
                    NotifyOutcome::Delivered(response)
                } else {
                    NotifyOutcome::Rejected(response)
                }
            }
            Err(failure) => {
                self.log.error(
                    "IndexNow request failed.",
                    &[
                        ("url", url.to_string()),
                        ("error_code", failure.kind.as_str().to_string()),
                        ("error", failure.message.clone()),
                        ("elapsed_ms", millis(failure.elapsed)),
                    ],
                );
                NotifyOutcome::Failed(failure)
            }
        }
    }
}

fn millis(duration: Duration) -> String {
    duration.as_millis().to_string()
}

fn truncate(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((index, _)) => format!("{}…", &value[..index]),
        None => value.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::time::Duration;

    use crate::config::KeySource;
    use crate::transport::{
        FailureKind, ResponseSummary, SubmitTransport, TransportFailure, TransportResult,
    };

    pub struct StaticKey(pub Option<&'static str>);

    impl KeySource for StaticKey {
        fn index_now_key(&self) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    #[derive(Debug, Clone, Copy)]
    pub enum Reply {
        Status(u16),
        Refused,
        TimedOut,
    }

    /// Records every POST and answers with a canned reply.
    pub struct ScriptedTransport {
        pub reply: Reply,
        pub requests: RefCell<Vec<(String, String)>>,
    }

    impl ScriptedTransport {
        pub fn new(reply: Reply) -> Self {
            Self {
                reply,
                requests: RefCell::new(Vec::new()),
            }
        }

        pub fn bodies(&self) -> Vec<String> {
            self.requests
                .borrow()
                .iter()
                .map(|(_, body)| body.clone())
                .collect()
        }
    }

    impl SubmitTransport for ScriptedTransport {
        fn post_json(&self, endpoint: &str, body: &str) -> TransportResult {
            self.requests
                .borrow_mut()
                .push((endpoint.to_string(), body.to_string()));
            match self.reply {
                Reply::Status(status) => Ok(ResponseSummary {
                    status,
                    elapsed: Duration::from_millis(12),
                    remote_ip: Some("203.0.113.7".to_string()),
                    body: format!("status {status}"),
                }),
                Reply::Refused => Err(TransportFailure {
                    kind: FailureKind::Connect,
                    message: "connection refused".to_string(),
                    elapsed: Duration::from_millis(1),
                }),
                Reply::TimedOut => Err(TransportFailure {
                    kind: FailureKind::Timeout,
                    message: "operation timed out".to_string(),
                    elapsed: Duration::from_millis(5_000),
                }),
            }
        }
    }
}
