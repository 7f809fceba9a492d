//! Purpose: HTTP client for the hosted record store (create + list records).
//! Exports: `RecordStoreClient`, `SubmitOutcome`, `Listing`.
//! Role: The only component that performs network I/O; turns store JSON into `FeedbackTable`s.
//! Invariants: One request per operation; no retries and no caching between calls.
//! Invariants: `submit` and `list_all` never return `Err` or panic on a non-2xx response.
//! Invariants: Every request carries `accept: application/json` and the `xc-token` header.
#![allow(clippy::result_large_err)]

use super::config::StoreConfig;
use crate::core::error::{Error, ErrorKind};
use crate::core::record::{FeedbackRecord, FeedbackTable, Submission};
use serde::Deserialize;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

type ApiResult<T> = Result<T, Error>;

const TOKEN_HEADER: &str = "xc-token";

#[derive(Clone)]
pub struct RecordStoreClient {
    config: Arc<StoreConfig>,
    records_url: Url,
    timeout: Option<Duration>,
    tls_config: Option<Arc<ureq::rustls::ClientConfig>>,
    agent: ureq::Agent,
}

/// What happened to a single create request.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// The store answered 200 or 201.
    Accepted { status: u16, body: String },
    /// The store answered with any other status; `body` is its raw text.
    Rejected { status: u16, body: String },
    /// No usable HTTP response (transport failure, unreadable body).
    Failed { error: Error },
}

impl SubmitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            SubmitOutcome::Accepted { status, .. } | SubmitOutcome::Rejected { status, .. } => {
                Some(*status)
            }
            SubmitOutcome::Failed { .. } => None,
        }
    }

    /// Raw response text, or the transport error when there was no response.
    pub fn response_text(&self) -> String {
        match self {
            SubmitOutcome::Accepted { body, .. } | SubmitOutcome::Rejected { body, .. } => {
                body.clone()
            }
            SubmitOutcome::Failed { error } => error_text(error),
        }
    }

    /// User-visible status line.
    pub fn message(&self) -> String {
        if self.is_success() {
            "Feedback submitted successfully.".to_string()
        } else {
            format!("Submission failed.\n\nResponse: {}", self.response_text())
        }
    }

    pub fn into_result(self) -> ApiResult<(u16, String)> {
        match self {
            SubmitOutcome::Accepted { status, body } => Ok((status, body)),
            SubmitOutcome::Rejected { status, body } => Err(rejected(status, body)),
            SubmitOutcome::Failed { error } => Err(error),
        }
    }
}

/// A fetched table plus the failure that emptied it, if any.
#[derive(Debug)]
pub struct Listing {
    pub table: FeedbackTable,
    pub failure: Option<Error>,
}

impl Listing {
    pub fn is_degraded(&self) -> bool {
        self.failure.is_some()
    }

    /// User-visible message describing why the table is empty.
    pub fn notice(&self) -> Option<String> {
        self.failure
            .as_ref()
            .map(|err| format!("Failed to load records: {}", error_text(err)))
    }
}

#[derive(Deserialize)]
struct ListEnvelope {
    #[serde(default)]
    list: Vec<FeedbackRecord>,
}

impl RecordStoreClient {
    pub fn new(config: StoreConfig) -> ApiResult<Self> {
        let records_url = config.records_url()?;
        Ok(Self {
            config: Arc::new(config),
            records_url,
            timeout: None,
            tls_config: None,
            agent: ureq::AgentBuilder::new().build(),
        })
    }

    /// Bounds connect + read time for every request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self.rebuild_agent();
        self
    }

    /// Trusts an extra PEM CA/certificate (self-hosted stores with private CAs).
    pub fn with_tls_ca_file(mut self, path: impl AsRef<Path>) -> ApiResult<Self> {
        let path = path.as_ref();
        let cert_bytes = std::fs::read(path).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!(
                    "failed to read TLS CA/certificate file {}",
                    path.display()
                ))
                .with_source(err)
        })?;
        let mut cert_reader = Cursor::new(cert_bytes);
        let certs = rustls_pemfile::certs(&mut cert_reader)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| {
                Error::new(ErrorKind::Usage)
                    .with_message("failed to parse TLS CA/certificate file")
                    .with_source(err)
            })?;
        if certs.is_empty() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("TLS CA/certificate file contains no certificates"));
        }

        let _ = ureq::rustls::crypto::aws_lc_rs::default_provider().install_default();
        let mut root_store = ureq::rustls::RootCertStore::empty();
        let (added, _) = root_store.add_parsable_certificates(certs);
        if added == 0 {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("TLS CA/certificate file contains no parsable certificates"));
        }

        let tls_config = ureq::rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();
        self.tls_config = Some(Arc::new(tls_config));
        self.rebuild_agent();
        Ok(self)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn records_url(&self) -> &Url {
        &self.records_url
    }

    /// Creates one record. Non-2xx and transport failures come back as outcomes.
    pub fn submit(&self, submission: &Submission) -> SubmitOutcome {
        let outcome = self.send_create(submission);
        match &outcome {
            SubmitOutcome::Accepted { status, .. } => {
                info!(status, "feedback record created");
            }
            SubmitOutcome::Rejected { status, body } => {
                warn!(status, body = %body, "record store rejected feedback");
            }
            SubmitOutcome::Failed { error } => {
                warn!(error = %error, "feedback submission failed");
            }
        }
        outcome
    }

    /// Fetches the configured view. Failures degrade to an empty table.
    pub fn list_all(&self) -> Listing {
        match self.fetch_table() {
            Ok(table) => Listing {
                table,
                failure: None,
            },
            Err(err) => {
                warn!(error = %err, "failed to load records");
                Listing {
                    table: FeedbackTable::empty(),
                    failure: Some(err),
                }
            }
        }
    }

    /// Fallible fetch underneath `list_all`.
    pub fn fetch_table(&self) -> ApiResult<FeedbackTable> {
        debug!(url = %self.records_url, "fetching records");
        let response = match self.request("GET").call() {
            Ok(resp) => resp,
            Err(ureq::Error::Status(status, resp)) => {
                return Err(rejected(status, read_body(resp)?));
            }
            Err(ureq::Error::Transport(err)) => return Err(transport_error(err)),
        };
        let status = response.status();
        let body = read_body(response)?;
        if status != 200 {
            return Err(rejected(status, body));
        }
        let envelope: ListEnvelope = serde_json::from_str(&body).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("invalid record list json")
                .with_body(body.clone())
                .with_source(err)
        })?;
        debug!(records = envelope.list.len(), "records fetched");
        Ok(FeedbackTable::new(envelope.list))
    }

    fn send_create(&self, submission: &Submission) -> SubmitOutcome {
        let payload = match serde_json::to_string(submission) {
            Ok(payload) => payload,
            Err(err) => {
                return SubmitOutcome::Failed {
                    error: Error::new(ErrorKind::Internal)
                        .with_message("failed to encode request json")
                        .with_source(err),
                };
            }
        };
        debug!(url = %self.records_url, "creating record");
        let response = self
            .request("POST")
            .set("Content-Type", "application/json")
            .send_string(&payload);
        match response {
            Ok(resp) => {
                let status = resp.status();
                match read_body(resp) {
                    Ok(body) if matches!(status, 200 | 201) => {
                        SubmitOutcome::Accepted { status, body }
                    }
                    Ok(body) => SubmitOutcome::Rejected { status, body },
                    Err(error) => SubmitOutcome::Failed { error },
                }
            }
            Err(ureq::Error::Status(status, resp)) => match read_body(resp) {
                Ok(body) => SubmitOutcome::Rejected { status, body },
                Err(error) => SubmitOutcome::Failed {
                    error: error.with_status(status),
                },
            },
            Err(ureq::Error::Transport(err)) => SubmitOutcome::Failed {
                error: transport_error(err),
            },
        }
    }

    fn request(&self, method: &str) -> ureq::Request {
        self.agent
            .request(method, self.records_url.as_str())
            .set("accept", "application/json")
            .set(TOKEN_HEADER, self.config.token())
    }

    fn rebuild_agent(&mut self) {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(tls_config) = &self.tls_config {
            builder = builder.tls_config(tls_config.clone());
        }
        self.agent = builder.build();
    }
}

fn read_body(response: ureq::Response) -> ApiResult<String> {
    let status = response.status();
    response.into_string().map_err(|err| {
        warn!(status, error = %err, "failed to read record store response");
        Error::new(ErrorKind::Io)
            .with_message("failed to read response body")
            .with_source(err)
    })
}

fn transport_error(err: ureq::Transport) -> Error {
    Error::new(ErrorKind::Io)
        .with_message("record store request failed")
        .with_hint("Check network access and the configured base url.")
        .with_source(err)
}

fn rejected(status: u16, body: String) -> Error {
    Error::new(ErrorKind::Remote)
        .with_message(format!("record store returned status {status}"))
        .with_hint(status_hint(status))
        .with_status(status)
        .with_body(body)
}

fn status_hint(status: u16) -> &'static str {
    match status {
        401 | 403 => "Check that API_TOKEN is valid for this table.",
        404 => "Check the configured table id and view id.",
        400 | 422 => "The store rejected the payload; check the table's column names.",
        500..=599 => "The record store is unavailable; try again later.",
        _ => "Inspect the response text for details.",
    }
}

/// Store response text when available, otherwise the error description.
fn error_text(err: &Error) -> String {
    match err.body() {
        Some(body) if !body.is_empty() => body.to_string(),
        _ => {
            let mut text = err.message().unwrap_or("request failed").to_string();
            if let Some(source) = std::error::Error::source(err) {
                text.push_str(&format!(": {source}"));
            }
            text
        }
    }
}
