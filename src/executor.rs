//! Query execution against a SPARQL endpoint.
//!
//! [`SparqlTransport`] is the seam between the connector and whatever answers
//! queries. [`HttpExecutor`] speaks the SPARQL 1.1 Protocol over blocking HTTP
//! (`ureq`) and translates failures into the connector's error taxonomy. No
//! request is ever retried here.

use std::io::{ErrorKind, Read};
use std::time::Duration;

use crate::error::{ConnectorError, ConnectorResult};
use crate::results::SparqlResults;

/// Media type of a SPARQL query sent as a POST body.
pub const SPARQL_QUERY_MEDIA_TYPE: &str = "application/sparql-query; charset=utf-8";
/// Media type requested for SELECT and ASK results.
pub const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// Longest slice of an error body kept in diagnostics.
const MAX_DIAGNOSTIC_LEN: usize = 2048;

/// Something that can execute a fully substituted SPARQL query.
pub trait SparqlTransport: Send + Sync {
    /// Human-readable location of the store, used in error messages.
    fn endpoint(&self) -> &str;

    /// Run `query` and block until a result table or an error arrives.
    fn execute(&self, query: &str) -> ConnectorResult<SparqlResults>;
}

/// Blocking HTTP client for a remote SPARQL endpoint (e.g. a GraphDB repository).
pub struct HttpExecutor {
    endpoint: String,
    timeout: Option<Duration>,
    agent: ureq::Agent,
}

impl HttpExecutor {
    /// Create an executor for `endpoint`. With `timeout` of `None` there is
    /// no overall timeout; ureq's own connect timeout still applies.
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> Self {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            endpoint: endpoint.into(),
            timeout,
            agent: builder.build(),
        }
    }

    /// Overall per-request timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn connection_failed(&self, message: impl Into<String>) -> ConnectorError {
        ConnectorError::ConnectionFailed {
            endpoint: self.endpoint.clone(),
            message: message.into(),
        }
    }

    /// A body cut short by a timeout or reset is a transport failure; any
    /// other read error means the endpoint answered with something unusable.
    fn read_failed(&self, err: std::io::Error) -> ConnectorError {
        match err.kind() {
            ErrorKind::TimedOut
            | ErrorKind::WouldBlock
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::UnexpectedEof => {
                self.connection_failed(format!("failed to read response body: {err}"))
            }
            _ => ConnectorError::InvalidResponse {
                message: format!("unreadable response body from {}: {err}", self.endpoint),
            },
        }
    }

    fn translate(&self, query: &str, err: ureq::Error) -> ConnectorError {
        match err {
            ureq::Error::Status(400, response) => ConnectorError::MalformedQuery {
                query: query.to_string(),
                diagnostic: read_diagnostic(response),
            },
            ureq::Error::Status(status, response) => ConnectorError::EndpointError {
                endpoint: self.endpoint.clone(),
                status,
                message: read_diagnostic(response),
            },
            ureq::Error::Transport(transport) => match transport.kind() {
                ureq::ErrorKind::InvalidUrl | ureq::ErrorKind::UnknownScheme => {
                    ConnectorError::InvalidEndpoint {
                        endpoint: self.endpoint.clone(),
                        message: transport.to_string(),
                    }
                }
                _ => self.connection_failed(transport.to_string()),
            },
        }
    }
}

impl SparqlTransport for HttpExecutor {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn execute(&self, query: &str) -> ConnectorResult<SparqlResults> {
        tracing::debug!(endpoint = %self.endpoint, bytes = query.len(), "sending SPARQL query");

        let response = self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", SPARQL_QUERY_MEDIA_TYPE)
            .set("Accept", SPARQL_RESULTS_JSON)
            .send_string(query)
            .map_err(|e| self.translate(query, e))?;

        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|e| self.read_failed(e))?;

        serde_json::from_slice(&body).map_err(|e| ConnectorError::InvalidResponse {
            message: format!("response from {} is not SPARQL JSON: {e}", self.endpoint),
        })
    }
}

impl std::fmt::Debug for HttpExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpExecutor")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn read_diagnostic(response: ureq::Response) -> String {
    let status_text = response.status_text().to_string();
    let body = response.into_string().unwrap_or_default();
    let body = body.trim();
    if body.is_empty() {
        return status_text;
    }
    truncate(body, MAX_DIAGNOSTIC_LEN)
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated, {} bytes total]", &text[..end], text.len())
}
