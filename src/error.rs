//! Rich diagnostic error types for the DAKI knowledge-graph connector.
//!
//! Every failure a search can hit is a [`ConnectorError`] variant with a miette
//! error code and help text, so the host can tell a caller mistake from a
//! broken template, an unreachable endpoint, or a query the store rejected.

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised by [`GraphDbConnector`](crate::connector::GraphDbConnector)
/// and the components it owns.
#[derive(Debug, Error, Diagnostic)]
pub enum ConnectorError {
    #[error("unsupported {parameter}: \"{value}\" (expected one of: {expected})")]
    #[diagnostic(
        code(daki::connector::invalid_argument),
        help("Pass one of the accepted values: {expected}.")
    )]
    InvalidArgument {
        parameter: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("query template \"{name}\" not found at {path}")]
    #[diagnostic(
        code(daki::template::missing),
        help(
            "Every named query lives in `<templates_dir>/<name>.sparql`. \
             Check `templates_dir` in the connector config; this is a deployment \
             problem and retrying will not help."
        )
    )]
    MissingTemplate { name: String, path: String },

    #[error("failed to read query template: {path}")]
    #[diagnostic(
        code(daki::template::read),
        help("The template file exists but could not be read. Check its permissions and encoding (UTF-8).")
    )]
    TemplateRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connection to {endpoint} failed: {message}")]
    #[diagnostic(
        code(daki::executor::connection_failed),
        help(
            "Is GraphDB running and reachable? Start it, or point the connector at \
             another endpoint (e.g. via GRAPHDB_ENDPOINT)."
        )
    )]
    ConnectionFailed { endpoint: String, message: String },

    #[error("attempted to run a malformed query: {diagnostic}\n{query}")]
    #[diagnostic(
        code(daki::executor::malformed_query),
        help(
            "The store rejected the query text. This is possibly due to corrupted \
             entity or predicate identifiers, or a template edit that broke escaping."
        )
    )]
    MalformedQuery { query: String, diagnostic: String },

    #[error("endpoint {endpoint} answered with HTTP {status}: {message}")]
    #[diagnostic(
        code(daki::executor::endpoint_status),
        help(
            "The server is reachable but refused the request. A 404 usually means \
             the repository name in the endpoint URL is wrong."
        )
    )]
    EndpointError {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("invalid endpoint \"{endpoint}\": {message}")]
    #[diagnostic(
        code(daki::executor::invalid_endpoint),
        help("The endpoint must be an absolute http:// or https:// URL.")
    )]
    InvalidEndpoint { endpoint: String, message: String },

    #[error("unexpected query response: {message}")]
    #[diagnostic(
        code(daki::extract::invalid_response),
        help(
            "The response is not a SPARQL JSON result table with the expected \
             variables. Check that the template selects `?e` and the label variable."
        )
    )]
    InvalidResponse { message: String },

    #[error("embedded store error: {message}")]
    #[diagnostic(
        code(daki::local::store),
        help("The local Turtle file could not be loaded or queried. Check the file syntax.")
    )]
    LocalStore { message: String },
}

impl ConnectorError {
    /// Whether this error is the transport-level class that the liveness probe
    /// reports as `false` instead of propagating.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, ConnectorError::ConnectionFailed { .. })
    }
}

/// Convenience alias for connector results.
pub type ConnectorResult<T> = std::result::Result<T, ConnectorError>;
