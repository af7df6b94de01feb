//! Single-attempt request execution.
//!
//! An executor performs exactly one attempt of an operation and reports what
//! happened; it never retries. The retry controller drives it.

mod http;
mod parse;

pub use http::{CurlExecutor, CurlExecutorOptions};

use crate::request::Request;
use std::fmt;

/// What a single attempt produced.
#[derive(Debug, Default)]
pub struct AttemptOutcome {
    /// Response body (empty when the transfer failed).
    pub body: String,
    /// Service-assigned request id, if the response carried one.
    pub request_id: String,
    /// HTTP status code; 0 when no response was received.
    pub status: u16,
    /// Set when the attempt itself failed (network, serialization, decoding).
    pub error: Option<TransportError>,
}

impl AttemptOutcome {
    /// A completed HTTP exchange.
    pub fn response(status: u16, body: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            request_id: request_id.into(),
            status,
            error: None,
        }
    }

    /// An attempt that failed before a usable response was obtained.
    pub fn failed(error: TransportError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }
}

/// Failure of the attempt itself, as opposed to an HTTP error status.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// libcurl reported an error (timeout, connection, DNS, ...).
    #[error("transport: {0}")]
    Curl(#[from] curl::Error),
    /// The request could not be serialized for the wire.
    #[error("serialize request: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The response body was not valid UTF-8.
    #[error("response body is not UTF-8")]
    InvalidBody,
    /// Any other executor-specific failure.
    #[error("{0}")]
    Other(String),
}

/// Performs one attempt of `operation` with `request`.
///
/// Implementations are blocking. Closures with the same shape implement this
/// trait, which keeps tests and ad-hoc transports cheap to write.
pub trait RequestExecutor {
    fn execute(&self, request: &Request, operation: &str) -> AttemptOutcome;
}

impl<F> RequestExecutor for F
where
    F: Fn(&Request, &str) -> AttemptOutcome,
{
    fn execute(&self, request: &Request, operation: &str) -> AttemptOutcome {
        self(request, operation)
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            Some(e) => write!(f, "{} (reqid:{})", e, self.request_id),
            None => write!(f, "HTTP {} (reqid:{})", self.status, self.request_id),
        }
    }
}
