//! Classify attempt outcomes (transport errors, HTTP status, 400 body markers)
//! into retry policy error kinds.

use crate::executor::AttemptOutcome;
use crate::retry::policy::ErrorKind;
use serde::{Deserialize, Serialize};

/// Substrings that mark a 400 response as backpressure rather than a caller mistake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Markers {
    /// Provisioned capacity exceeded.
    pub throughput_exceeded: String,
    /// Credential or clock-skew rejection that usually clears on its own.
    pub unrecognized_client: String,
    /// Generic request-rate throttling.
    pub throttling: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            throughput_exceeded: "ProvisionedThroughputExceededException".to_string(),
            unrecognized_client: "UnrecognizedClientException".to_string(),
            throttling: "ThrottlingException".to_string(),
        }
    }
}

/// Classify a 400 response body. Markers are checked in a fixed order and the
/// first match wins.
pub fn classify_bad_request(body: &str, markers: &Markers) -> ErrorKind {
    if body.contains(markers.throughput_exceeded.as_str()) {
        ErrorKind::ThroughputExceeded
    } else if body.contains(markers.unrecognized_client.as_str()) {
        ErrorKind::UnrecognizedClient
    } else if body.contains(markers.throttling.as_str()) {
        ErrorKind::Throttling
    } else {
        ErrorKind::BadRequest
    }
}

/// Classify an HTTP status and body for retry decisions.
pub fn classify_http_status(status: u16, body: &str, markers: &Markers) -> ErrorKind {
    match status {
        500..=u16::MAX => ErrorKind::Http5xx(status),
        400 => classify_bad_request(body, markers),
        _ => ErrorKind::Other,
    }
}

/// Classify one attempt. A transport error outranks whatever status came back.
pub fn classify(outcome: &AttemptOutcome, markers: &Markers) -> ErrorKind {
    if outcome.error.is_some() {
        return ErrorKind::Transport;
    }
    classify_http_status(outcome.status, &outcome.body, markers)
}
