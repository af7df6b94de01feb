//! Retry and backoff policy.
//!
//! This module encapsulates outcome classification (transport errors, 5xx,
//! throttling markers in 400 bodies), jittered exponential backoff, and the
//! bounded retry loop that drives a [`RequestExecutor`](crate::executor::RequestExecutor).

mod backoff;
mod classify;
mod error;
mod policy;
mod run;

pub use backoff::Jitter;
pub use classify::{classify, classify_bad_request, classify_http_status, Markers};
pub use error::RetryError;
pub use policy::{ErrorKind, Pass, RetryPassMarkers, RetryPolicy};
pub use run::{into_parts, Response, RetryController, Sleeper, ThreadSleeper};
