//! Retrying request executor for DynamoDB-style key-value store APIs.
//!
//! A [`RetryController`](retry::RetryController) runs a pre-built request
//! through a [`RequestExecutor`](executor::RequestExecutor), retrying
//! transient failures (transport errors, 5xx, throttling markers in 400
//! bodies) with jittered exponential backoff.

pub mod config;
pub mod executor;
pub mod logging;
pub mod request;
pub mod retry;

pub use executor::{AttemptOutcome, CurlExecutor, RequestExecutor, TransportError};
pub use request::{render_for_diagnostics, Request};
pub use retry::{into_parts, Response, RetryController, RetryError, RetryPolicy};
