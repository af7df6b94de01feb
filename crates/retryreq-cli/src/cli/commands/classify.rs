//! `retryreq classify` – offline view of the retry decision for a response.

use anyhow::Result;
use retryreq_core::config::RetryreqConfig;
use retryreq_core::retry::{classify_http_status, Pass, RetryPolicy};

/// One tab-separated line: kind, then `retry` or `stop`.
pub(crate) fn decision_line(policy: &RetryPolicy, status: u16, body: &str, pass: Pass) -> String {
    let kind = classify_http_status(status, body, &policy.markers);
    let verdict = if policy.should_retry(kind, pass) {
        "retry"
    } else {
        "stop"
    };
    format!("{:?}\t{}", kind, verdict)
}

pub async fn run_classify(cfg: &RetryreqConfig, status: u16, body: &str, retry_pass: bool) -> Result<()> {
    let policy = cfg.retry_policy()?;
    let pass = if retry_pass { Pass::Retry } else { Pass::First };
    println!("{}", decision_line(&policy, status, body, pass));
    Ok(())
}
