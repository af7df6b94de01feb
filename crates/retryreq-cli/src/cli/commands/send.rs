//! `retryreq send` – execute one request through the retry controller.

use anyhow::{Context, Result};
use retryreq_core::config::RetryreqConfig;
use retryreq_core::executor::CurlExecutor;
use retryreq_core::retry::RetryController;
use std::collections::BTreeMap;

/// Send `payload` as `target`, print the response body, and fail on non-2xx.
pub async fn run_send(
    cfg: &RetryreqConfig,
    endpoint: Option<&str>,
    target: &str,
    payload: Vec<u8>,
    headers: BTreeMap<String, String>,
) -> Result<()> {
    let mut cfg = cfg.clone();
    if let Some(endpoint) = endpoint {
        cfg.endpoint = endpoint.to_string();
    }
    let policy = cfg.retry_policy()?;
    let opts = cfg.executor_options(headers)?;
    let controller = RetryController::new(CurlExecutor::new(opts), policy);

    let operation = target.to_string();
    let response = tokio::task::spawn_blocking(move || controller.execute_raw(&payload, &operation))
        .await
        .context("request task panicked")??;

    println!("{}", response.body);
    if !response.is_success() {
        anyhow::bail!(
            "{} returned HTTP {} (reqid:{})",
            target,
            response.status,
            response.request_id
        );
    }
    Ok(())
}
