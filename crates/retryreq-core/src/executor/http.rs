//! libcurl-backed executor for DynamoDB-style JSON APIs.
//!
//! Each attempt is a `POST` of the JSON payload with an `X-Amz-Target` header
//! naming the operation. Signing happens upstream: callers pass the already
//! computed auth headers through `CurlExecutorOptions::headers`.

use super::{parse, AttemptOutcome, RequestExecutor, TransportError};
use crate::request::Request;
use std::collections::BTreeMap;
use std::str;
use std::time::Duration;

/// Content type for JSON 1.0 protocol requests.
const CONTENT_TYPE: &str = "application/x-amz-json-1.0";

/// Connection settings for [`CurlExecutor`].
#[derive(Debug, Clone)]
pub struct CurlExecutorOptions {
    /// Service endpoint URL.
    pub endpoint: String,
    /// Prefix joined with the operation name for `X-Amz-Target`.
    pub api_version: String,
    pub connect_timeout: Duration,
    /// Hard limit on a single attempt.
    pub timeout: Duration,
    /// Extra headers (e.g. pre-computed `Authorization`, `X-Amz-Date`).
    pub headers: BTreeMap<String, String>,
}

impl Default for CurlExecutorOptions {
    fn default() -> Self {
        Self {
            endpoint: crate::config::DEFAULT_ENDPOINT.to_string(),
            api_version: crate::config::DEFAULT_API_VERSION.to_string(),
            connect_timeout: Duration::from_secs(15),
            timeout: Duration::from_secs(60),
            headers: BTreeMap::new(),
        }
    }
}

/// Blocking executor using one curl `Easy` handle per attempt.
#[derive(Debug, Clone)]
pub struct CurlExecutor {
    opts: CurlExecutorOptions,
}

impl CurlExecutor {
    pub fn new(opts: CurlExecutorOptions) -> Self {
        Self { opts }
    }

    /// `X-Amz-Target` value for an operation.
    pub fn target(&self, operation: &str) -> String {
        if self.opts.api_version.is_empty() {
            operation.to_string()
        } else {
            format!("{}.{}", self.opts.api_version, operation)
        }
    }

    fn perform(
        &self,
        request: &Request,
        operation: &str,
    ) -> Result<(u16, Vec<u8>, Vec<String>), TransportError> {
        let payload = request.to_bytes()?;
        let mut body: Vec<u8> = Vec::new();
        let mut headers: Vec<String> = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(&self.opts.endpoint)?;
        easy.post(true)?;
        easy.post_fields_copy(&payload)?;
        easy.connect_timeout(self.opts.connect_timeout)?;
        easy.timeout(self.opts.timeout)?;

        let mut list = curl::easy::List::new();
        list.append(&format!("Content-Type: {}", CONTENT_TYPE))?;
        list.append(&format!("X-Amz-Target: {}", self.target(operation)))?;
        for (k, v) in &self.opts.headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        easy.http_headers(list)?;

        {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    headers.push(s.trim_end().to_string());
                }
                true
            })?;
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let code = easy.response_code()?;
        Ok((code as u16, body, headers))
    }
}

impl RequestExecutor for CurlExecutor {
    fn execute(&self, request: &Request, operation: &str) -> AttemptOutcome {
        match self.perform(request, operation) {
            Ok((status, body, headers)) => {
                let request_id = parse::request_id(&headers);
                match String::from_utf8(body) {
                    Ok(body) => AttemptOutcome::response(status, body, request_id),
                    Err(_) => AttemptOutcome {
                        request_id,
                        status,
                        error: Some(TransportError::InvalidBody),
                        ..AttemptOutcome::default()
                    },
                }
            }
            Err(e) => {
                tracing::debug!(operation, "attempt failed before a response: {}", e);
                AttemptOutcome::failed(e)
            }
        }
    }
}
