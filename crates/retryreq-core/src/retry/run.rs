//! Retry loop: execute a request until it succeeds, fails permanently, or the
//! policy runs out of attempts.

use super::backoff::Jitter;
use super::classify;
use super::error::RetryError;
use super::policy::{ErrorKind, Pass, RetryPolicy};
use crate::executor::{AttemptOutcome, RequestExecutor, TransportError};
use crate::request::{render_for_diagnostics, Request};
use serde::Serialize;
use std::time::Duration;

/// The suspension point between attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Blocks the calling thread. Run the controller on `spawn_blocking` from async code.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Terminal response of a non-retryable attempt: either a success or a
/// permanent failure such as a 400 without a throttling marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub body: String,
    pub status: u16,
    pub request_id: String,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl From<AttemptOutcome> for Response {
    fn from(o: AttemptOutcome) -> Self {
        Self {
            body: o.body,
            status: o.status,
            request_id: o.request_id,
        }
    }
}

/// Flatten a controller result into `(body, status, error)`.
/// Exhaustion yields an empty body and status 0.
pub fn into_parts(result: Result<Response, RetryError>) -> (String, u16, Option<RetryError>) {
    match result {
        Ok(r) => (r.body, r.status, None),
        Err(e) => (String::new(), 0, Some(e)),
    }
}

/// Drives a [`RequestExecutor`] under a [`RetryPolicy`].
///
/// Holds no per-call state: every `execute` owns its attempt counter and its
/// jitter source, so one controller can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct RetryController<E, S = ThreadSleeper> {
    executor: E,
    policy: RetryPolicy,
    sleeper: S,
}

impl<E: RequestExecutor> RetryController<E> {
    pub fn new(executor: E, policy: RetryPolicy) -> Self {
        Self {
            executor,
            policy,
            sleeper: ThreadSleeper,
        }
    }
}

impl<E: RequestExecutor, S: Sleeper> RetryController<E, S> {
    /// Replace the sleeper (e.g. to observe or skip backoff in tests).
    pub fn with_sleeper<S2: Sleeper>(self, sleeper: S2) -> RetryController<E, S2> {
        RetryController {
            executor: self.executor,
            policy: self.policy,
            sleeper,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Execute a structured request descriptor.
    ///
    /// The descriptor is serialized as part of each attempt. A descriptor that
    /// cannot be serialized counts as a transport failure on every attempt, so
    /// the caller ends up with [`RetryError::Exhausted`].
    pub fn execute_descriptor<T: Serialize + ?Sized>(
        &self,
        descriptor: &T,
        operation: &str,
    ) -> Result<Response, RetryError> {
        match Request::from_serialize(descriptor) {
            Ok(request) => self.execute(&request, operation),
            Err(e) => {
                let summary = format!("<unserializable request: {}>", e);
                self.run_attempts(operation, None, &summary, Jitter::from_clock(), || {
                    match Request::from_serialize(descriptor) {
                        Ok(request) => self.executor.execute(&request, operation),
                        Err(e) => AttemptOutcome::failed(TransportError::Serialize(e)),
                    }
                })
            }
        }
    }

    /// Execute an already-serialized JSON payload.
    pub fn execute_raw(&self, payload: &[u8], operation: &str) -> Result<Response, RetryError> {
        self.execute(&Request::Raw(payload.to_vec()), operation)
    }

    /// Execute with a clock-seeded jitter source.
    pub fn execute(&self, request: &Request, operation: &str) -> Result<Response, RetryError> {
        self.execute_with_jitter(request, operation, Jitter::from_clock())
    }

    /// Execute with a caller-supplied jitter source.
    pub fn execute_with_jitter(
        &self,
        request: &Request,
        operation: &str,
        jitter: Jitter,
    ) -> Result<Response, RetryError> {
        let summary = request.summary();
        self.run_attempts(operation, Some(request), &summary, jitter, || {
            self.executor.execute(request, operation)
        })
    }

    /// The bounded loop shared by every entry point. `request` is `None` when
    /// there is nothing renderable to show in diagnostics.
    fn run_attempts<A>(
        &self,
        operation: &str,
        request: Option<&Request>,
        summary: &str,
        mut jitter: Jitter,
        mut attempt: A,
    ) -> Result<Response, RetryError>
    where
        A: FnMut() -> AttemptOutcome,
    {
        let outcome = attempt();
        if !self.evaluate(request, operation, &outcome, Pass::First) {
            return Ok(outcome.into());
        }

        let mut attempts = 1u32;
        let mut last = outcome;
        for retry in 1..self.policy.attempt_ceiling() {
            let delay = jitter.delay(&self.policy, retry);
            tracing::debug!(
                operation,
                retry,
                status = last.status,
                request_id = %last.request_id,
                "begin backoff sleep {:?}",
                delay
            );
            self.sleeper.sleep(delay);
            tracing::debug!(operation, retry, "end backoff sleep");

            let outcome = attempt();
            attempts += 1;
            if !self.evaluate(request, operation, &outcome, Pass::Retry) {
                tracing::info!(operation, attempts, status = outcome.status, "retry loop success");
                return Ok(outcome.into());
            }
            last = outcome;
        }

        tracing::error!(
            operation,
            attempts,
            status = last.status,
            request_id = %last.request_id,
            "retries exhausted"
        );
        Err(RetryError::Exhausted {
            operation: operation.to_string(),
            attempts,
            last_status: last.status,
            request: summary.to_string(),
        })
    }

    /// Classify one outcome, log it, and return whether to retry.
    fn evaluate(
        &self,
        request: Option<&Request>,
        operation: &str,
        outcome: &AttemptOutcome,
        pass: Pass,
    ) -> bool {
        let kind = classify::classify(outcome, &self.policy.markers);
        let retry = self.policy.should_retry(kind, pass);
        match kind {
            ErrorKind::Transport => {
                tracing::warn!(operation, ?pass, "attempt failed: {}", outcome);
            }
            ErrorKind::Http5xx(code) => {
                tracing::warn!(operation, ?pass, request_id = %outcome.request_id, "server error HTTP {}", code);
            }
            k if k.is_throttle() => {
                tracing::warn!(
                    operation,
                    ?pass,
                    request_id = %outcome.request_id,
                    will_retry = retry,
                    "throughput warning: {:?}",
                    k
                );
            }
            ErrorKind::BadRequest if pass == Pass::First => {
                let rendered = request
                    .map(render_for_diagnostics)
                    .unwrap_or_else(|| "<no request>".to_string());
                tracing::error!(
                    operation,
                    request_id = %outcome.request_id,
                    "un-retryable error: {}\n{}",
                    outcome.body,
                    rendered
                );
            }
            _ => {}
        }
        retry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::TransportError;
    use serde_json::json;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    /// Replays a fixed list of outcomes; repeats the last one when exhausted.
    struct Scripted {
        outcomes: RefCell<VecDeque<(u16, &'static str)>>,
        calls: Cell<u32>,
    }

    impl Scripted {
        fn new(outcomes: &[(u16, &'static str)]) -> Self {
            Self {
                outcomes: RefCell::new(outcomes.iter().copied().collect()),
                calls: Cell::new(0),
            }
        }
    }

    impl RequestExecutor for Scripted {
        fn execute(&self, _request: &Request, _operation: &str) -> AttemptOutcome {
            self.calls.set(self.calls.get() + 1);
            let mut q = self.outcomes.borrow_mut();
            let (status, body) = if q.len() > 1 {
                q.pop_front().unwrap()
            } else {
                *q.front().unwrap()
            };
            if status == 0 {
                return AttemptOutcome::failed(TransportError::Other(body.to_string()));
            }
            AttemptOutcome::response(status, body, format!("rid-{}", self.calls.get()))
        }
    }

    #[derive(Default)]
    struct Recording {
        sleeps: RefCell<Vec<Duration>>,
    }

    impl Sleeper for Recording {
        fn sleep(&self, duration: Duration) {
            self.sleeps.borrow_mut().push(duration);
        }
    }

    fn controller(outcomes: &[(u16, &'static str)], max_attempts: u32) -> RetryController<Scripted, Recording> {
        let policy = RetryPolicy {
            max_attempts,
            ..RetryPolicy::default()
        };
        RetryController::new(Scripted::new(outcomes), policy).with_sleeper(Recording::default())
    }

    fn req() -> Request {
        Request::Descriptor(json!({"TableName": "users", "Key": {"id": {"S": "1"}}}))
    }

    #[test]
    fn success_first_try_no_sleep() {
        let c = controller(&[(200, "{}")], 7);
        let r = c.execute(&req(), "GetItem").unwrap();
        assert_eq!(r.status, 200);
        assert_eq!(r.request_id, "rid-1");
        assert_eq!(c.executor().calls.get(), 1);
        assert!(c.sleeper().sleeps.borrow().is_empty());
    }

    #[test]
    fn permanent_bad_request_returns_immediately() {
        let c = controller(&[(400, "ValidationException: bad key")], 7);
        let r = c.execute(&req(), "GetItem").unwrap();
        assert_eq!(r.status, 400);
        assert_eq!(r.body, "ValidationException: bad key");
        assert!(!r.is_success());
        assert_eq!(c.executor().calls.get(), 1);
        assert!(c.sleeper().sleeps.borrow().is_empty());
    }

    #[test]
    fn other_4xx_is_not_retried() {
        let c = controller(&[(404, "not found")], 7);
        assert_eq!(c.execute(&req(), "GetItem").unwrap().status, 404);
        assert_eq!(c.executor().calls.get(), 1);
    }

    #[test]
    fn all_503_exhausts_after_ceiling_attempts() {
        let c = controller(&[(503, "ServiceUnavailable")], 4);
        let result = c.execute(&req(), "PutItem");
        assert_eq!(c.executor().calls.get(), 4);
        assert_eq!(c.sleeper().sleeps.borrow().len(), 3);
        let (body, status, err) = into_parts(result);
        assert!(body.is_empty());
        assert_eq!(status, 0);
        match err {
            Some(RetryError::Exhausted {
                operation,
                attempts,
                last_status,
                request,
            }) => {
                assert_eq!(operation, "PutItem");
                assert_eq!(attempts, 4);
                assert_eq!(last_status, 503);
                assert!(request.contains("users"));
            }
            other => panic!("expected Exhausted, got {:?}", other),
        }
    }

    #[test]
    fn invocations_never_exceed_ceiling() {
        for ceiling in 1..=6u32 {
            let c = controller(&[(500, "")], ceiling);
            assert!(c.execute(&req(), "Query").unwrap_err().is_exhausted());
            assert_eq!(c.executor().calls.get(), ceiling);
            assert_eq!(c.sleeper().sleeps.borrow().len() as u32, ceiling - 1);
        }
    }

    #[test]
    fn sleeps_respect_growing_bounds() {
        let c = controller(&[(503, "")], 4);
        let _ = c.execute(&req(), "Scan");
        let sleeps = c.sleeper().sleeps.borrow();
        for (i, d) in sleeps.iter().enumerate() {
            let retry = i as u32 + 1;
            assert!(*d < c.policy().delay_bound(retry), "retry {} slept {:?}", retry, d);
        }
    }

    #[test]
    fn seeded_jitter_is_reproducible() {
        let a = controller(&[(503, "")], 4);
        let b = controller(&[(503, "")], 4);
        let _ = a.execute_with_jitter(&req(), "Scan", Jitter::seeded(9));
        let _ = b.execute_with_jitter(&req(), "Scan", Jitter::seeded(9));
        assert_eq!(*a.sleeper().sleeps.borrow(), *b.sleeper().sleeps.borrow());
    }

    #[test]
    fn unrecognized_client_then_success() {
        let c = controller(&[(400, "UnrecognizedClientException"), (200, r#"{"Item":{}}"#)], 7);
        let r = c.execute(&req(), "GetItem").unwrap();
        assert_eq!(r.status, 200);
        assert_eq!(r.body, r#"{"Item":{}}"#);
        assert_eq!(c.executor().calls.get(), 2);
        assert_eq!(c.sleeper().sleeps.borrow().len(), 1);
    }

    #[test]
    fn transport_error_then_success() {
        let c = controller(&[(0, "connection reset"), (200, "{}")], 7);
        assert_eq!(c.execute(&req(), "GetItem").unwrap().status, 200);
        assert_eq!(c.executor().calls.get(), 2);
    }

    #[test]
    fn throughput_exceeded_keeps_retrying() {
        let c = controller(
            &[
                (400, "ProvisionedThroughputExceededException"),
                (400, "ProvisionedThroughputExceededException"),
                (200, "{}"),
            ],
            7,
        );
        assert_eq!(c.execute(&req(), "PutItem").unwrap().status, 200);
        assert_eq!(c.executor().calls.get(), 3);
    }

    #[test]
    fn throttling_on_retry_pass_stops_by_default() {
        let c = controller(&[(503, ""), (400, "ThrottlingException")], 7);
        let r = c.execute(&req(), "PutItem").unwrap();
        assert_eq!(r.status, 400);
        assert_eq!(r.body, "ThrottlingException");
        assert_eq!(c.executor().calls.get(), 2);
    }

    #[test]
    fn throttling_on_retry_pass_continues_with_all_markers() {
        let policy = RetryPolicy {
            retry_pass_markers: super::super::policy::RetryPassMarkers::All,
            ..RetryPolicy::default()
        };
        let c = RetryController::new(
            Scripted::new(&[(503, ""), (400, "ThrottlingException"), (200, "{}")]),
            policy,
        )
        .with_sleeper(Recording::default());
        assert_eq!(c.execute(&req(), "PutItem").unwrap().status, 200);
        assert_eq!(c.executor().calls.get(), 3);
    }

    #[test]
    fn ceiling_of_one_never_sleeps() {
        let c = controller(&[(500, "")], 1);
        assert!(c.execute(&req(), "GetItem").unwrap_err().is_exhausted());
        assert_eq!(c.executor().calls.get(), 1);
        assert!(c.sleeper().sleeps.borrow().is_empty());
    }

    #[test]
    fn raw_and_descriptor_share_the_loop() {
        let c = controller(&[(500, ""), (200, "ok")], 3);
        assert_eq!(c.execute_raw(br#"{"TableName":"t"}"#, "GetItem").unwrap().body, "ok");
        let c = controller(&[(500, ""), (200, "ok")], 3);
        assert_eq!(
            c.execute_descriptor(&json!({"TableName": "t"}), "GetItem").unwrap().body,
            "ok"
        );
        assert_eq!(c.executor().calls.get(), 2);
    }

    #[test]
    fn unserializable_descriptor_exhausts_as_transport_failure() {
        use std::collections::HashMap;
        let mut bad: HashMap<(u8, u8), u8> = HashMap::new();
        bad.insert((1, 2), 3);
        let c = controller(&[(200, "{}")], 3);
        match c.execute_descriptor(&bad, "PutItem").unwrap_err() {
            RetryError::Exhausted {
                attempts,
                last_status,
                request,
                ..
            } => {
                assert_eq!(attempts, 3);
                assert_eq!(last_status, 0);
                assert!(request.contains("unserializable"), "{}", request);
            }
        }
        assert_eq!(c.executor().calls.get(), 0);
        assert_eq!(c.sleeper().sleeps.borrow().len(), 2);
    }

    #[test]
    fn zero_ceiling_still_makes_one_attempt() {
        let c = controller(&[(503, ""), (200, "{}")], 0);
        let err = c.execute(&req(), "GetItem").unwrap_err();
        assert!(matches!(err, RetryError::Exhausted { attempts: 1, .. }));
        assert_eq!(c.executor().calls.get(), 1);
        assert!(c.sleeper().sleeps.borrow().is_empty());
    }

    /// In-memory log sink for asserting on emitted events.
    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn permanent_bad_request_logs_body_and_rendered_request() {
        let buf = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(buf.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        let c = controller(&[(400, "ValidationException: bad key")], 3);
        let resp = tracing::subscriber::with_default(subscriber, || {
            c.execute(&req(), "GetItem").unwrap()
        });
        assert_eq!(resp.status, 400);

        let logs = buf.text();
        assert!(
            logs.contains("un-retryable error: ValidationException: bad key"),
            "{}",
            logs
        );
        assert!(logs.contains("\"TableName\": \"users\""), "{}", logs);
        assert!(logs.contains("rid-1"), "{}", logs);
    }

    #[test]
    fn into_parts_passes_permanent_failure_through() {
        let c = controller(&[(400, "ValidationException")], 3);
        let (body, status, err) = into_parts(c.execute(&req(), "GetItem"));
        assert_eq!(body, "ValidationException");
        assert_eq!(status, 400);
        assert!(err.is_none());
    }
}
