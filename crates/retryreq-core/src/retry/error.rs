//! Terminal errors surfaced by the retry controller.

/// Error returned to the caller of [`RetryController`](super::RetryController).
///
/// Intermediate attempt failures are logged, never returned; only these reach
/// the caller.
#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    /// Every allowed attempt came back transient.
    #[error("failed retries on {operation}: {request}")]
    Exhausted {
        operation: String,
        /// Attempts made, including the first.
        attempts: u32,
        /// Status of the final attempt (0 if it never got a response).
        last_status: u16,
        /// One-line rendering of the request that failed.
        request: String,
    },
}

impl RetryError {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }
}
