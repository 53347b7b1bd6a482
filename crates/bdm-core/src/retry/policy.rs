use std::time::Duration;

/// High-level classification of an error for retry purposes.
///
/// Callers map curl errors or storage failures into these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out.
    Timeout,
    /// Store asked us to back off (SQLite busy/locked).
    Throttled,
    /// Connection-level failure (reset, DNS, pool exhausted, store unreachable).
    Connection,
    /// Any other error (not retried).
    Other,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff (base * 2^(attempt-1)) with a cap and an attempt limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Base delay for backoff.
    pub base_delay: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Compute the next backoff delay for a given attempt and error kind.
    ///
    /// `attempt` is 1-based (1 = first attempt). Returns `RetryDecision::NoRetry`
    /// when we should stop retrying.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }

        match kind {
            ErrorKind::Other => RetryDecision::NoRetry,
            ErrorKind::Timeout | ErrorKind::Connection | ErrorKind::Throttled => {
                let exp = 1u32 << attempt.saturating_sub(1).min(16);
                let raw = self.base_delay.saturating_mul(exp);
                RetryDecision::RetryAfter(raw.min(self.max_delay))
            }
        }
    }
}
