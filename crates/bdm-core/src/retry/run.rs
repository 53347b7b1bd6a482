//! Retry loop: run an async operation until success or the policy says stop.

use std::future::Future;

use super::policy::{ErrorKind, RetryDecision, RetryPolicy};

/// Runs `f` until it succeeds or `policy` refuses another attempt.
///
/// `f` receives the 1-based attempt number; `classify` maps each failure to an
/// [`ErrorKind`]. Between attempts the task sleeps for the backoff delay.
pub async fn run_with_retry<T, E, F, Fut, C>(
    policy: &RetryPolicy,
    classify: C,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> ErrorKind,
    E: std::fmt::Display,
{
    let mut attempt = 1u32;
    loop {
        match f(attempt).await {
            Ok(v) => return Ok(v),
            Err(e) => match policy.decide(attempt, classify(&e)) {
                RetryDecision::NoRetry => return Err(e),
                RetryDecision::RetryAfter(d) => {
                    tracing::debug!(
                        attempt,
                        delay_ms = d.as_millis() as u64,
                        error = %e,
                        "retrying after backoff"
                    );
                    tokio::time::sleep(d).await;
                    attempt += 1;
                }
            },
        }
    }
}
