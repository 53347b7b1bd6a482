//! Retry and backoff policy.
//!
//! Encapsulates error classification (timeouts, busy stores, connection
//! failures) and exponential backoff decisions. The orchestrator uses it to
//! retry a single item's storage write; the batch workflow uses it to re-run
//! a whole batch after a storage failure.

mod classify;
mod policy;
mod run;

pub use classify::{classify_curl_error, classify_storage};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
