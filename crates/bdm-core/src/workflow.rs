//! Batch driver: runs the orchestrator as one retryable unit of work.
//!
//! Each attempt is bounded by a start-to-close timeout. A failed attempt
//! (storage trouble or the attempt timing out) re-runs the whole batch after
//! backoff; the orchestrator skips items that already have an outcome.
//! [`BatchWorkflow::recover`] re-drives every request left in PROCESSING, for
//! example after the process died mid-batch.

use std::sync::Arc;
use std::time::Duration;

use crate::config::BdmConfig;
use crate::error::{BdmError, Result};
use crate::orchestrator::{BatchDownloadOrchestrator, ItemReport};
use crate::retry::{classify_storage, run_with_retry, ErrorKind, RetryPolicy};
use crate::store::{RequestId, RequestStatus, ResultSink};

pub struct BatchWorkflow {
    orchestrator: Arc<BatchDownloadOrchestrator>,
    sink: Arc<dyn ResultSink>,
    attempt_timeout: Duration,
    retry: RetryPolicy,
}

/// Outcome of a recovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoverySummary {
    pub finished: Vec<RequestId>,
    pub failed: Vec<RequestId>,
}

impl BatchWorkflow {
    pub fn new(
        orchestrator: Arc<BatchDownloadOrchestrator>,
        sink: Arc<dyn ResultSink>,
        attempt_timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            orchestrator,
            sink,
            attempt_timeout,
            retry,
        }
    }

    pub fn from_config(
        orchestrator: Arc<BatchDownloadOrchestrator>,
        sink: Arc<dyn ResultSink>,
        cfg: &BdmConfig,
    ) -> Self {
        Self::new(
            orchestrator,
            sink,
            cfg.attempt_timeout(),
            cfg.batch_retry_policy(),
        )
    }

    /// Run one batch to DONE, retrying the whole batch on failure.
    pub async fn run_request(
        &self,
        request_id: RequestId,
        urls: &[String],
        deadline: Duration,
    ) -> Result<Vec<ItemReport>> {
        let attempt_timeout = self.attempt_timeout;
        run_with_retry(&self.retry, classify_batch_error, move |attempt| async move {
            tracing::info!(request_id, attempt, "batch attempt");
            match tokio::time::timeout(
                attempt_timeout,
                self.orchestrator.run(request_id, urls, deadline),
            )
            .await
            {
                Ok(res) => res,
                Err(_) => Err(BdmError::Timeout(format!(
                    "batch attempt exceeded {attempt_timeout:?}"
                ))),
            }
        })
        .await
    }

    /// Re-run every request still in PROCESSING with its stored deadline.
    pub async fn recover(&self) -> Result<RecoverySummary> {
        let stranded = self.sink.list_requests_in(RequestStatus::Processing).await?;
        if stranded.is_empty() {
            tracing::info!("no requests to recover");
            return Ok(RecoverySummary::default());
        }
        tracing::info!(count = stranded.len(), "recovering requests");

        let mut summary = RecoverySummary::default();
        for request in stranded {
            match self.rerun(request.id, request.timeout).await {
                Ok(()) => summary.finished.push(request.id),
                Err(e) => {
                    tracing::error!(request_id = request.id, error = %e, "recovery failed");
                    summary.failed.push(request.id);
                }
            }
        }
        Ok(summary)
    }

    async fn rerun(&self, request_id: RequestId, deadline: Duration) -> Result<()> {
        let (_, files) = self.sink.get_request_status(request_id).await?;
        let urls: Vec<String> = files.into_iter().map(|f| f.url).collect();
        self.run_request(request_id, &urls, deadline).await?;
        Ok(())
    }
}

/// Storage and attempt timeouts are worth another whole-batch attempt.
fn classify_batch_error(e: &BdmError) -> ErrorKind {
    match e {
        BdmError::Storage(s) => classify_storage(s),
        BdmError::Timeout(_) => ErrorKind::Timeout,
        BdmError::InvalidInput(_) | BdmError::NotFound(_) | BdmError::DownloadFailed(_) => {
            ErrorKind::Other
        }
    }
}
