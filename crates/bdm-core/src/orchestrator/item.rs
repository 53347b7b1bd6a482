//! One item's fetch-and-record task.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::ErrorCode;
use crate::fetcher::ItemFetcher;
use crate::retry::{classify_storage, run_with_retry, RetryPolicy};
use crate::store::{FileOutcome, RequestId, ResultSink};
use crate::tracker::CompletionTracker;

use super::ItemOutcome;

/// What the orchestrator knows about one item.
#[derive(Debug, Clone)]
pub(super) enum Slot {
    /// Not started, cancelled before fetching, or its task was aborted.
    Pending,
    /// Outcome is in the sink and the tracker bit is set.
    Recorded(ItemOutcome),
    /// Fetched, but every write attempt failed; the sweep retries this exact outcome.
    Unrecorded(FileOutcome),
}

impl Slot {
    pub(super) fn into_outcome(self) -> ItemOutcome {
        match self {
            Slot::Recorded(outcome) => outcome,
            Slot::Unrecorded(outcome) => ItemOutcome::from(&outcome),
            Slot::Pending => ItemOutcome::Failed(ErrorCode::Timeout),
        }
    }
}

pub(super) struct ItemTask {
    pub index: usize,
    pub url: String,
    pub request_id: RequestId,
    pub fetcher: Arc<dyn ItemFetcher>,
    pub sink: Arc<dyn ResultSink>,
    pub tracker: Arc<CompletionTracker>,
    pub cancel: CancellationToken,
    pub storage_retry: RetryPolicy,
}

/// Fetch one URL and record its outcome. Never fails; returns the item's slot.
pub(super) async fn run_item(task: ItemTask) -> (usize, Slot) {
    let ItemTask {
        index,
        url,
        request_id,
        fetcher,
        sink,
        tracker,
        cancel,
        storage_retry,
    } = task;

    // Deadline already passed: leave it to the sweep.
    if cancel.is_cancelled() {
        return (index, Slot::Pending);
    }

    tracing::debug!(index, url = %url, "fetch start");
    let outcome = match fetcher.fetch(&url, &cancel).await {
        Ok(bytes) => {
            tracing::debug!(index, url = %url, bytes = bytes.len(), "fetch ok");
            FileOutcome::Data(bytes)
        }
        Err(e) => {
            tracing::info!(index, url = %url, error = %e, "fetch failed");
            FileOutcome::Failed(e.code())
        }
    };

    let sink = &sink;
    let url_ref = url.as_str();
    let outcome_ref = &outcome;
    let written = run_with_retry(&storage_retry, classify_storage, move |_attempt| async move {
        sink.update_file_status(request_id, url_ref, outcome_ref).await
    })
    .await;

    match written {
        Ok(()) => {
            tracker.mark_complete(index);
            (index, Slot::Recorded(ItemOutcome::from(&outcome)))
        }
        Err(e) => {
            tracing::warn!(index, url = %url, error = %e, "could not record outcome");
            (index, Slot::Unrecorded(outcome))
        }
    }
}
