//! Batch download orchestrator.
//!
//! Fans one request out into bounded-parallel fetch tasks that share a single
//! deadline, records every outcome through the [`ResultSink`], force-resolves
//! whatever is still pending once the pool drains or the deadline passes, and
//! finally marks the request DONE.
//!
//! A run is safe to repeat for the same request: items that already have a
//! terminal outcome are skipped, and every write is an idempotent update.

mod item;


use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::BdmConfig;
use crate::error::{BdmError, ErrorCode, StorageError};
use crate::fetcher::ItemFetcher;
use crate::retry::RetryPolicy;
use crate::store::{FileOutcome, FileState, RequestId, RequestStatus, ResultSink};
use crate::tracker::CompletionTracker;

use item::{run_item, ItemTask, Slot};

/// Tuning for one orchestrator instance.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorSettings {
    /// Maximum fetches in flight.
    pub concurrency_limit: usize,
    /// Own deadline for the sweep writes and the final status write.
    pub finalize_grace: Duration,
    /// How long in-flight tasks may keep running after the batch deadline.
    pub join_grace: Duration,
    /// Retries for one item's outcome write.
    pub storage_retry: RetryPolicy,
}

impl OrchestratorSettings {
    pub fn from_config(cfg: &BdmConfig) -> Self {
        Self {
            concurrency_limit: cfg.concurrency_limit.max(1),
            finalize_grace: cfg.finalize_grace(),
            join_grace: cfg.join_grace(),
            storage_retry: cfg.storage_retry_policy(),
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from_config(&BdmConfig::default())
    }
}

/// Final outcome of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Downloaded { size: u64 },
    Failed(ErrorCode),
}

impl ItemOutcome {
    /// `None` while the row is still pending.
    pub fn from_state(state: FileState) -> Option<Self> {
        match state {
            FileState::Pending => None,
            FileState::Downloaded { size } => Some(ItemOutcome::Downloaded { size }),
            FileState::Failed(code) => Some(ItemOutcome::Failed(code)),
        }
    }
}

impl From<&FileOutcome> for ItemOutcome {
    fn from(outcome: &FileOutcome) -> Self {
        match outcome {
            FileOutcome::Data(bytes) => ItemOutcome::Downloaded {
                size: bytes.len() as u64,
            },
            FileOutcome::Failed(code) => ItemOutcome::Failed(*code),
        }
    }
}

/// Per-URL result of a run, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    pub index: usize,
    pub url: String,
    pub outcome: ItemOutcome,
}

/// Coordinates bounded-parallel fetches for one request at a time.
///
/// The fetcher and sink are fixed at construction.
pub struct BatchDownloadOrchestrator {
    fetcher: Arc<dyn ItemFetcher>,
    sink: Arc<dyn ResultSink>,
    settings: OrchestratorSettings,
}

impl BatchDownloadOrchestrator {
    pub fn new(
        fetcher: Arc<dyn ItemFetcher>,
        sink: Arc<dyn ResultSink>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            fetcher,
            sink,
            settings,
        }
    }

    /// Download `urls` for `request_id` within `deadline`.
    ///
    /// Per-item failures are recorded, never returned. The only error is
    /// `BdmError::Storage`: the final status write failed, or some item's
    /// outcome could not be recorded even by the sweep (the request then stays
    /// PROCESSING so a whole-batch re-run can finish it).
    #[tracing::instrument(skip(self, urls), fields(items = urls.len()))]
    pub async fn run(
        &self,
        request_id: RequestId,
        urls: &[String],
        deadline: Duration,
    ) -> Result<Vec<ItemReport>, BdmError> {
        let deadline_at = instant_after(Instant::now(), deadline);
        let join_by = instant_after(deadline_at, self.settings.join_grace);
        let cancel = CancellationToken::new();
        // Cancels in-flight fetches on every exit path, including this future being dropped.
        let _cancel_on_exit = cancel.clone().drop_guard();

        let tracker = Arc::new(CompletionTracker::new(urls.len()));
        let mut slots: Vec<Slot> = vec![Slot::Pending; urls.len()];
        self.resume(request_id, urls, &tracker, &mut slots).await;

        let mut queue: VecDeque<usize> = tracker.incomplete().into();
        tracing::info!(
            pending = queue.len(),
            already_resolved = tracker.completed_count(),
            limit = self.settings.concurrency_limit,
            "batch started"
        );

        let limit = self.settings.concurrency_limit.max(1);
        let mut join_set = JoinSet::new();

        loop {
            if !cancel.is_cancelled() && Instant::now() >= deadline_at {
                tracing::warn!(
                    in_flight = join_set.len(),
                    not_started = queue.len(),
                    "batch deadline elapsed, cancelling"
                );
                cancel.cancel();
            }
            while join_set.len() < limit && !cancel.is_cancelled() {
                let Some(index) = queue.pop_front() else {
                    break;
                };
                join_set.spawn(run_item(ItemTask {
                    index,
                    url: urls[index].clone(),
                    request_id,
                    fetcher: Arc::clone(&self.fetcher),
                    sink: Arc::clone(&self.sink),
                    tracker: Arc::clone(&tracker),
                    cancel: cancel.clone(),
                    storage_retry: self.settings.storage_retry,
                }));
            }

            if join_set.is_empty() {
                break;
            }

            tokio::select! {
                joined = join_set.join_next() => match joined {
                    Some(Ok((index, slot))) => slots[index] = slot,
                    Some(Err(e)) => tracing::error!(error = %e, "item task failed to complete"),
                    None => break,
                },
                _ = tokio::time::sleep_until(deadline_at), if !cancel.is_cancelled() => {
                    tracing::warn!(
                        in_flight = join_set.len(),
                        not_started = queue.len(),
                        "batch deadline elapsed, cancelling"
                    );
                    cancel.cancel();
                }
                _ = tokio::time::sleep_until(join_by), if cancel.is_cancelled() => {
                    tracing::warn!(
                        in_flight = join_set.len(),
                        "fetches still running after join grace, aborting"
                    );
                    join_set.shutdown().await;
                    break;
                }
            }
        }

        self.sweep(request_id, urls, &tracker, &mut slots).await;

        if !tracker.all_complete() {
            let unresolved = tracker.len() - tracker.completed_count();
            tracing::error!(unresolved, "items left unrecorded, request stays PROCESSING");
            return Err(StorageError::Unavailable(format!(
                "{unresolved} of {} items could not be recorded",
                tracker.len()
            ))
            .into());
        }

        let grace = self.settings.finalize_grace;
        tokio::time::timeout(
            grace,
            self.sink
                .update_request_status(request_id, RequestStatus::Done),
        )
        .await
        .map_err(|_| StorageError::TimedOut(grace))??;

        let reports: Vec<ItemReport> = urls
            .iter()
            .zip(slots)
            .enumerate()
            .map(|(index, (url, slot))| ItemReport {
                index,
                url: url.clone(),
                outcome: slot.into_outcome(),
            })
            .collect();

        let failed = reports
            .iter()
            .filter(|r| matches!(r.outcome, ItemOutcome::Failed(_)))
            .count();
        tracing::info!(total = reports.len(), failed, "batch done");
        Ok(reports)
    }

    /// Pre-mark items whose row already carries a terminal outcome (re-delivery).
    async fn resume(
        &self,
        request_id: RequestId,
        urls: &[String],
        tracker: &CompletionTracker,
        slots: &mut [Slot],
    ) {
        let files = match self.sink.get_request_status(request_id).await {
            Ok((_, files)) => files,
            Err(e) => {
                tracing::warn!(error = %e, "could not load prior outcomes, fetching every item");
                return;
            }
        };
        // File rows come back in creation order, one per input URL.
        for (index, url) in urls.iter().enumerate() {
            let Some(file) = files.get(index).filter(|f| &f.url == url) else {
                continue;
            };
            if let Some(outcome) = ItemOutcome::from_state(file.state) {
                tracker.mark_complete(index);
                slots[index] = Slot::Recorded(outcome);
            }
        }
    }

    /// Force a terminal write for every incomplete item, under one grace deadline.
    ///
    /// An item that was fetched but whose write failed gets its real outcome;
    /// anything else gets `TIMEOUT`.
    async fn sweep(
        &self,
        request_id: RequestId,
        urls: &[String],
        tracker: &CompletionTracker,
        slots: &mut [Slot],
    ) {
        let incomplete = tracker.incomplete();
        if incomplete.is_empty() {
            return;
        }
        tracing::info!(items = incomplete.len(), "sweeping unfinished items");

        let sweep_by = instant_after(Instant::now(), self.settings.finalize_grace);
        for index in incomplete {
            let outcome = match std::mem::replace(&mut slots[index], Slot::Pending) {
                Slot::Unrecorded(outcome) => outcome,
                Slot::Pending | Slot::Recorded(_) => FileOutcome::Failed(ErrorCode::Timeout),
            };
            let url = &urls[index];
            let write = tokio::time::timeout_at(
                sweep_by,
                self.sink.update_file_status(request_id, url, &outcome),
            )
            .await;
            match write {
                Ok(Ok(())) => {
                    tracker.mark_complete(index);
                    slots[index] = Slot::Recorded(ItemOutcome::from(&outcome));
                }
                Ok(Err(e)) => {
                    tracing::warn!(index, url = %url, error = %e, "sweep write failed");
                    slots[index] = Slot::Unrecorded(outcome);
                }
                Err(_) => {
                    tracing::warn!(index, url = %url, "sweep write timed out");
                    slots[index] = Slot::Unrecorded(outcome);
                }
            }
        }
    }
}

/// Far enough out that a batch never reaches it.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// `start + d`, clamped instead of overflowing for huge durations.
fn instant_after(start: Instant, d: Duration) -> Instant {
    start.checked_add(d.min(FAR_FUTURE)).unwrap_or(start)
}
