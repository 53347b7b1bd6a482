//! Integration test: local HTTP server, real curl fetcher, on-disk SQLite store.
//!
//! Submits batches through the service, drives them through the batch
//! workflow, and checks what a caller would see afterwards.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use bdm_core::config::BdmConfig;
use bdm_core::fetcher::CurlFetcher;
use bdm_core::orchestrator::{BatchDownloadOrchestrator, ItemOutcome, OrchestratorSettings};
use bdm_core::service::{DownloadService, FileContent};
use bdm_core::store::{RequestStatus, ResultSink, SqliteStore};
use bdm_core::workflow::BatchWorkflow;
use bdm_core::ErrorCode;
use common::http_server;
use tempfile::{tempdir, TempDir};

struct Harness {
    _dir: TempDir,
    store: SqliteStore,
    service: DownloadService,
    workflow: BatchWorkflow,
}

async fn harness(concurrency_limit: usize) -> Harness {
    let dir = tempdir().unwrap();
    let store = SqliteStore::open_at(dir.path().join("bdm.db")).await.unwrap();
    let cfg = BdmConfig {
        concurrency_limit,
        item_timeout_secs: 20,
        connect_timeout_secs: 5,
        join_grace_secs: 5,
        ..BdmConfig::default()
    };
    let sink: Arc<dyn ResultSink> = Arc::new(store.clone());
    let orchestrator = Arc::new(BatchDownloadOrchestrator::new(
        Arc::new(CurlFetcher::from_config(&cfg)),
        sink.clone(),
        OrchestratorSettings::from_config(&cfg),
    ));
    Harness {
        _dir: dir,
        store,
        service: DownloadService::new(sink.clone(), cfg.default_batch_timeout()),
        workflow: BatchWorkflow::from_config(orchestrator, sink, &cfg),
    }
}

#[tokio::test]
async fn two_urls_both_downloaded() {
    let base = http_server::start();
    let h = harness(3).await;
    let urls = vec![format!("{base}/a.txt"), format!("{base}/bytes/4096")];

    let submitted = h
        .service
        .create_request(&urls, Some(Duration::from_secs(10)))
        .await
        .unwrap();
    h.workflow
        .run_request(submitted.id, &urls, Duration::from_secs(10))
        .await
        .expect("run_request");

    let view = h.service.get_request(submitted.id).await.unwrap();
    assert_eq!(view.status, RequestStatus::Done);
    assert!(view.files.iter().all(|f| f.error.is_none()));

    let first = h
        .service
        .get_file(submitted.id, view.files[0].file_id.unwrap())
        .await
        .unwrap();
    assert_eq!(first, FileContent::Data(http_server::payload_for("/a.txt")));
    let second = h
        .service
        .get_file(submitted.id, view.files[1].file_id.unwrap())
        .await
        .unwrap();
    assert_eq!(second, FileContent::Data(http_server::bytes_body(4096)));
}

#[tokio::test]
async fn hanging_url_times_out_and_request_still_finishes() {
    let base = http_server::start();
    let h = harness(3).await;
    let urls = vec![
        format!("{base}/1"),
        format!("{base}/2"),
        format!("{base}/hang"),
        format!("{base}/4"),
        format!("{base}/status/404"),
    ];

    let submitted = h
        .service
        .create_request(&urls, Some(Duration::from_secs(2)))
        .await
        .unwrap();
    let started = Instant::now();
    let reports = h
        .workflow
        .run_request(submitted.id, &urls, Duration::from_secs(2))
        .await
        .expect("run_request");
    assert!(
        started.elapsed() < Duration::from_secs(10),
        "run took {:?}",
        started.elapsed()
    );

    assert!(matches!(reports[0].outcome, ItemOutcome::Downloaded { .. }));
    assert!(matches!(reports[1].outcome, ItemOutcome::Downloaded { .. }));
    assert_eq!(reports[2].outcome, ItemOutcome::Failed(ErrorCode::Timeout));
    assert!(matches!(reports[3].outcome, ItemOutcome::Downloaded { .. }));
    assert_eq!(
        reports[4].outcome,
        ItemOutcome::Failed(ErrorCode::DownloadFailed)
    );

    let view = h.service.get_request(submitted.id).await.unwrap();
    assert_eq!(view.status, RequestStatus::Done);
    assert_eq!(view.files[2].error.as_ref().unwrap().code, "TIMEOUT");
    assert_eq!(view.files[4].error.as_ref().unwrap().code, "DOWNLOAD_FAILED");
}

#[tokio::test]
async fn failed_file_is_served_as_structured_error() {
    let base = http_server::start();
    let h = harness(3).await;
    let urls = vec![format!("{base}/status/500"), format!("{base}/fine")];

    let submitted = h.service.create_request(&urls, None).await.unwrap();
    h.workflow
        .run_request(submitted.id, &urls, Duration::from_secs(10))
        .await
        .unwrap();

    let (_, files) = h.store.get_request_status(submitted.id).await.unwrap();
    let content = h.service.get_file(submitted.id, files[0].id).await.unwrap();
    assert_eq!(content, FileContent::Failed(ErrorCode::DownloadFailed));
    let json = serde_json::to_value(content.error_view().unwrap()).unwrap();
    assert_eq!(json["code"], "DOWNLOAD_FAILED");
    assert_eq!(json["message"], "file not available");

    let sibling = h.service.get_file(submitted.id, files[1].id).await.unwrap();
    assert_eq!(sibling, FileContent::Data(http_server::payload_for("/fine")));
}

#[tokio::test]
async fn rerun_after_done_is_a_no_op() {
    let base = http_server::start();
    let h = harness(2).await;
    let urls = vec![format!("{base}/x"), format!("{base}/status/404")];

    let submitted = h.service.create_request(&urls, None).await.unwrap();
    h.workflow
        .run_request(submitted.id, &urls, Duration::from_secs(10))
        .await
        .unwrap();
    let before = h.store.get_request_status(submitted.id).await.unwrap().1;

    h.workflow
        .run_request(submitted.id, &urls, Duration::from_secs(10))
        .await
        .unwrap();
    let (request, after) = h.store.get_request_status(submitted.id).await.unwrap();
    assert_eq!(request.status, RequestStatus::Done);
    assert_eq!(before, after);
}

#[tokio::test]
async fn recover_picks_up_submitted_but_unrun_requests() {
    let base = http_server::start();
    let h = harness(2).await;
    let urls = vec![format!("{base}/late-1"), format!("{base}/late-2")];
    let submitted = h
        .service
        .create_request(&urls, Some(Duration::from_secs(10)))
        .await
        .unwrap();

    let summary = h.workflow.recover().await.unwrap();
    assert_eq!(summary.finished, vec![submitted.id]);

    let view = h.service.get_request(submitted.id).await.unwrap();
    assert_eq!(view.status, RequestStatus::Done);
    let content = h
        .service
        .get_file(submitted.id, view.files[1].file_id.unwrap())
        .await
        .unwrap();
    assert_eq!(content, FileContent::Data(http_server::payload_for("/late-2")));
}

#[tokio::test]
async fn empty_submission_is_rejected() {
    let h = harness(3).await;
    let err = h.service.create_request(&[], None).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_INPUT");
    let processing = h
        .store
        .list_requests_in(RequestStatus::Processing)
        .await
        .unwrap();
    assert!(processing.is_empty());
}
