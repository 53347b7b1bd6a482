//! Tests for the store (use the in-memory DB helper from db).

use std::time::Duration;

use crate::error::{BdmError, ErrorCode, StorageError};
use crate::store::{open_memory, FileOutcome, FileState, RequestStatus};

fn urls(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn create_request_inserts_one_pending_row_per_url() {
    let db = open_memory().await.unwrap();
    let input = urls(&["https://a.com/1", "https://b.com/2", "https://c.com/3"]);
    let id = db
        .create_request(&input, Duration::from_secs(30))
        .await
        .unwrap();

    let (request, files) = db.get_request_status(id).await.unwrap();
    assert_eq!(request.id, id);
    assert_eq!(request.status, RequestStatus::Processing);
    assert_eq!(request.timeout, Duration::from_secs(30));
    assert_eq!(files.len(), 3);
    for (file, url) in files.iter().zip(&input) {
        assert_eq!(&file.url, url);
        assert_eq!(file.request_id, id);
        assert_eq!(file.state, FileState::Pending);
    }
}

#[tokio::test]
async fn update_file_status_records_payload_or_error() {
    let db = open_memory().await.unwrap();
    let id = db
        .create_request(&urls(&["https://a.com/ok", "https://a.com/bad"]), Duration::from_secs(5))
        .await
        .unwrap();

    db.update_file_status(id, "https://a.com/ok", &FileOutcome::Data(b"hello".to_vec()))
        .await
        .unwrap();
    db.update_file_status(
        id,
        "https://a.com/bad",
        &FileOutcome::Failed(ErrorCode::DownloadFailed),
    )
    .await
    .unwrap();

    let (_, files) = db.get_request_status(id).await.unwrap();
    assert_eq!(files[0].state, FileState::Downloaded { size: 5 });
    assert_eq!(files[1].state, FileState::Failed(ErrorCode::DownloadFailed));

    let ok = db.get_file(id, files[0].id).await.unwrap();
    assert_eq!(ok.data.as_deref(), Some(&b"hello"[..]));
    assert!(ok.error_code.is_none());

    let bad = db.get_file(id, files[1].id).await.unwrap();
    assert!(bad.data.is_none());
    assert_eq!(bad.error_code, Some(ErrorCode::DownloadFailed));
}

#[tokio::test]
async fn repeated_outcome_write_is_idempotent() {
    let db = open_memory().await.unwrap();
    let id = db
        .create_request(&urls(&["https://a.com/x"]), Duration::from_secs(5))
        .await
        .unwrap();
    let outcome = FileOutcome::Failed(ErrorCode::Timeout);
    for _ in 0..3 {
        db.update_file_status(id, "https://a.com/x", &outcome)
            .await
            .unwrap();
    }
    db.update_request_status(id, RequestStatus::Done).await.unwrap();
    db.update_request_status(id, RequestStatus::Done).await.unwrap();

    let (request, files) = db.get_request_status(id).await.unwrap();
    assert_eq!(request.status, RequestStatus::Done);
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].state, FileState::Failed(ErrorCode::Timeout));
}

#[tokio::test]
async fn outcome_overwrite_keeps_payload_xor_error() {
    let db = open_memory().await.unwrap();
    let id = db
        .create_request(&urls(&["https://a.com/x"]), Duration::from_secs(5))
        .await
        .unwrap();
    db.update_file_status(id, "https://a.com/x", &FileOutcome::Failed(ErrorCode::Timeout))
        .await
        .unwrap();
    db.update_file_status(id, "https://a.com/x", &FileOutcome::Data(vec![1, 2, 3]))
        .await
        .unwrap();

    let (_, files) = db.get_request_status(id).await.unwrap();
    let file = db.get_file(id, files[0].id).await.unwrap();
    assert_eq!(file.data, Some(vec![1, 2, 3]));
    assert!(file.error_code.is_none());
}

#[tokio::test]
async fn empty_payload_counts_as_downloaded() {
    let db = open_memory().await.unwrap();
    let id = db
        .create_request(&urls(&["https://a.com/empty"]), Duration::from_secs(5))
        .await
        .unwrap();
    db.update_file_status(id, "https://a.com/empty", &FileOutcome::Data(Vec::new()))
        .await
        .unwrap();
    let (_, files) = db.get_request_status(id).await.unwrap();
    assert_eq!(files[0].state, FileState::Downloaded { size: 0 });
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let db = open_memory().await.unwrap();
    assert!(matches!(
        db.get_request_status(42).await,
        Err(BdmError::NotFound(_))
    ));

    let id = db
        .create_request(&urls(&["https://a.com/x"]), Duration::from_secs(5))
        .await
        .unwrap();
    assert!(matches!(db.get_file(id, 9999).await, Err(BdmError::NotFound(_))));
    assert!(matches!(
        db.get_file(id + 1, 1).await,
        Err(BdmError::NotFound(_))
    ));
}

#[tokio::test]
async fn updates_against_missing_rows_fail() {
    let db = open_memory().await.unwrap();
    let err = db
        .update_file_status(7, "https://nowhere", &FileOutcome::Failed(ErrorCode::Timeout))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::MissingRow(_)));
    let err = db
        .update_request_status(7, RequestStatus::Done)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::MissingRow(_)));
}

#[tokio::test]
async fn list_requests_in_filters_by_status() {
    let db = open_memory().await.unwrap();
    let a = db
        .create_request(&urls(&["https://a.com/1"]), Duration::from_secs(5))
        .await
        .unwrap();
    let b = db
        .create_request(&urls(&["https://b.com/1"]), Duration::from_secs(9))
        .await
        .unwrap();
    db.update_request_status(a, RequestStatus::Done).await.unwrap();

    let processing = db.list_requests_in(RequestStatus::Processing).await.unwrap();
    assert_eq!(processing.len(), 1);
    assert_eq!(processing[0].id, b);
    assert_eq!(processing[0].timeout, Duration::from_secs(9));

    let done = db.list_requests_in(RequestStatus::Done).await.unwrap();
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].id, a);
}
