//! Result sink: durable per-request and per-file status (SQLite via sqlx).
//!
//! The orchestrator and service depend on the [`ResultSink`] trait; the
//! production implementation is [`SqliteStore`].

mod db;
mod requests;
mod types;

#[cfg(test)]
mod tests;

pub use db::SqliteStore;
pub use types::*;

#[cfg(test)]
pub(crate) use db::open_memory;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{Result, StorageError};

/// Persistence collaborator for batch downloads.
///
/// Calls for distinct (request, url) keys may run concurrently.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Create a PROCESSING request with one pending file row per URL, atomically.
    async fn create_request(
        &self,
        urls: &[String],
        timeout: Duration,
    ) -> std::result::Result<RequestId, StorageError>;

    /// Idempotently record a file's terminal outcome. Never inserts rows.
    async fn update_file_status(
        &self,
        request_id: RequestId,
        url: &str,
        outcome: &FileOutcome,
    ) -> std::result::Result<(), StorageError>;

    /// Idempotent request status transition.
    async fn update_request_status(
        &self,
        request_id: RequestId,
        status: RequestStatus,
    ) -> std::result::Result<(), StorageError>;

    /// Request plus its files; `NotFound` if unknown.
    async fn get_request_status(
        &self,
        request_id: RequestId,
    ) -> Result<(RequestRecord, Vec<FileRecord>)>;

    /// One file with payload; `NotFound` if absent.
    async fn get_file(&self, request_id: RequestId, file_id: FileId) -> Result<FileEntry>;

    /// Requests currently in `status` (used to recover stranded batches).
    async fn list_requests_in(
        &self,
        status: RequestStatus,
    ) -> std::result::Result<Vec<RequestRecord>, StorageError>;
}

#[async_trait]
impl ResultSink for SqliteStore {
    async fn create_request(
        &self,
        urls: &[String],
        timeout: Duration,
    ) -> std::result::Result<RequestId, StorageError> {
        SqliteStore::create_request(self, urls, timeout).await
    }

    async fn update_file_status(
        &self,
        request_id: RequestId,
        url: &str,
        outcome: &FileOutcome,
    ) -> std::result::Result<(), StorageError> {
        SqliteStore::update_file_status(self, request_id, url, outcome).await
    }

    async fn update_request_status(
        &self,
        request_id: RequestId,
        status: RequestStatus,
    ) -> std::result::Result<(), StorageError> {
        SqliteStore::update_request_status(self, request_id, status).await
    }

    async fn get_request_status(
        &self,
        request_id: RequestId,
    ) -> Result<(RequestRecord, Vec<FileRecord>)> {
        SqliteStore::get_request_status(self, request_id).await
    }

    async fn get_file(&self, request_id: RequestId, file_id: FileId) -> Result<FileEntry> {
        SqliteStore::get_file(self, request_id, file_id).await
    }

    async fn list_requests_in(
        &self,
        status: RequestStatus,
    ) -> std::result::Result<Vec<RequestRecord>, StorageError> {
        SqliteStore::list_requests_in(self, status).await
    }
}
