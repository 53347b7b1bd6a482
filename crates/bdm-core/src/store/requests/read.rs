//! Read operations: request status with its files, a single file, recovery listing.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::time::Duration;

use crate::error::{BdmError, ErrorCode, Result, StorageError};

use super::super::db::SqliteStore;
use super::super::types::{
    FileEntry, FileId, FileRecord, FileState, RequestId, RequestRecord, RequestStatus,
};

impl SqliteStore {
    /// Fetch a request and its file rows (creation order, payload not loaded).
    /// Fails with `NotFound` if the request does not exist.
    pub async fn get_request_status(
        &self,
        request_id: RequestId,
    ) -> Result<(RequestRecord, Vec<FileRecord>)> {
        let row = sqlx::query(
            r#"
            SELECT id, status, timeout_ms, created_at, updated_at
            FROM requests
            WHERE id = ?1
            "#,
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Err(BdmError::NotFound(format!("request {request_id}")));
        };
        let request = request_from_row(&row)?;

        let rows = sqlx::query(
            r#"
            SELECT id, request_id, url, length(data) AS data_len, error_code
            FROM files
            WHERE request_id = ?1
            ORDER BY id ASC
            "#,
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;

        let mut files = Vec::with_capacity(rows.len());
        for row in rows {
            let data_len: Option<i64> = row.get("data_len");
            let error_code: Option<String> = row.get("error_code");
            let state = match (data_len, error_code) {
                (_, Some(code)) => FileState::Failed(ErrorCode::from_str(&code)),
                (Some(len), None) => FileState::Downloaded {
                    size: len.max(0) as u64,
                },
                (None, None) => FileState::Pending,
            };
            files.push(FileRecord {
                id: row.get("id"),
                request_id: row.get("request_id"),
                url: row.get("url"),
                state,
            });
        }

        Ok((request, files))
    }

    /// Fetch one file row with its payload. Fails with `NotFound` if the file
    /// does not exist or belongs to another request.
    pub async fn get_file(&self, request_id: RequestId, file_id: FileId) -> Result<FileEntry> {
        let row = sqlx::query(
            r#"
            SELECT id, request_id, url, data, error_code
            FROM files
            WHERE request_id = ?1 AND id = ?2
            "#,
        )
        .bind(request_id)
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Err(BdmError::NotFound(format!(
                "file {file_id} of request {request_id}"
            )));
        };

        let error_code: Option<String> = row.get("error_code");
        Ok(FileEntry {
            id: row.get("id"),
            request_id: row.get("request_id"),
            url: row.get("url"),
            data: row.get("data"),
            error_code: error_code.as_deref().map(ErrorCode::from_str),
        })
    }

    /// All requests currently in `status`, oldest first.
    pub async fn list_requests_in(
        &self,
        status: RequestStatus,
    ) -> std::result::Result<Vec<RequestRecord>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT id, status, timeout_ms, created_at, updated_at
            FROM requests
            WHERE status = ?1
            ORDER BY id ASC
            "#,
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(request_from_row).collect()
    }
}

fn request_from_row(row: &SqliteRow) -> std::result::Result<RequestRecord, StorageError> {
    let id: i64 = row.get("id");
    let status: String = row.get("status");
    let timeout_ms: i64 = row.get("timeout_ms");
    let timeout_ms = u64::try_from(timeout_ms)
        .map_err(|_| StorageError::Corrupt(format!("request {id}: negative timeout_ms")))?;
    Ok(RequestRecord {
        id,
        status: RequestStatus::from_str(&status),
        timeout: Duration::from_millis(timeout_ms),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
