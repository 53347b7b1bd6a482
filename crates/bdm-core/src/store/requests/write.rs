//! Write operations: create a request with its file rows, record outcomes, move status.

use std::time::Duration;

use crate::error::StorageError;

use super::super::db::{unix_timestamp, SqliteStore};
use super::super::types::{FileOutcome, RequestId, RequestStatus};

impl SqliteStore {
    /// Insert a PROCESSING request and one pending file row per URL, in input
    /// order, in a single transaction.
    pub async fn create_request(
        &self,
        urls: &[String],
        timeout: Duration,
    ) -> Result<RequestId, StorageError> {
        let now = unix_timestamp();
        let timeout_ms = i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX);
        let mut tx = self.pool.begin().await?;

        let request_id = sqlx::query(
            r#"
            INSERT INTO requests (status, timeout_ms, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(RequestStatus::Processing.as_str())
        .bind(timeout_ms)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for url in urls {
            sqlx::query(
                r#"
                INSERT INTO files (request_id, url, data, error_code, updated_at)
                VALUES (?1, ?2, NULL, NULL, ?3)
                "#,
            )
            .bind(request_id)
            .bind(url)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(request_id, files = urls.len(), "request created");
        Ok(request_id)
    }

    /// Record the terminal outcome of every file row of `request_id` whose URL
    /// is `url`. Never inserts, so re-delivery cannot duplicate rows; writing
    /// the same outcome again leaves the row unchanged.
    pub async fn update_file_status(
        &self,
        request_id: RequestId,
        url: &str,
        outcome: &FileOutcome,
    ) -> Result<(), StorageError> {
        let now = unix_timestamp();
        let (data, error_code) = outcome.columns();
        let r = sqlx::query(
            r#"
            UPDATE files
            SET data = ?1,
                error_code = ?2,
                updated_at = ?3
            WHERE request_id = ?4 AND url = ?5
            "#,
        )
        .bind(data)
        .bind(error_code)
        .bind(now)
        .bind(request_id)
        .bind(url)
        .execute(&self.pool)
        .await?;

        if r.rows_affected() == 0 {
            return Err(StorageError::MissingRow(format!(
                "file {url} of request {request_id}"
            )));
        }
        Ok(())
    }

    /// Move a request to `status`. Idempotent.
    pub async fn update_request_status(
        &self,
        request_id: RequestId,
        status: RequestStatus,
    ) -> Result<(), StorageError> {
        let now = unix_timestamp();
        let r = sqlx::query(
            r#"
            UPDATE requests
            SET status = ?1,
                updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(status.as_str())
        .bind(now)
        .bind(request_id)
        .execute(&self.pool)
        .await?;

        if r.rows_affected() == 0 {
            return Err(StorageError::MissingRow(format!("request {request_id}")));
        }
        Ok(())
    }
}
