//! Caller-facing operations: validate submissions and shape status queries.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{BdmError, ErrorCode, Result};
use crate::store::{FileId, FileState, RequestId, RequestStatus, ResultSink};

/// Returned by a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmittedRequest {
    pub id: RequestId,
    pub status: RequestStatus,
}

/// Structured error attached to a file (or returned instead of its bytes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorView {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// One file in a status response: `file_id` when fetchable, `error` when failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileView {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<FileId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestView {
    pub id: RequestId,
    pub status: RequestStatus,
    pub files: Vec<FileView>,
}

/// Result of asking for one file's bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Data(Vec<u8>),
    Failed(ErrorCode),
    /// Row exists but no outcome has been recorded yet.
    Pending,
}

impl FileContent {
    /// Payload served in place of bytes for a failed or pending file.
    pub fn error_view(&self) -> Option<ErrorView> {
        match self {
            FileContent::Data(_) => None,
            FileContent::Failed(code) => Some(ErrorView {
                code: code.as_str().to_string(),
                message: Some("file not available".to_string()),
            }),
            FileContent::Pending => Some(ErrorView {
                code: "PENDING".to_string(),
                message: Some("file not downloaded yet".to_string()),
            }),
        }
    }
}

pub struct DownloadService {
    sink: Arc<dyn ResultSink>,
    default_timeout: Duration,
}

impl DownloadService {
    pub fn new(sink: Arc<dyn ResultSink>, default_timeout: Duration) -> Self {
        Self {
            sink,
            default_timeout,
        }
    }

    /// Validate and persist a new batch. Nothing is written when validation fails.
    ///
    /// `timeout` falls back to the configured default batch deadline.
    pub async fn create_request(
        &self,
        urls: &[String],
        timeout: Option<Duration>,
    ) -> Result<SubmittedRequest> {
        let timeout = timeout.unwrap_or(self.default_timeout);
        validate_submission(urls, timeout)?;

        let id = self.sink.create_request(urls, timeout).await?;
        tracing::info!(request_id = id, items = urls.len(), ?timeout, "request created");
        Ok(SubmittedRequest {
            id,
            status: RequestStatus::Processing,
        })
    }

    pub async fn get_request(&self, id: RequestId) -> Result<RequestView> {
        if id <= 0 {
            return Err(BdmError::InvalidInput(format!("request id must be positive, got {id}")));
        }
        let (request, files) = self.sink.get_request_status(id).await?;
        let files = files
            .into_iter()
            .map(|f| match f.state {
                FileState::Failed(code) => FileView {
                    url: f.url,
                    file_id: None,
                    error: Some(ErrorView {
                        code: code.as_str().to_string(),
                        message: None,
                    }),
                },
                FileState::Pending | FileState::Downloaded { .. } => FileView {
                    url: f.url,
                    file_id: Some(f.id),
                    error: None,
                },
            })
            .collect();
        Ok(RequestView {
            id: request.id,
            status: request.status,
            files,
        })
    }

    pub async fn get_file(&self, request_id: RequestId, file_id: FileId) -> Result<FileContent> {
        if request_id <= 0 || file_id <= 0 {
            return Err(BdmError::InvalidInput(format!(
                "ids must be positive, got request {request_id} file {file_id}"
            )));
        }
        let file = self.sink.get_file(request_id, file_id).await?;
        Ok(match (file.data, file.error_code) {
            (_, Some(code)) => FileContent::Failed(code),
            (Some(data), None) => FileContent::Data(data),
            (None, None) => FileContent::Pending,
        })
    }
}

fn validate_submission(urls: &[String], timeout: Duration) -> Result<()> {
    if urls.is_empty() {
        return Err(BdmError::InvalidInput("at least one url is required".into()));
    }
    if let Some(pos) = urls.iter().position(|u| u.trim().is_empty()) {
        return Err(BdmError::InvalidInput(format!("url #{} is empty", pos + 1)));
    }
    // Outcomes are keyed by (request, url); a repeated URL would share one row key.
    let mut seen = HashSet::with_capacity(urls.len());
    if let Some(pos) = urls.iter().position(|u| !seen.insert(u.as_str())) {
        return Err(BdmError::InvalidInput(format!(
            "url #{} repeats {}",
            pos + 1,
            urls[pos]
        )));
    }
    if timeout.is_zero() {
        return Err(BdmError::InvalidInput("timeout must be positive".into()));
    }
    Ok(())
}
